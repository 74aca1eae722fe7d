// Watermark token encoding

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

/// Encode display text into a watermark token.
///
/// The token is the base64 form of the UTF-8 bytes with `+` replaced by `-`,
/// `/` replaced by `_` and the trailing `=` padding removed, which is exactly
/// the URL-safe alphabet without padding.
pub fn encode_token(text: &str) -> String {
    URL_SAFE_NO_PAD.encode(text.as_bytes())
}
