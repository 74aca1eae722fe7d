// Watermark URL composition
//
// Builds the OSS image-processing query that resizes a picture and stamps
// the time, date and address overlays on it.

use crate::clock::{Clock, SystemClock};
use crate::encoding::encode_token;
use crate::timestamp::{ParsedTimestamp, WatermarkTime};

/// Maximum characters per address overlay line
pub const ADDRESS_CHUNK_WIDTH: usize = 18;

/// Label prefixed to the first address line ("Address:")
pub const ADDRESS_LABEL: &str = "地 址：";

/// Label prefixed to the date overlay ("Date:")
pub const DATE_LABEL: &str = "日 期：";

/// Schemes eligible for rewriting
pub const SUPPORTED_SCHEMES: [&str; 2] = ["http://", "https://"];

pub const RESIZE_DIRECTIVE: &str = "?x-oss-process=image/resize,w_1366";
pub const TIME_OVERLAY: &str = "/watermark,color_FFFFFF,size_70,shadow_100,x_30,y_175,g_sw,text_";
pub const DATE_OVERLAY: &str = "/watermark,color_FFFFFF,size_40,shadow_100,x_30,y_120,g_sw,text_";
pub const ADDRESS_OVERLAY: &str = "/watermark,color_FFFFFF,size_40,shadow_100,x_25,y_75,g_sw,text_";
pub const ADDRESS_CONTINUATION_OVERLAY: &str =
    "/watermark,color_FFFFFF,size_40,shadow_100,x_190,y_30,g_sw,text_";

/// Split an address into consecutive pieces of at most
/// [`ADDRESS_CHUNK_WIDTH`] characters.
///
/// Splitting counts `char`s, never bytes, so multi-byte text is never cut
/// inside a character. An empty address yields no chunks.
pub fn chunk_address(address: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in address.char_indices() {
        if count == ADDRESS_CHUNK_WIDTH {
            chunks.push(&address[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }

    if start < address.len() {
        chunks.push(&address[start..]);
    }

    chunks
}

/// Whether `url` uses a scheme the image service accepts
pub fn has_supported_scheme(url: &str) -> bool {
    SUPPORTED_SCHEMES.iter().any(|scheme| url.starts_with(scheme))
}

/// Encoded overlay texts for one picture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkTokens {
    pub time: String,
    pub date: String,
    pub address: String,
    pub address_continuation: Option<String>,
}

impl WatermarkTokens {
    /// Label and encode the display fields. Address chunks past the second
    /// are dropped.
    pub fn new(time: &WatermarkTime, address: &str) -> Self {
        let chunks = chunk_address(address);
        let first = chunks.first().copied().unwrap_or_default();

        Self {
            time: encode_token(&time.time_of_day),
            date: encode_token(&format!("{}{}", DATE_LABEL, time.date)),
            address: encode_token(&format!("{}{}", ADDRESS_LABEL, first)),
            address_continuation: chunks.get(1).map(|chunk| encode_token(chunk)),
        }
    }

    /// Ordered directive segments: resize, time, date, address, and the
    /// second address line when present
    pub fn directives(&self) -> Vec<String> {
        let mut directives = vec![
            RESIZE_DIRECTIVE.to_string(),
            format!("{}{}", TIME_OVERLAY, self.time),
            format!("{}{}", DATE_OVERLAY, self.date),
            format!("{}{}", ADDRESS_OVERLAY, self.address),
        ];

        if let Some(continuation) = &self.address_continuation {
            directives.push(format!("{}{}", ADDRESS_CONTINUATION_OVERLAY, continuation));
        }

        directives
    }

    /// Full query suffix appended to an image URL
    pub fn query(&self) -> String {
        self.directives().concat()
    }
}

/// Rewrites image URLs into watermarked variants
#[derive(Debug, Clone, Default)]
pub struct WatermarkComposer<C = SystemClock> {
    clock: C,
}

impl<C: Clock> WatermarkComposer<C> {
    /// Create a composer reading the fallback time from `clock`
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Compose a watermarked URL from raw timestamp and address text
    pub fn compose(&self, url: &str, timestamp: &str, address: &str) -> String {
        self.compose_parsed(url, ParsedTimestamp::parse(timestamp), address)
    }

    /// Compose a watermarked URL from an already classified timestamp
    pub fn compose_parsed(&self, url: &str, timestamp: ParsedTimestamp, address: &str) -> String {
        if !has_supported_scheme(url) {
            return url.to_string();
        }
        let query = self.tokens(timestamp, address).query();
        Self::apply(url, &query)
    }

    /// Encoded overlay texts, resolving the timestamp against the clock
    pub fn tokens(&self, timestamp: ParsedTimestamp, address: &str) -> WatermarkTokens {
        let time = WatermarkTime::resolve(timestamp, &self.clock);
        WatermarkTokens::new(&time, address)
    }

    /// Append a prepared query to `url`, leaving unsupported schemes untouched
    pub fn apply(url: &str, query: &str) -> String {
        if has_supported_scheme(url) {
            format!("{}{}", url, query)
        } else {
            url.to_string()
        }
    }
}

/// Compose a watermarked URL using the system clock for unparsable timestamps
pub fn compose(url: &str, timestamp: &str, address: &str) -> String {
    WatermarkComposer::new(SystemClock).compose(url, timestamp, address)
}
