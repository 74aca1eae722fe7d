// Watermark URL Tool - Core Library

pub mod clock;
pub mod composer;
pub mod encoding;
pub mod models;
pub mod rows;
pub mod timestamp;
pub mod validation;

pub use clock::*;
pub use composer::*;
pub use encoding::*;
pub use models::*;
pub use rows::*;
pub use timestamp::*;
pub use validation::*;
