pub mod detection;
pub mod geometry;
pub mod report;
pub mod token;

pub use detection::Detection;
pub use geometry::BoundingBox;
pub use report::{DateSource, ExpiryResult, ScanReport};
pub use token::TextToken;
