pub mod crop;
pub mod detector;

pub use crop::{crop_region, DEFAULT_PADDING};
pub use detector::{
    DetectError, DetectorBackend, DetectorConfig, HostedDetector, MockDetector,
    DEFAULT_CONFIDENCE_THRESHOLD,
};
