pub mod pipeline;

pub use pipeline::{ScanConfig, ScanPipeline, ScanStage};
