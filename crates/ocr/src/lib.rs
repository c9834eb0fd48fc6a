pub mod extractor;
pub mod preprocess;
pub mod reader;

pub use extractor::{TextExtractor, MIN_TOKEN_CONFIDENCE};
pub use preprocess::{prepare, prepare_from_bytes, PreprocessError};
pub use reader::{MockOcr, OcrBackend, OcrError};

#[cfg(feature = "tesseract")]
pub use reader::tesseract_backend::TesseractReader;
