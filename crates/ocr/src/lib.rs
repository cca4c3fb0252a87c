pub mod extract;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod types;

pub use extract::{Extractor, IGNORE_KEYWORDS};
pub use pipeline::{PipelineError, ReceiptPipeline};
pub use preprocess::{detect_format, prepare_for_ocr, PreprocessError};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError, VisionRecognizer, VISION_ENDPOINT};
pub use types::{DraftRow, ReceiptDraft, ScanOutcome, ScannedItem};
