pub mod document;
pub mod error;
pub mod traits;
pub mod types;

pub use document::{extract_words, write_json, Document, DocumentIndex};
pub use error::{OcrError, OcrResult};
pub use traits::TextRecognizer;
pub use types::{Point, RecognizedText, Region};
