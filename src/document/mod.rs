mod loader;
mod splitter;

pub use loader::{PageRecord, PageSource, PdfLoader};
pub use splitter::{TextChunk, TextSplitter};
