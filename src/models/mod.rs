pub mod document;
pub mod loaders;
pub mod session;

pub use document::{Batch, Document};
pub use loaders::{collect_html_paths, filter_html_files, read_documents, IntakeReport};
pub use session::{PageContext, Session};
