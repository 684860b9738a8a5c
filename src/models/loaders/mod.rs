pub mod html_loader;

pub use html_loader::{collect_html_paths, filter_html_files, read_documents, IntakeReport};
