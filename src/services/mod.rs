pub mod editor;
pub mod html_split;

pub use editor::{EditorDriver, BOOTSTRAP_SCRIPT, PROBE_SCRIPT};
pub use html_split::{split_title_and_body, SplitDocument, UNTITLED_PLACEHOLDER};
