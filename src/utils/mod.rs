pub mod logging;
pub mod wait;

pub use logging::truncate_text;
pub use wait::{wait_until, WaitError};
