pub mod page_agent;
pub mod posting_flow;

pub use page_agent::{CdpPageLink, PageAgent};
pub use posting_flow::PostingFlow;
