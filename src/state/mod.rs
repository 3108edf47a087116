//! State module for tracking crawl and run progress
//!
//! # Components
//!
//! - `PageState`: Why a page was skipped or excluded during URL discovery
//! - `RunState`: Tracks one preset's Run through the ordered pipeline stages

mod page_state;
mod run_state;

// Re-export main types
pub use page_state::PageState;
pub use run_state::RunState;
