//! Command handlers invoked from `main`: one per pipeline stage.

pub mod fetch_handlers;
pub mod visualize_handlers;
