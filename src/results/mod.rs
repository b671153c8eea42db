//! Result types and the views derived from them
//!
//! Payloads come back from the search backend; the formatter and sibling
//! views turn the published display state into renderable pieces.

mod formatter;
mod types;
mod views;

pub use formatter::*;
pub use types::*;
pub use views::*;
