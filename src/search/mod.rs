//! Search orchestration module
//!
//! Turns results page inputs (query, page, uploaded image) into backend
//! calls and publishes the outcome as display state.

mod backend;
mod models;
mod orchestrator;

pub use backend::SearchBackend;
pub use models::*;
pub use orchestrator::{DisplayState, EffectOutcome, FetchStatus, Orchestrator};
