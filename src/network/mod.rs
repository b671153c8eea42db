//! HTTP networking module
//!
//! Provides the reqwest-backed implementation of the search backend.

mod client;

pub use client::HttpClient;
