//! HTTP server for Teller

pub mod http;

pub use http::{run, AppState};
