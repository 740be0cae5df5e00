//! HTTP API
//!
//! JSON endpoints the forum calls to classify submissions, record labels,
//! retrain, and trigger the schedule gate from its entry page.

pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::{router, serve};
