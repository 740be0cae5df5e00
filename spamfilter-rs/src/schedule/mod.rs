//! Scheduled digest + retrain gate
//!
//! Decides whether the periodic job runs today and guarantees it runs at
//! most once per eligible calendar day.

pub mod digest;
pub mod gate;
pub mod store;
pub mod types;

pub use crate::config::RetrainMode;
pub use digest::{DigestNotifier, LoggingDigestNotifier};
pub use gate::ScheduleGate;
pub use store::ScheduleStore;
pub use types::*;
