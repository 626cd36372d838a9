//! Session core of the gincana: everything that can run without a terminal.
//! The binary adds the TUI on top.
pub mod app_dirs;
pub mod comprehension;
pub mod config;
pub mod error;
pub mod exercise;
pub mod normalize;
pub mod passages;
pub mod ranking;
pub mod record;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod store;
pub mod timer;
pub mod util;

pub use error::{GincanaError, Result};
pub use exercise::{Exercise, SaveOutcome};
pub use record::ResultRecord;
pub use session::{SessionConfig, SessionPhase};
