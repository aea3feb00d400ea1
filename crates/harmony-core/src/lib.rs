//! Harmony core: domain types shared by the notification engine and its
//! collaborators, the collaborator traits themselves, and configuration.

pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use config::{ConfigManager, DispatchConfig, DispatchMode, LoggingConfig, Settings, SmtpConfig};
pub use error::*;
pub use logging::init_tracing;
pub use traits::*;
pub use types::*;
