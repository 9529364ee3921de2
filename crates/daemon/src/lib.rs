// Export configuration and state
pub mod service_config;
pub mod state;

pub use service_config::{Config, ConfigError};
pub use state::{ExportState, RenameOutcome, StateError};
