//! Engine settings loading.

mod settings_loader;

pub use settings_loader::{ConfigError, SettingsLoader};
