pub mod error;
pub mod plugin_string;

pub use error::BridgeError;
pub use plugin_string::PluginString;
