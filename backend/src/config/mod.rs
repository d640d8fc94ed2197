//! Server configuration

pub mod group_call_config;
pub mod logging_config;
pub mod media_config;
pub mod server_config;

pub use group_call_config::GroupCallConfig;
pub use logging_config::LoggingConfig;
pub use media_config::MediaConfig;
pub use server_config::ServerConfig;
