//! Infrastructure layer: directory storage, seed data, configuration.

pub mod config;
pub mod directory;
pub mod seed;

pub use config::{ConfigError, ConfigLoader, GatehouseConfig, JwtSettings, ServerConfig};
pub use directory::InMemoryDirectory;
pub use seed::{SeedReport, seed_defaults};
