pub mod config;
pub mod error;
pub mod overrides;
pub mod schema;

pub use config::{
    DataLoaderConfig, DatasetConfig, LoggerConfig, LoggerIntegration, ModelConfig, Precision,
    RunConfig, TrainerConfig,
};
pub use error::ConfigError;
pub use overrides::Override;
