pub mod config;
pub mod converter;
pub mod error;
pub mod format;
pub mod metrics;
pub mod registry;
pub mod service;
pub mod testing;
pub mod workspace;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use converter::{Converter, ConverterError, EngineConfig};
pub use error::ErrorKind;
pub use format::{FormatSet, FormatToken};
pub use registry::{ConverterRegistry, FormatCatalog};
pub use service::{ConversionService, ConvertedFile, ConvertedReader, ServiceError};
pub use workspace::{TempGuard, WorkDir};
