use std::path::Path;
use transmute_core::{Config, ConversionService, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    service: ConversionService,
}

impl AppState {
    pub fn new(config: Config, service: ConversionService) -> Self {
        Self { config, service }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn service(&self) -> &ConversionService {
        &self.service
    }

    /// Root of the working directory, redacted from client-facing errors.
    pub fn workdir_root(&self) -> &Path {
        self.service.workdir().root()
    }
}
