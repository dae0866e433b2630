//! Ordered registry of converters.
//!
//! Built once at startup and shared read-only afterwards. When several
//! converters claim a pair, the first registered wins.

use serde::Serialize;
use std::sync::Arc;

use crate::converter::{Converter, DocumentConverter, EngineConfig, ImageConverter, MediaConverter};
use crate::format::{FormatSet, FormatToken};

/// Every format any converter accepts or produces.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FormatCatalog {
    pub input: FormatSet,
    pub output: FormatSet,
}

#[derive(Default)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn Converter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in converters: image, document, media.
    pub fn with_defaults(config: &EngineConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ImageConverter::new(config.clone())));
        registry.register(Arc::new(DocumentConverter::new(config.clone())));
        registry.register(Arc::new(MediaConverter::new(config.clone())));
        registry
    }

    /// Appends a converter. Overlapping claims are allowed.
    pub fn register(&mut self, converter: Arc<dyn Converter>) {
        self.converters.push(converter);
    }

    /// The first converter whose capability sets cover the pair.
    pub fn resolve(&self, input: &FormatToken, output: &FormatToken) -> Option<Arc<dyn Converter>> {
        self.converters
            .iter()
            .find(|c| c.can_convert(input, output))
            .cloned()
    }

    /// Formats `input` can be turned into, never including `input` itself.
    pub fn available_targets(&self, input: &FormatToken) -> Vec<FormatToken> {
        let mut targets = FormatSet::new();
        for converter in &self.converters {
            if !converter.supported_input_formats().contains(input) {
                continue;
            }
            for output in converter.supported_output_formats() {
                if output != input {
                    targets.insert(output.clone());
                }
            }
        }
        targets.to_vec()
    }

    pub fn all_formats(&self) -> FormatCatalog {
        let mut catalog = FormatCatalog::default();
        for converter in &self.converters {
            for format in converter.supported_input_formats() {
                catalog.input.insert(format.clone());
            }
            for format in converter.supported_output_formats() {
                catalog.output.insert(format.clone());
            }
        }
        catalog
    }

    pub fn names(&self) -> Vec<&str> {
        self.converters.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}
