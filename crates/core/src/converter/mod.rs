//! Converter module for turning files of one format into another.
//!
//! This module provides the `Converter` trait and the three built-in
//! implementations. Converters that depend on external programs describe
//! each routine as an ordered chain of engines (see [`run_chain`]).
//!
//! # Converters
//!
//! - [`ImageConverter`]: raster formats in-process, SVG via resvg, HEIF via
//!   heif-convert or ImageMagick
//! - [`DocumentConverter`]: pdf2docx, Office automation, LibreOffice and
//!   WeasyPrint
//! - [`MediaConverter`]: FFmpeg
//!
//! # Example
//!
//! ```ignore
//! use transmute_core::converter::{Converter, DocumentConverter, EngineConfig};
//!
//! let converter = DocumentConverter::new(EngineConfig::default());
//! let output = converter.convert(Path::new("/tmp/report.pdf"), &"docx".into()).await?;
//! assert_eq!(output, PathBuf::from("/tmp/report_converted.docx"));
//! ```

mod config;
mod document;
mod error;
mod image;
mod markdown;
mod media;
mod process;
mod strategy;
mod traits;

pub use config::EngineConfig;
pub use document::{DocumentConverter, OfficeApp};
pub use error::ConverterError;
pub use self::image::{ImageConverter, RasterTarget};
pub use markdown::{render_markdown, styled_document};
pub use media::MediaConverter;
pub use process::EngineCommand;
pub use strategy::{expect_output, run_chain, Attempt, Strategy};
pub use traits::{output_path_for, scratch_path_for, Converter, ConverterDescriptor, OUTPUT_SUFFIX};
