//! Raster, vector and HEIF image conversion.
//!
//! Raster formats are decoded and re-encoded in-process with the `image`
//! crate; SVG is rasterized with `resvg`. HEIF/HEIC has no pure Rust decoder
//! here, so it is first decoded to PNG by an external tool.

use async_trait::async_trait;
use image::codecs::ico::{IcoEncoder, IcoFrame};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{
    DynamicImage, ExtendedColorType, ImageError, ImageFormat, ImageReader, ImageResult, RgbImage,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::config::EngineConfig;
use super::error::ConverterError;
use super::process::EngineCommand;
use super::strategy::{expect_output, run_chain, Strategy};
use super::traits::{output_path_for, scratch_path_for, Converter, ConverterDescriptor};
use crate::format::FormatToken;
use crate::workspace::{discard, TempGuard};

const INPUT_FORMATS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff", "ico", "svg", "heic", "heif",
];
const OUTPUT_FORMATS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff", "ico"];

/// Engine name used for errors raised by the in-process codecs.
const CODEC_ENGINE: &str = "image codec";
const SVG_ENGINE: &str = "resvg";

/// Icon sizes embedded in `.ico` output, largest first.
const ICO_SIZES: [u32; 5] = [256, 128, 64, 32, 16];

/// Encodable raster targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterTarget {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
    Tiff,
    Ico,
}

impl RasterTarget {
    pub fn from_token(token: &FormatToken) -> Option<Self> {
        match token.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            "tiff" => Some(Self::Tiff),
            "ico" => Some(Self::Ico),
            _ => None,
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::WebP => ImageFormat::WebP,
            Self::Gif => ImageFormat::Gif,
            Self::Bmp => ImageFormat::Bmp,
            Self::Tiff => ImageFormat::Tiff,
            Self::Ico => ImageFormat::Ico,
        }
    }

    /// Whether the encoder keeps an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, Self::Jpeg)
    }
}

/// External HEIF decoders, most preferred first.
#[derive(Debug, Clone, Copy)]
enum HeifDecoder {
    HeifConvert,
    ImageMagick,
}

const HEIF_DECODERS: &[HeifDecoder] = &[HeifDecoder::HeifConvert, HeifDecoder::ImageMagick];

impl HeifDecoder {
    fn program(self, config: &EngineConfig) -> &Path {
        match self {
            Self::HeifConvert => &config.heif_convert_path,
            Self::ImageMagick => &config.magick_path,
        }
    }
}

impl Strategy for HeifDecoder {
    fn engine(&self) -> &'static str {
        match self {
            Self::HeifConvert => "heif-convert",
            Self::ImageMagick => "ImageMagick",
        }
    }

    fn install_hint(&self) -> &'static str {
        match self {
            Self::HeifConvert => "Install libheif (heif-convert).",
            Self::ImageMagick => "Install ImageMagick 7 with HEIF support.",
        }
    }
}

/// Converts between image formats.
pub struct ImageConverter {
    config: EngineConfig,
    descriptor: ConverterDescriptor,
}

impl ImageConverter {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            descriptor: ConverterDescriptor::new(INPUT_FORMATS, OUTPUT_FORMATS),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    async fn reencode(
        &self,
        input: &Path,
        output: &Path,
        target: RasterTarget,
    ) -> Result<(), ConverterError> {
        let (input, output, quality) = (
            input.to_path_buf(),
            output.to_path_buf(),
            self.config.jpeg_quality,
        );
        run_blocking(move || reencode_file(&input, &output, target, quality)).await
    }

    async fn convert_svg(
        &self,
        input: &Path,
        output: &Path,
        target: RasterTarget,
    ) -> Result<(), ConverterError> {
        let input = input.to_path_buf();
        if target == RasterTarget::Png {
            let output = output.to_path_buf();
            return run_blocking(move || rasterize_svg(&input, &output)).await;
        }

        let raster = scratch_path_for(output, "raster", "png");
        let _guard = TempGuard::for_path(&raster);
        let (output, quality) = (output.to_path_buf(), self.config.jpeg_quality);
        run_blocking(move || {
            rasterize_svg(&input, &raster)?;
            reencode_file(&raster, &output, target, quality)
        })
        .await
    }

    async fn convert_heif(
        &self,
        input: &Path,
        output: &Path,
        target: RasterTarget,
    ) -> Result<(), ConverterError> {
        let decoded = scratch_path_for(output, "decoded", "png");
        let _guard = TempGuard::for_path(&decoded);
        let timeout = self.config.timeout();

        run_chain("HEIF decoding", HEIF_DECODERS, |decoder| {
            let command = EngineCommand::new(decoder.engine(), decoder.program(&self.config), timeout)
                .arg(input)
                .arg(&decoded);
            let decoded = decoded.clone();
            async move {
                command
                    .run()
                    .await
                    .and_then(|_| expect_output(decoder.engine(), &decoded))
            }
        })
        .await?;

        self.reencode(&decoded, output, target).await
    }
}

#[async_trait]
impl Converter for ImageConverter {
    fn name(&self) -> &str {
        "image"
    }

    fn descriptor(&self) -> &ConverterDescriptor {
        &self.descriptor
    }

    async fn convert(
        &self,
        input_path: &Path,
        output_format: &FormatToken,
    ) -> Result<PathBuf, ConverterError> {
        let input_format =
            FormatToken::from_path(input_path).unwrap_or_else(|| FormatToken::new(""));
        let target = match RasterTarget::from_token(output_format) {
            Some(target) if self.descriptor.inputs().contains(&input_format) => target,
            _ => {
                return Err(ConverterError::unsupported_pair(
                    self.name(),
                    input_format,
                    output_format.clone(),
                ))
            }
        };

        let output_path = output_path_for(input_path, output_format);
        debug!(input = %input_path.display(), output = %output_path.display(), ?target, "Converting image");

        let result = match input_format.as_str() {
            "svg" => self.convert_svg(input_path, &output_path, target).await,
            "heic" | "heif" => self.convert_heif(input_path, &output_path, target).await,
            _ => self.reencode(input_path, &output_path, target).await,
        };

        match result {
            Ok(()) => Ok(output_path),
            Err(e) => {
                discard(&output_path);
                Err(e)
            }
        }
    }
}

async fn run_blocking<F>(work: F) -> Result<(), ConverterError>
where
    F: FnOnce() -> Result<(), ConverterError> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        ConverterError::engine_failed(CODEC_ENGINE, format!("encoder task aborted: {e}"), None)
    })?
}

fn codec_error(e: ImageError) -> ConverterError {
    ConverterError::engine_failed(CODEC_ENGINE, e.to_string(), None)
}

fn reencode_file(
    input: &Path,
    output: &Path,
    target: RasterTarget,
    jpeg_quality: u8,
) -> Result<(), ConverterError> {
    let img = ImageReader::open(input)?
        .with_guessed_format()?
        .decode()
        .map_err(codec_error)?;
    encode_image(img, target, jpeg_quality, output)
}

fn encode_image(
    img: DynamicImage,
    target: RasterTarget,
    jpeg_quality: u8,
    output: &Path,
) -> Result<(), ConverterError> {
    let img = normalize_color(img, target.supports_alpha());
    let mut writer = BufWriter::new(File::create(output)?);

    let encoded = match target {
        RasterTarget::Jpeg => {
            img.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, jpeg_quality))
        }
        RasterTarget::Png => img.write_with_encoder(PngEncoder::new_with_quality(
            &mut writer,
            CompressionType::Best,
            PngFilter::Adaptive,
        )),
        RasterTarget::Ico => encode_ico(&img, &mut writer),
        other => img.write_to(&mut writer, other.image_format()),
    };
    encoded.map_err(codec_error)?;

    writer.flush()?;
    Ok(())
}

/// Reduces the image to 8-bit RGB or RGBA depending on the target.
fn normalize_color(img: DynamicImage, keep_alpha: bool) -> DynamicImage {
    match (img.color().has_alpha(), keep_alpha) {
        (true, true) => DynamicImage::ImageRgba8(img.to_rgba8()),
        (true, false) => flatten_onto_white(&img),
        (false, _) => DynamicImage::ImageRgb8(img.to_rgb8()),
    }
}

/// Composites the image over an opaque white background.
fn flatten_onto_white(img: &DynamicImage) -> DynamicImage {
    let rgba = img.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (src, dst) in rgba.pixels().zip(rgb.pixels_mut()) {
        let alpha = u32::from(src[3]);
        for c in 0..3 {
            let blended = u32::from(src[c]) * alpha + 255 * (255 - alpha);
            dst[c] = ((blended + 127) / 255) as u8;
        }
    }
    DynamicImage::ImageRgb8(rgb)
}

fn encode_ico<W: Write>(img: &DynamicImage, writer: W) -> ImageResult<()> {
    let largest = img.width().max(img.height()).clamp(1, ICO_SIZES[0]);
    let mut sizes: Vec<u32> = ICO_SIZES.iter().copied().filter(|s| *s <= largest).collect();
    if sizes.is_empty() {
        sizes.push(largest);
    }

    let rendered: Vec<_> = sizes
        .into_iter()
        .map(|size| img.resize(size, size, FilterType::Lanczos3).to_rgba8())
        .collect();
    let frames = rendered
        .iter()
        .map(|buf| {
            IcoFrame::as_png(buf.as_raw(), buf.width(), buf.height(), ExtendedColorType::Rgba8)
        })
        .collect::<ImageResult<Vec<_>>>()?;

    IcoEncoder::new(writer).encode_images(&frames)
}

fn rasterize_svg(input: &Path, output: &Path) -> Result<(), ConverterError> {
    let svg_failure = |reason: String| ConverterError::engine_failed(SVG_ENGINE, reason, None);

    let data = std::fs::read(input)?;
    let tree = resvg::usvg::Tree::from_data(&data, &resvg::usvg::Options::default())
        .map_err(|e| svg_failure(format!("invalid SVG: {e}")))?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| svg_failure("SVG has no drawable area".to_string()))?;

    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap.as_mut());
    pixmap
        .save_png(output)
        .map_err(|e| svg_failure(format!("could not write raster: {e}")))
}
