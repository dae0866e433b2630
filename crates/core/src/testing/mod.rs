//! Testing utilities and mock implementations.
//!
//! This module provides a mock converter and fixtures for synthesizing
//! inputs and stand-in engines, allowing conversion flows to be tested
//! without LibreOffice, FFmpeg or the other external programs installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use transmute_core::testing::{fixtures, MockConverter};
//!
//! let converter = MockConverter::named("stub", &["png"], &["jpg"]);
//! let png = fixtures::translucent_png(16, 16);
//!
//! let converted = service.submit(&png, "logo.png", "jpg").await?;
//! ```

mod mock_converter;

pub use mock_converter::{MockConverter, MockOutput, RecordedConversion};

/// Test fixtures and helper functions.
pub mod fixtures {
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::path::Path;
    use tokio::io::AsyncReadExt;

    use crate::service::ConvertedFile;

    /// Stand-in for LibreOffice: writes `<outdir>/<input stem>.<format>`
    /// exactly where the real engine would.
    pub const FAKE_LIBREOFFICE: &str = r#"#!/bin/sh
outdir=""; fmt=""; input=""
while [ $# -gt 0 ]; do
  case "$1" in
    --convert-to) fmt="${2%%:*}"; shift 2 ;;
    --outdir) outdir="$2"; shift 2 ;;
    -*) shift ;;
    *) input="$1"; shift ;;
  esac
done
name=$(basename "$input")
printf 'converted by libreoffice' > "$outdir/${name%.*}.$fmt"
"#;

    /// Exits cleanly without writing anything.
    pub const SILENT_ENGINE: &str = "#!/bin/sh\nexit 0\n";

    /// Fails the way a real engine reports a corrupt input.
    pub const FAILING_ENGINE: &str =
        "#!/bin/sh\necho 'parsing page 1' >&2\necho 'Error: corrupt xref table' >&2\nexit 1\n";

    /// Stand-in for `<engine> <in> <out>` tools: copies the input through.
    pub const COPYING_ENGINE: &str = "#!/bin/sh\ncp \"$1\" \"$2\"\n";

    /// PNG with a transparent background and one opaque red pixel at (0, 0).
    pub fn translucent_png(width: u32, height: u32) -> Vec<u8> {
        let mut img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        encode_png(&img)
    }

    /// Fully opaque PNG filled with one color.
    pub fn opaque_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([color[0], color[1], color[2], 255]));
        encode_png(&img)
    }

    /// Palette GIF with a transparent background and one opaque red pixel.
    pub fn translucent_gif(width: u32, height: u32) -> Vec<u8> {
        let mut img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        encode(&img, ImageFormat::Gif)
    }

    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        encode(img, ImageFormat::Png)
    }

    fn encode(img: &RgbaImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, format)
            .expect("encoding an in-memory image cannot fail");
        bytes.into_inner()
    }

    /// Streams a converted output to the end and drops it, removing its
    /// working files.
    pub async fn read_converted(converted: ConvertedFile) -> Vec<u8> {
        let mut reader = converted.open().await.expect("open converted output");
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .await
            .expect("read converted output");
        bytes
    }

    /// Writes an executable shell script standing in for an engine.
    #[cfg(unix)]
    pub fn install_engine(dir: &Path, name: &str, script: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, script).expect("write engine script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("make engine script executable");
        path
    }

    /// Sorted names of the entries in `dir`.
    pub fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
