//! Document conversion through external office and typesetting engines.
//!
//! Every routine is an ordered chain of engines. An engine that is not
//! installed (or, for Office automation, not on Windows) hands over to the
//! next one; an engine that runs and fails ends the conversion.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::config::EngineConfig;
use super::error::ConverterError;
use super::markdown::{render_markdown, styled_document};
use super::process::EngineCommand;
use super::strategy::{expect_output, run_chain, Attempt, Strategy};
use super::traits::{output_path_for, scratch_path_for, Converter, ConverterDescriptor};
use crate::format::FormatToken;
use crate::workspace::{discard, TempGuard};

const INPUT_FORMATS: &[&str] = &["pdf", "docx", "pptx", "txt", "html", "md"];
const OUTPUT_FORMATS: &[&str] = &["pdf", "docx"];

/// Exit code the automation script uses when the Office COM server is missing.
const OFFICE_UNAVAILABLE_EXIT: i32 = 3;

/// Office applications driven through COM automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficeApp {
    Word,
    PowerPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentEngine {
    Pdf2Docx,
    Office(OfficeApp),
    LibreOffice,
    WeasyPrint,
}

impl Strategy for DocumentEngine {
    fn engine(&self) -> &'static str {
        match self {
            Self::Pdf2Docx => "pdf2docx",
            Self::Office(OfficeApp::Word) => "Microsoft Word",
            Self::Office(OfficeApp::PowerPoint) => "Microsoft PowerPoint",
            Self::LibreOffice => "LibreOffice",
            Self::WeasyPrint => "WeasyPrint",
        }
    }

    fn install_hint(&self) -> &'static str {
        match self {
            Self::Pdf2Docx => "Install pdf2docx (pip install pdf2docx).",
            Self::Office(_) => "Install Microsoft Office (Windows only).",
            Self::LibreOffice => "Install LibreOffice.",
            Self::WeasyPrint => "Install WeasyPrint (pip install weasyprint).",
        }
    }
}

/// A supported document conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Routine {
    PdfToDocx,
    DocxToPdf,
    PptxToPdf,
    TxtToPdf,
    HtmlToPdf,
    MarkdownToPdf,
}

impl Routine {
    fn resolve(input: &FormatToken, output: &FormatToken) -> Option<Self> {
        match (input.as_str(), output.as_str()) {
            ("pdf", "docx") => Some(Self::PdfToDocx),
            ("docx", "pdf") => Some(Self::DocxToPdf),
            ("pptx", "pdf") => Some(Self::PptxToPdf),
            ("txt", "pdf") => Some(Self::TxtToPdf),
            ("html", "pdf") => Some(Self::HtmlToPdf),
            ("md", "pdf") => Some(Self::MarkdownToPdf),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::PdfToDocx => "PDF to DOCX",
            Self::DocxToPdf => "DOCX to PDF",
            Self::PptxToPdf => "PPTX to PDF",
            Self::TxtToPdf => "TXT to PDF",
            Self::HtmlToPdf => "HTML to PDF",
            Self::MarkdownToPdf => "Markdown to PDF",
        }
    }

    /// Engines able to perform the routine, most preferred first.
    ///
    /// Markdown is rendered to HTML first and then follows the HTML chain.
    fn strategies(self) -> &'static [DocumentEngine] {
        use DocumentEngine::*;
        match self {
            Self::PdfToDocx => &[Pdf2Docx, LibreOffice],
            Self::DocxToPdf => &[Office(OfficeApp::Word), LibreOffice],
            Self::PptxToPdf => &[Office(OfficeApp::PowerPoint), LibreOffice],
            Self::TxtToPdf => &[LibreOffice],
            Self::HtmlToPdf | Self::MarkdownToPdf => &[WeasyPrint, LibreOffice],
        }
    }

    /// LibreOffice import filter and `--convert-to` argument.
    fn libreoffice_filters(self) -> (Option<&'static str>, &'static str) {
        match self {
            Self::PdfToDocx => (Some("writer_pdf_import"), "docx:MS Word 2007 XML"),
            _ => (None, "pdf"),
        }
    }

    fn target_extension(self) -> &'static str {
        match self {
            Self::PdfToDocx => "docx",
            _ => "pdf",
        }
    }
}

/// Converts between document formats.
pub struct DocumentConverter {
    config: EngineConfig,
    descriptor: ConverterDescriptor,
}

impl DocumentConverter {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            descriptor: ConverterDescriptor::new(INPUT_FORMATS, OUTPUT_FORMATS),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    async fn run_routine(
        &self,
        routine: Routine,
        input: &Path,
        output: &Path,
    ) -> Result<PathBuf, ConverterError> {
        run_chain(routine.label(), routine.strategies(), |engine| {
            self.attempt(engine, routine, input, output)
        })
        .await
    }

    async fn markdown_to_pdf(&self, input: &Path, output: &Path) -> Result<PathBuf, ConverterError> {
        let source = tokio::fs::read(input).await?;
        let title = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let html = styled_document(&title, &render_markdown(&String::from_utf8_lossy(&source)));

        let rendered = scratch_path_for(output, "rendered", "html");
        let _guard = TempGuard::for_path(&rendered);
        tokio::fs::write(&rendered, html).await?;
        debug!(rendered = %rendered.display(), "Rendered Markdown to HTML");

        self.run_routine(Routine::MarkdownToPdf, &rendered, output).await
    }

    async fn attempt(
        &self,
        engine: DocumentEngine,
        routine: Routine,
        input: &Path,
        output: &Path,
    ) -> Attempt {
        let timeout = self.config.timeout();
        match engine {
            DocumentEngine::Pdf2Docx => {
                EngineCommand::new(engine.engine(), &self.config.pdf2docx_path, timeout)
                    .arg("convert")
                    .arg(input)
                    .arg(output)
                    .run()
                    .await
                    .and_then(|_| expect_output(engine.engine(), output))
            }
            DocumentEngine::WeasyPrint => {
                EngineCommand::new(engine.engine(), &self.config.weasyprint_path, timeout)
                    .arg(input)
                    .arg(output)
                    .run()
                    .await
                    .and_then(|_| expect_output(engine.engine(), output))
            }
            DocumentEngine::Office(app) => self.office(engine.engine(), app, input, output).await,
            DocumentEngine::LibreOffice => self.libreoffice(routine, input, output, timeout).await,
        }
    }

    async fn office(&self, engine: &str, app: OfficeApp, input: &Path, output: &Path) -> Attempt {
        if !cfg!(windows) {
            return Attempt::Absent {
                engine: engine.to_string(),
                reason: "Office automation is only available on Windows".to_string(),
            };
        }

        let (input, output) = match (std::path::absolute(input), std::path::absolute(output)) {
            (Ok(input), Ok(output)) => (input, output),
            (Err(e), _) | (_, Err(e)) => return Attempt::Failed(e.into()),
        };

        EngineCommand::new(engine, &self.config.powershell_path, self.config.timeout())
            .args(["-NoProfile", "-NonInteractive", "-Command"])
            .arg(office_script(app, &input, &output))
            .absent_on_exit_code(OFFICE_UNAVAILABLE_EXIT)
            .run()
            .await
            .and_then(|_| expect_output(engine, &output))
    }

    /// Runs LibreOffice headless with a private profile and output directory.
    ///
    /// LibreOffice names its output after the input stem, so the artifact is
    /// moved to the canonical output path afterwards.
    async fn libreoffice(
        &self,
        routine: Routine,
        input: &Path,
        output: &Path,
        timeout: Duration,
    ) -> Attempt {
        let engine = DocumentEngine::LibreOffice.engine();
        let scratch = scratch_dir_for(output, "libreoffice");
        let _guard = TempGuard::for_path(&scratch);
        let outdir = scratch.join("out");

        let profile = match prepare_libreoffice_dirs(&outdir, &scratch.join("profile")).await {
            Ok(profile) => profile,
            Err(e) => return Attempt::Failed(e.into()),
        };

        let (infilter, convert_to) = routine.libreoffice_filters();
        let mut command = EngineCommand::new(engine, &self.config.libreoffice_path, timeout)
            .arg(format!("-env:UserInstallation={}", file_url(&profile)))
            .arg("--headless");
        if let Some(filter) = infilter {
            command = command.arg(format!("--infilter={filter}"));
        }
        let command = command
            .args(["--convert-to", convert_to])
            .arg("--outdir")
            .arg(&outdir)
            .arg(input);

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let produced = outdir.join(format!("{}.{}", stem, routine.target_extension()));

        match command
            .run()
            .await
            .and_then(|_| expect_output(engine, &produced))
        {
            Attempt::Succeeded(produced) => match tokio::fs::rename(&produced, output).await {
                Ok(()) => Attempt::Succeeded(output.to_path_buf()),
                Err(e) => Attempt::Failed(e.into()),
            },
            other => other,
        }
    }
}

#[async_trait]
impl Converter for DocumentConverter {
    fn name(&self) -> &str {
        "document"
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
        let Some(routine) = Routine::resolve(&input_format, output_format) else {
            return Err(ConverterError::unsupported_pair(
                self.name(),
                input_format,
                output_format.clone(),
            ));
        };

        let output_path = output_path_for(input_path, output_format);
        debug!(routine = routine.label(), input = %input_path.display(), "Converting document");

        let result = match routine {
            Routine::MarkdownToPdf => self.markdown_to_pdf(input_path, &output_path).await,
            _ => self.run_routine(routine, input_path, &output_path).await,
        };

        if result.is_err() {
            discard(&output_path);
        }
        result
    }
}

async fn prepare_libreoffice_dirs(outdir: &Path, profile: &Path) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(outdir).await?;
    tokio::fs::create_dir_all(profile).await?;
    std::path::absolute(profile)
}

fn scratch_dir_for(path: &Path, label: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}_{label}"))
}

/// `file://` URL for an absolute path, as LibreOffice expects for profiles.
fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{path}")
    } else {
        format!("file:///{path}")
    }
}

/// PowerShell script that exports a document to PDF through Office COM.
fn office_script(app: OfficeApp, input: &Path, output: &Path) -> String {
    let (input, output) = (ps_quote(input), ps_quote(output));
    let (prog_id, body) = match app {
        OfficeApp::Word => (
            "Word.Application",
            format!(
                "$app.Visible = $false\n    \
                 $doc = $app.Documents.Open({input}, $false, $true)\n    \
                 $doc.ExportAsFixedFormat({output}, 17)\n    \
                 $doc.Close($false)"
            ),
        ),
        OfficeApp::PowerPoint => (
            "PowerPoint.Application",
            format!(
                "$pres = $app.Presentations.Open({input}, $true, $false, $false)\n    \
                 $pres.SaveAs({output}, 32)\n    \
                 $pres.Close()"
            ),
        ),
    };
    format!(
        "$ErrorActionPreference = 'Stop'\n\
         try {{ $app = New-Object -ComObject {prog_id} }} catch {{ exit {OFFICE_UNAVAILABLE_EXIT} }}\n\
         try {{\n    {body}\n}} finally {{\n    $app.Quit()\n}}\n"
    )
}

fn ps_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routine_resolution() {
        assert_eq!(
            Routine::resolve(&"pdf".into(), &"docx".into()),
            Some(Routine::PdfToDocx)
        );
        assert_eq!(
            Routine::resolve(&"md".into(), &"pdf".into()),
            Some(Routine::MarkdownToPdf)
        );
        // Advertised by the capability sets, but no routine exists.
        assert_eq!(Routine::resolve(&"txt".into(), &"docx".into()), None);
        assert_eq!(Routine::resolve(&"pdf".into(), &"pdf".into()), None);
    }

    #[test]
    fn test_chains_prefer_dedicated_engines() {
        assert_eq!(
            Routine::PdfToDocx.strategies(),
            &[DocumentEngine::Pdf2Docx, DocumentEngine::LibreOffice]
        );
        assert_eq!(
            Routine::PptxToPdf.strategies()[0],
            DocumentEngine::Office(OfficeApp::PowerPoint)
        );
        assert_eq!(Routine::TxtToPdf.strategies(), &[DocumentEngine::LibreOffice]);
    }

    #[test]
    fn test_file_url() {
        assert_eq!(file_url(Path::new("/tmp/w/profile")), "file:///tmp/w/profile");
        assert_eq!(file_url(Path::new("C:\\w\\profile")), "file:///C:/w/profile");
    }

    #[test]
    fn test_office_script_quotes_paths() {
        let script = office_script(
            OfficeApp::Word,
            Path::new("C:\\work\\o'brien.docx"),
            Path::new("C:\\work\\o'brien_converted.pdf"),
        );
        assert!(script.contains("New-Object -ComObject Word.Application"));
        assert!(script.contains("'C:\\work\\o''brien.docx'"));
        assert!(script.contains("ExportAsFixedFormat('C:\\work\\o''brien_converted.pdf', 17)"));
        assert!(script.contains("exit 3"));

        let script = office_script(OfficeApp::PowerPoint, Path::new("a.pptx"), Path::new("b.pdf"));
        assert!(script.contains("PowerPoint.Application"));
        assert!(script.contains("SaveAs('b.pdf', 32)"));
    }

    #[tokio::test]
    async fn test_unmapped_pair_is_unsupported() {
        let result = DocumentConverter::with_defaults()
            .convert(Path::new("/tmp/notes.txt"), &"docx".into())
            .await;
        match result {
            Err(ConverterError::UnsupportedPair { converter, input, output }) => {
                assert_eq!(converter, "document");
                assert_eq!(input, "txt");
                assert_eq!(output, "docx");
            }
            other => panic!("expected unsupported pair, got {:?}", other),
        }
    }

    #[cfg(unix)]
    mod engines {
        use super::*;
        use crate::testing::fixtures::{
            dir_entries as entries, install_engine as install, COPYING_ENGINE, FAILING_ENGINE,
            FAKE_LIBREOFFICE, SILENT_ENGINE,
        };
        use tempfile::TempDir;

        struct Fixture {
            bin: TempDir,
            work: TempDir,
            config: EngineConfig,
        }

        fn fixture() -> Fixture {
            let bin = TempDir::new().unwrap();
            let config = EngineConfig::default()
                .with_libreoffice(install(bin.path(), "libreoffice", FAKE_LIBREOFFICE))
                .with_pdf2docx(bin.path().join("missing-pdf2docx"))
                .with_weasyprint(bin.path().join("missing-weasyprint"))
                .with_timeout(30);
            Fixture {
                bin,
                work: TempDir::new().unwrap(),
                config,
            }
        }

        #[tokio::test]
        async fn test_pdf_to_docx_falls_back_to_libreoffice() {
            let fx = fixture();
            let input = fx.work.path().join("report.pdf");
            std::fs::write(&input, b"%PDF-1.7").unwrap();

            let output = DocumentConverter::new(fx.config.clone())
                .convert(&input, &"docx".into())
                .await
                .unwrap();

            assert_eq!(output, fx.work.path().join("report_converted.docx"));
            assert_eq!(std::fs::read_to_string(&output).unwrap(), "converted by libreoffice");
            assert_eq!(std::fs::read(&input).unwrap(), b"%PDF-1.7");
            assert_eq!(
                entries(fx.work.path()),
                vec!["report.pdf", "report_converted.docx"]
            );
        }

        #[tokio::test]
        async fn test_pptx_to_pdf_lands_at_canonical_path() {
            let fx = fixture();
            let input = fx.work.path().join("deck.pptx");
            std::fs::write(&input, b"PK").unwrap();

            let output = DocumentConverter::new(fx.config.clone())
                .convert(&input, &"pdf".into())
                .await
                .unwrap();

            assert_eq!(output, fx.work.path().join("deck_converted.pdf"));
            assert!(output.is_file());
            assert!(!fx.work.path().join("deck.pdf").exists());
            assert_eq!(entries(fx.work.path()), vec!["deck.pptx", "deck_converted.pdf"]);
        }

        #[tokio::test]
        async fn test_no_engine_installed() {
            let fx = fixture();
            let config = fx.config.clone().with_libreoffice("/nonexistent/libreoffice");
            let input = fx.work.path().join("letter.docx");
            std::fs::write(&input, b"PK").unwrap();

            let result = DocumentConverter::new(config)
                .convert(&input, &"pdf".into())
                .await;

            match result {
                Err(e @ ConverterError::EngineNotInstalled { .. }) => {
                    assert_eq!(
                        e.to_string(),
                        "DOCX to PDF requires Microsoft Word or LibreOffice to be installed. \
                         Install Microsoft Office (Windows only). Install LibreOffice."
                    );
                }
                other => panic!("expected engine not installed, got {:?}", other),
            }
            assert_eq!(entries(fx.work.path()), vec!["letter.docx"]);
        }

        #[tokio::test]
        async fn test_engine_failure_stops_the_chain() {
            let fx = fixture();
            let config = fx
                .config
                .clone()
                .with_pdf2docx(install(fx.bin.path(), "pdf2docx", FAILING_ENGINE));
            let input = fx.work.path().join("scan.pdf");
            std::fs::write(&input, b"%PDF-1.4").unwrap();

            let result = DocumentConverter::new(config)
                .convert(&input, &"docx".into())
                .await;

            match result {
                Err(ConverterError::EngineFailed { engine, reason, .. }) => {
                    assert_eq!(engine, "pdf2docx");
                    assert!(reason.contains("corrupt xref table"));
                }
                other => panic!("expected engine failure, got {:?}", other),
            }
            // LibreOffice was never tried.
            assert_eq!(entries(fx.work.path()), vec!["scan.pdf"]);
        }

        #[tokio::test]
        async fn test_silent_engine_is_a_failure() {
            let fx = fixture();
            let config = fx
                .config
                .clone()
                .with_libreoffice(install(fx.bin.path(), "silent", SILENT_ENGINE));
            let input = fx.work.path().join("notes.txt");
            std::fs::write(&input, b"hello").unwrap();

            let result = DocumentConverter::new(config)
                .convert(&input, &"pdf".into())
                .await;

            match result {
                Err(ConverterError::EngineFailed { reason, .. }) => {
                    assert_eq!(reason, "reported success but produced no output")
                }
                other => panic!("expected engine failure, got {:?}", other),
            }
            assert_eq!(entries(fx.work.path()), vec!["notes.txt"]);
        }

        #[tokio::test]
        async fn test_markdown_renders_through_html_chain() {
            let fx = fixture();
            let config = fx
                .config
                .clone()
                .with_weasyprint(install(fx.bin.path(), "weasyprint", COPYING_ENGINE));
            let input = fx.work.path().join("readme.md");
            std::fs::write(&input, "# Hello\n\n| a | b |\n|---|---|\n| 1 | 2 |\n").unwrap();

            let output = DocumentConverter::new(config)
                .convert(&input, &"pdf".into())
                .await
                .unwrap();

            let body = std::fs::read_to_string(&output).unwrap();
            assert!(body.contains("<title>readme</title>"));
            assert!(body.contains("<h1>Hello</h1>"));
            assert!(body.contains("<td>1</td><td>2</td>"));
            assert_eq!(entries(fx.work.path()), vec!["readme.md", "readme_converted.pdf"]);
        }

        #[tokio::test]
        async fn test_html_falls_back_to_libreoffice() {
            let fx = fixture();
            let input = fx.work.path().join("page.html");
            std::fs::write(&input, "<p>hi</p>").unwrap();

            let output = DocumentConverter::new(fx.config.clone())
                .convert(&input, &"pdf".into())
                .await
                .unwrap();

            assert_eq!(std::fs::read_to_string(&output).unwrap(), "converted by libreoffice");
        }
    }
}
