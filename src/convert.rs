//! Office document to PDF conversion through an external tool

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Capability to turn a document into a PDF inside a directory
///
/// Implementations choose the produced file name themselves and return it.
pub trait Converter {
    fn convert(&self, input: &Path, output_dir: &Path) -> Result<PathBuf>;
}

/// LibreOffice (`soffice`) running headless
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: String,
}

impl Default for SofficeConverter {
    fn default() -> Self {
        Self { program: "soffice".to_string() }
    }
}

impl SofficeConverter {
    /// Use a specific executable, e.g. "libreoffice" or a full path
    pub fn with_program(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Converter for SofficeConverter {
    fn convert(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        let expected = expected_output(input, output_dir)?;
        let previous = modified_time(&expected);

        let mut cmd = Command::new(&self.program);
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg(input)
            .arg("--outdir")
            .arg(output_dir);

        debug!(program = %self.program, input = %input.display(), outdir = %output_dir.display(), "running converter");

        // Blocks until the tool exits; there is no timeout
        let result = cmd.output().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::ConverterNotFound(self.program.clone()),
            _ => Error::Io(e),
        })?;

        let stdout = String::from_utf8_lossy(&result.stdout);
        let stderr = String::from_utf8_lossy(&result.stderr);
        debug!(stdout = %stdout.trim(), stderr = %stderr.trim(), "converter finished");

        if !result.status.success() {
            // Never leave a half-written PDF where a finished one is expected
            if is_fresh(&expected, previous) {
                discard(&expected);
            }
            return Err(Error::ConversionFailed {
                input: input.to_path_buf(),
                status: result.status,
                stderr: stderr.trim().to_string(),
            });
        }

        // A file left over from an earlier run does not count as output
        if is_fresh(&expected, previous) {
            Ok(expected)
        } else {
            Err(Error::ConvertedFileMissing(expected))
        }
    }
}

/// Where the tool writes its result: `<output_dir>/<input stem>.pdf`
pub fn expected_output(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| Error::General(format!("Input has no file name: {}", input.display())))?;
    let mut name = stem.to_os_string();
    name.push(".pdf");
    Ok(output_dir.join(name))
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Whether `path` exists and was written after `previous` was taken
fn is_fresh(path: &Path, previous: Option<SystemTime>) -> bool {
    match modified_time(path) {
        Some(now) => previous.map_or(true, |before| now != before),
        None => false,
    }
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "could not remove unfinished PDF");
    }
}

/// Convert `input` and move the result to `output`
///
/// The converter writes into the directory of `output`; its chosen file is then
/// renamed. Nothing is renamed when conversion fails.
pub fn convert_to_pdf<C: Converter + ?Sized>(converter: &C, input: &Path, output: &Path) -> Result<()> {
    if !input.exists() {
        return Err(Error::FileNotFound(input.to_path_buf()));
    }

    let output_dir = match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let produced = converter.convert(input, output_dir)?;
    if !produced.exists() {
        return Err(Error::ConvertedFileMissing(produced));
    }

    if produced != output {
        if let Err(e) = fs::rename(&produced, output) {
            discard(&produced);
            return Err(Error::Io(e));
        }
    }

    info!(input = %input.display(), output = %output.display(), "converted to PDF");
    Ok(())
}
