use crate::error::{FolioError, Result};
use anyhow::Context;
use clap::ValueEnum;
use serde::Serialize;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Ghostscript `-dPDFSETTINGS` presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Screen,
    Ebook,
    Printer,
    Prepress,
    Default,
}

impl CompressionLevel {
    pub const ALL: [CompressionLevel; 5] = [
        CompressionLevel::Screen,
        CompressionLevel::Ebook,
        CompressionLevel::Printer,
        CompressionLevel::Prepress,
        CompressionLevel::Default,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CompressionLevel::Screen => "screen",
            CompressionLevel::Ebook => "ebook",
            CompressionLevel::Printer => "printer",
            CompressionLevel::Prepress => "prepress",
            CompressionLevel::Default => "default",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CompressionLevel::Screen => "Screen-view-only quality, 72 dpi images",
            CompressionLevel::Ebook => "Low quality, 150 dpi images",
            CompressionLevel::Printer => "High quality, 300 dpi images",
            CompressionLevel::Prepress => "High quality preserving color, 300 dpi imgs",
            CompressionLevel::Default => "Almost identical to screen",
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An external program that rewrites `input` into a smaller `output`.
pub trait Optimizer {
    fn optimize(&self, input: &Path, output: &Path, level: CompressionLevel) -> Result<()>;
}

/// Runs Ghostscript's `pdfwrite` device as a blocking subprocess.
#[derive(Debug, Clone)]
pub struct Ghostscript {
    pub executable: PathBuf,
}

impl Ghostscript {
    pub fn new<P: Into<PathBuf>>(executable: P) -> Self {
        Ghostscript {
            executable: executable.into(),
        }
    }

    fn args(input: &Path, output: &Path, level: CompressionLevel) -> Vec<OsString> {
        let mut output_arg = OsString::from("-sOutputFile=");
        output_arg.push(output);
        vec![
            "-sDEVICE=pdfwrite".into(),
            format!("-dPDFSETTINGS=/{}", level.name()).into(),
            "-dCompatibilityLevel=1.4".into(),
            "-dNOPAUSE".into(),
            "-dQUIET".into(),
            "-dBATCH".into(),
            output_arg,
            input.as_os_str().to_os_string(),
        ]
    }
}

impl Default for Ghostscript {
    fn default() -> Self {
        Ghostscript::new("gs")
    }
}

impl Optimizer for Ghostscript {
    fn optimize(&self, input: &Path, output: &Path, level: CompressionLevel) -> Result<()> {
        let program = self.executable.display().to_string();
        let args = Self::args(input, output, level);
        debug!("running {} {:?}", program, args);

        let result = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| FolioError::ExternalProcess {
                program: program.clone(),
                reason: format!("could not be started: {}", e),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(FolioError::ExternalProcess {
                program,
                reason: format!("exited with {}: {}", result.status, stderr.trim()),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CompressRequest {
    pub input: PathBuf,
    /// Defaults to `<stem>_compressed.<ext>` next to the input.
    pub output: Option<PathBuf>,
    pub level: CompressionLevel,
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompressionStats {
    pub input: PathBuf,
    pub output: PathBuf,
    pub level: CompressionLevel,
    pub input_bytes: u64,
    pub output_bytes: u64,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CompressionStats {
    /// Percentage saved; `None` when either size is zero.
    pub fn reduction_percent(&self) -> Option<f64> {
        if self.input_bytes == 0 || self.output_bytes == 0 {
            return None;
        }
        Some((1.0 - self.output_bytes as f64 / self.input_bytes as f64) * 100.0)
    }
}

/// Human-readable size with two decimals: "512.00 B", "1.50 MB".
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB"] {
        if size < 1024.0 {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} GB", size)
}

pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match input.extension() {
        Some(ext) => format!("{}_compressed.{}", stem, ext.to_string_lossy()),
        None => format!("{}_compressed", stem),
    };
    input.with_file_name(name)
}

/// Run `optimizer` over the request's input and measure the result.
///
/// Whatever the optimizer left behind is deleted if it fails or exits
/// cleanly without producing the output file.
pub fn compress(optimizer: &dyn Optimizer, request: &CompressRequest) -> Result<CompressionStats> {
    let input = &request.input;
    if !input.is_file() {
        return Err(FolioError::NotFound {
            path: input.clone(),
        });
    }

    let output = request
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(input));
    if output.exists() && !request.force {
        return Err(FolioError::AlreadyExists { path: output });
    }

    let input_bytes = fs::metadata(input)
        .map_err(|e| FolioError::io(input, e))?
        .len();

    info!(
        "compressing {} at level {} ({})",
        input.display(),
        request.level,
        request.level.description()
    );
    let started = Instant::now();
    if let Err(err) = optimizer.optimize(input, &output, request.level) {
        remove_partial_output(&output);
        return Err(err);
    }
    let elapsed = started.elapsed();

    let output_bytes = match fs::metadata(&output) {
        Ok(meta) => meta.len(),
        Err(_) => {
            return Err(FolioError::ExternalProcess {
                program: "optimizer".to_string(),
                reason: format!("no output was written to {}", output.display()),
            })
        }
    };

    Ok(CompressionStats {
        input: input.clone(),
        output,
        level: request.level,
        input_bytes,
        output_bytes,
        elapsed,
    })
}

fn remove_partial_output(output: &Path) {
    if output.exists() {
        match fs::remove_file(output) {
            Ok(()) => debug!("removed partial output {}", output.display()),
            Err(e) => warn!("could not remove partial output {}: {}", output.display(), e),
        }
    }
}

pub fn list_levels() {
    println!("Available compression levels:");
    for level in CompressionLevel::ALL {
        println!("  {}: {}", level, level.description());
    }
}

pub fn run(request: &CompressRequest, ghostscript: &Path) -> anyhow::Result<CompressionStats> {
    let stats = compress(&Ghostscript::new(ghostscript), request)
        .with_context(|| format!("Compression failed: {}", request.input.display()))?;

    match stats.reduction_percent() {
        Some(reduction) => {
            println!("Compression successful!");
            println!("Original size: {}", format_size(stats.input_bytes));
            println!("Compressed size: {}", format_size(stats.output_bytes));
            println!("Reduction: {:.1}%", reduction);
        }
        None => warn!("could not calculate size reduction"),
    }
    println!("Time taken: {:.2} seconds", stats.elapsed.as_secs_f64());
    println!("Output saved to: {}", stats.output.display());

    Ok(stats)
}
