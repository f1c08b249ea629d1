use anyhow::Result;
use clap::ValueEnum;
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::commands::compress::{compress, CompressRequest, CompressionLevel, Ghostscript};
use crate::commands::info::inspect;
use crate::commands::{merge, split};
use crate::pdf::RasterConverter;

// Request structs for tools

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PathRequest {
    #[schemars(description = "Path to a PDF or image file")]
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfSplitRequest {
    #[schemars(description = "Path to the PDF file to split")]
    pub path: String,
    #[schemars(description = "Directory to write the pieces into")]
    pub output_dir: String,
    #[schemars(
        description = "Comma-separated 1-based ranges (e.g., '1-3,5,7-9'). Omit for one file per page."
    )]
    #[serde(default)]
    pub ranges: Option<String>,
    #[schemars(description = "Replace files that already exist (default: false)")]
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfMergeRequest {
    #[schemars(description = "Directory holding the PDFs and images to merge")]
    pub input_dir: String,
    #[schemars(description = "Output file path (default: merged.pdf)")]
    #[serde(default = "default_merge_output")]
    pub output: String,
}

fn default_merge_output() -> String {
    "merged.pdf".to_string()
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfCompressRequest {
    #[schemars(description = "Path to the PDF file to compress")]
    pub path: String,
    #[schemars(description = "Output file path (default: <name>_compressed.pdf)")]
    #[serde(default)]
    pub output: Option<String>,
    #[schemars(
        description = "One of screen, ebook, printer, prepress, default (default: ebook)"
    )]
    #[serde(default)]
    pub level: Option<String>,
    #[schemars(description = "Replace the output file if it exists (default: false)")]
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct PdfServer {
    tool_router: ToolRouter<Self>,
    ghostscript: PathBuf,
}

impl PdfServer {
    pub fn new(ghostscript: PathBuf) -> Self {
        Self {
            tool_router: Self::tool_router(),
            ghostscript,
        }
    }
}

impl Default for PdfServer {
    fn default() -> Self {
        Self::new(PathBuf::from("gs"))
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Error: {}", e))
}

fn parse_level(level: Option<&str>) -> std::result::Result<CompressionLevel, String> {
    match level {
        None => Ok(CompressionLevel::Ebook),
        Some(name) => CompressionLevel::from_str(name, true).map_err(|_| {
            let names: Vec<_> = CompressionLevel::ALL.iter().map(|l| l.name()).collect();
            format!("unknown compression level {:?} (expected one of {})", name, names.join(", "))
        }),
    }
}

#[tool_router]
impl PdfServer {
    #[tool(description = "Get the kind (document or image), page count and size of a file")]
    fn pdf_info(&self, Parameters(PathRequest { path }): Parameters<PathRequest>) -> String {
        match inspect(Path::new(&path), &RasterConverter::default()) {
            Ok(info) => to_json(&info),
            Err(e) => format!("Error: {:#}", e),
        }
    }

    #[tool(
        description = "Split a PDF into one file per page, or one file per range when ranges like '1-3,5' are given"
    )]
    fn pdf_split(&self, Parameters(req): Parameters<PdfSplitRequest>) -> String {
        match split::run(&req.path, &req.output_dir, req.ranges.as_deref(), req.overwrite) {
            Ok(written) => {
                let result = SplitResult {
                    file_count: written.len(),
                    files: written.iter().map(|p| p.display().to_string()).collect(),
                };
                to_json(&result)
            }
            Err(e) => format!("Error: {:#}", e),
        }
    }

    #[tool(
        description = "Merge every PDF and image (jpg, png, tiff) in a directory into one PDF, ordered by file name"
    )]
    fn pdf_merge(&self, Parameters(req): Parameters<PdfMergeRequest>) -> String {
        match merge::run(&req.input_dir, &req.output) {
            Ok(summary) => to_json(&MergeResult {
                output_path: req.output,
                source_count: summary.sources,
                skipped_count: summary.skipped,
                page_count: summary.pages,
            }),
            Err(e) => format!("Error: {:#}", e),
        }
    }

    #[tool(description = "Compress a PDF with Ghostscript at the given quality level")]
    fn pdf_compress(&self, Parameters(req): Parameters<PdfCompressRequest>) -> String {
        let level = match parse_level(req.level.as_deref()) {
            Ok(level) => level,
            Err(e) => return format!("Error: {}", e),
        };
        let request = CompressRequest {
            input: PathBuf::from(req.path),
            output: req.output.map(PathBuf::from),
            level,
            force: req.force,
        };

        match compress(&Ghostscript::new(self.ghostscript.clone()), &request) {
            Ok(stats) => to_json(&CompressResult {
                output_path: stats.output.display().to_string(),
                level: stats.level.name().to_string(),
                input_bytes: stats.input_bytes,
                output_bytes: stats.output_bytes,
                reduction_percent: stats.reduction_percent(),
                seconds: stats.elapsed.as_secs_f64(),
            }),
            Err(e) => format!("Error: {}", e),
        }
    }
}

// Result types for MCP tools

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SplitResult {
    pub file_count: usize,
    pub files: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MergeResult {
    pub output_path: String,
    pub source_count: usize,
    pub skipped_count: usize,
    pub page_count: u32,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CompressResult {
    pub output_path: String,
    pub level: String,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub reduction_percent: Option<f64>,
    pub seconds: f64,
}

#[tool_handler]
impl ServerHandler for PdfServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "PDF page tools. Use pdf_info to check the page count of a file, pdf_split to \
                 break a PDF into pages or ranges, pdf_merge to combine a directory of PDFs and \
                 images, and pdf_compress to shrink a PDF with Ghostscript."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_server(ghostscript: PathBuf) -> Result<()> {
    let server = PdfServer::new(ghostscript);
    info!("serving MCP over stdio");

    // Serve using stdin/stdout as a tuple
    let service = server.serve((tokio::io::stdin(), tokio::io::stdout())).await?;

    service.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::tests::write_numbered_pdf;
    use tempfile::TempDir;

    fn server() -> PdfServer {
        PdfServer::default()
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level(None).unwrap(), CompressionLevel::Ebook);
        assert_eq!(parse_level(Some("Printer")).unwrap(), CompressionLevel::Printer);
        assert!(parse_level(Some("tiny")).unwrap_err().contains("prepress"));
    }

    #[test]
    fn test_pdf_info_tool() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.pdf");
        write_numbered_pdf(&path, 4);

        let out = server().pdf_info(Parameters(PathRequest {
            path: path.display().to_string(),
        }));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["page_count"], 4);
        assert_eq!(value["kind"], "document");
    }

    #[test]
    fn test_pdf_split_tool() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.pdf");
        write_numbered_pdf(&path, 5);

        let out = server().pdf_split(Parameters(PdfSplitRequest {
            path: path.display().to_string(),
            output_dir: dir.path().join("out").display().to_string(),
            ranges: Some("1-2,4".to_string()),
            overwrite: false,
        }));
        let result: SplitResult = serde_json::from_str(&out).unwrap();
        assert_eq!(result.file_count, 2);
        assert!(result.files[0].ends_with("doc_1-2.pdf"));
        assert!(result.files[1].ends_with("doc_4.pdf"));
    }

    #[test]
    fn test_pdf_split_tool_reports_errors() {
        let dir = TempDir::new().unwrap();
        let out = server().pdf_split(Parameters(PdfSplitRequest {
            path: dir.path().join("doc.pdf").display().to_string(),
            output_dir: dir.path().display().to_string(),
            ranges: Some("5-2".to_string()),
            overwrite: false,
        }));
        assert!(out.starts_with("Error: "));
    }

    #[test]
    fn test_pdf_merge_tool() {
        let dir = TempDir::new().unwrap();
        write_numbered_pdf(&dir.path().join("a.pdf"), 2);
        write_numbered_pdf(&dir.path().join("b.pdf"), 3);
        let output = dir.path().join("all.pdf");

        let out = server().pdf_merge(Parameters(PdfMergeRequest {
            input_dir: dir.path().display().to_string(),
            output: output.display().to_string(),
        }));
        let result: MergeResult = serde_json::from_str(&out).unwrap();
        assert_eq!(result.source_count, 2);
        assert_eq!(result.page_count, 5);
        assert!(output.exists());
    }

    #[test]
    fn test_pdf_compress_tool_rejects_unknown_level() {
        let out = server().pdf_compress(Parameters(PdfCompressRequest {
            path: "whatever.pdf".to_string(),
            output: None,
            level: Some("maximum".to_string()),
            force: false,
        }));
        assert!(out.starts_with("Error: unknown compression level"));
    }
}
