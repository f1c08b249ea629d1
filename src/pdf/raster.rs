//! Promotion of single images to one-page documents.

use crate::error::{FolioError, Result};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Resolution images are placed at when no other is requested.
pub const DEFAULT_DPI: f32 = 300.0;

/// Turns an image file into the bytes of a complete one-page PDF.
///
/// Implementations own color-mode normalization: whatever the input mode
/// (alpha, palette, grayscale, 16-bit), the page must come out as 8-bit RGB.
pub trait ImageConverter {
    fn convert(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Decodes with the `image` crate and embeds the raw RGB pixels as a
/// Flate-compressed image XObject filling the page.
#[derive(Debug, Clone, Copy)]
pub struct RasterConverter {
    pub dpi: f32,
}

impl Default for RasterConverter {
    fn default() -> Self {
        RasterConverter { dpi: DEFAULT_DPI }
    }
}

impl ImageConverter for RasterConverter {
    fn convert(&self, path: &Path) -> Result<Vec<u8>> {
        let img = image::open(path).map_err(|source| FolioError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        // Drops alpha and expands palette/grayscale to three channels.
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        let width_pt = width as f32 * 72.0 / self.dpi;
        let height_pt = height as f32 * 72.0 / self.dpi;
        debug!(
            "converting {} ({}x{} px) to a {:.1}x{:.1} pt page",
            path.display(),
            width,
            height,
            width_pt,
            height_pt
        );

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            rgb.into_raw(),
        ));

        let content = format!(
            "q\n{:.4} 0 0 {:.4} 0 0 cm\n/Im0 Do\nQ\n",
            width_pt, height_pt
        );
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(width_pt), Object::Real(height_pt)],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| FolioError::io(path, e))?;
        Ok(bytes)
    }
}

/// Materialize `bytes` as a temporary `.pdf` file for the duration of `f`.
///
/// The file is deleted when this returns, whether `f` succeeded or failed.
pub fn with_temporary_page_file<T, F>(bytes: &[u8], f: F) -> Result<T>
where
    F: FnOnce(&Path) -> Result<T>,
{
    let mut tmp = tempfile::Builder::new()
        .prefix("folio-page-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| FolioError::io(std::env::temp_dir(), e))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| FolioError::io(tmp.path(), e))?;

    f(tmp.path())
}
