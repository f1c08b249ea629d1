pub mod assemble;
pub mod document;
pub mod raster;
pub mod source;

pub use assemble::Assembler;
pub use raster::{ImageConverter, RasterConverter};
pub use source::{PageSource, SourceKind};
