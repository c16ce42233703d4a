//! xlsx2docx - Spreadsheet-to-document report generator
//!
//! This crate converts a findings tracker spreadsheet (XLSX) into a formatted
//! report document (DOCX). Each data row of the spreadsheet becomes one
//! single-column table section in the output, with severity color coding taken
//! from the spreadsheet's cell fills, automatic step parsing for proof-of-concept
//! text, and inline image embedding.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xlsx2docx::GeneratorBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create a generator with default settings
//!     let generator = GeneratorBuilder::new().build()?;
//!
//!     // Generate the report from the tracker and the template
//!     let summary = generator.generate("findings.xlsx", "template.docx", "report.docx")?;
//!
//!     println!("Generated {} sections from {} rows", summary.sections, summary.rows);
//!
//!     Ok(())
//! }
//! ```
//!
//! For in-memory generation, use `Cursor`:
//!
//! ```rust,no_run
//! use std::io::Cursor;
//! use xlsx2docx::GeneratorBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = GeneratorBuilder::new().build()?;
//! let xlsx_data: Vec<u8> = vec![]; // Your spreadsheet bytes
//! let template_data: Vec<u8> = vec![]; // Your template bytes
//! let mut output = Cursor::new(Vec::new());
//! generator.generate_from_readers(
//!     Cursor::new(xlsx_data),
//!     Cursor::new(template_data),
//!     &mut output,
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use xlsx2docx::GeneratorBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Resolve image references against an uploads directory and use a
//!     // stronger lightening for the third table row
//!     let generator = GeneratorBuilder::new()
//!         .with_image_root("uploads/images")
//!         .with_lighten_factor(0.6)
//!         .build()?;
//!
//!     generator.generate("findings.xlsx", "template.docx", "report.docx")?;
//!
//!     Ok(())
//! }
//! ```

mod builder;
mod color;
mod docx;
mod error;
mod parser;
mod section;
mod security;
mod steps;
mod types;

// 公開API
pub use builder::{Generator, GeneratorBuilder};
pub use color::RgbColor;
pub use error::XlsxToDocxError;
pub use steps::parse_steps;
pub use types::{GenerationSummary, Step};
