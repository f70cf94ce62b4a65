//! # Rusty Table
//!
//! A compiler for game-configuration spreadsheets. Designers keep data
//! tables in Excel workbooks; this crate validates them and turns them into
//! JSON documents, localized string files and typed C# accessor code.
//!
//! ## Features
//!
//! - **Workbook formats**: Excel `.xlsx`/`.xlsm` (OOXML) and `.xls` (BIFF8),
//!   read in pure Rust
//! - **Sheet convention**: `@` markers bound the data block, the first four
//!   rows hold sheet name, descriptions, property names and types
//! - **Key integrity**: unique primary keys and checked `name[Table]` foreign
//!   keys across every workbook
//! - **Typed cells**: every value must parse as its declared type
//! - **Localization**: string workbooks become one `GSTR_<language>.json`
//!   per language column
//! - **Code generation**: a deterministic `GameTables.cs` with one class per
//!   sheet and a table manager
//! - **Encryption**: optional AES-256-CBC of every output document
//!
//! ## Stages
//!
//! - [`schema::SchemaCollector`]: discovers the [`schema::SheetSchema`] of every sheet
//! - [`extract::TableExtractor`]: validates keys and values, extracts data rows
//! - [`extract::StringExtractor`]: validates and transposes localization sheets
//! - [`codegen::CodeGenerator`]: writes the accessor code
//! - [`pipeline::Pipeline`]: runs the stages for one [`config::ExtractConfig`]

pub mod address;
pub mod codegen;
pub mod config;
pub mod crypto;
pub mod diagnostics;
pub mod error;
pub mod extract;
mod helpers;
pub mod pipeline;
pub mod schema;
pub mod spreadsheet;

pub use address::AddressedError;
pub use address::ErrorKind;
pub use address::TableAddress;
pub use error::RustyTableError;
pub use pipeline::ExtractionKind;
pub use pipeline::Pipeline;
