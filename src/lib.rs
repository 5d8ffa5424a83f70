//! # xsd-assembly
//!
//! Checks how a set of XML Schema documents assembles into one schema.
//!
//! Starting from initial schema documents or namespace URIs, every `import`,
//! `include` and `redefine` is followed breadth-first. Each reference is
//! resolved through XML catalogs and by relative `schemaLocation`, and every
//! contradiction found on the way is reported against the directive that
//! caused it.
//!
//! ## Features
//!
//! - OASIS XML catalog resolution (`uri`, `system`, `rewrite*`, `*Suffix`, `nextCatalog`)
//! - Breadth-first traversal without recursion, each document parsed once
//! - Per-directive log and warning messages
//! - Namespace prefix reconciliation across all loaded documents
//! - Serializable report
//!
//! ## Example
//!
//! ```rust,no_run
//! use xsd_assembly::SchemaAssemblyChecker;
//!
//! let mut checker = SchemaAssemblyChecker::new();
//! checker
//!     .add_catalog_file("xml-catalog.xml")
//!     .add_input("http://example.com/exchange/1.0/");
//!
//! if !checker.initialization_errors().is_empty() {
//!     // nothing to check
//! }
//! for line in checker.assembly_warning_messages() {
//!     println!("{}", line);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Resource location
pub mod locations;
pub mod catalog;

// Schema documents
pub mod namespaces;
pub mod documents;

// Assembly
pub mod assembly;

// Re-exports for convenience
pub use assembly::{
    Assembly, AssemblyReport, LoadRequest, Message, NamespaceSummary, RequestKind, SchemaAssemblyChecker,
    Severity, Stage,
};
pub use catalog::{CatalogResolver, UriResolver, XmlCatalog};
pub use error::{Error, Result};
pub use limits::Limits;
pub use locations::Location;

/// Version of the xsd-assembly library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XML Schema namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
