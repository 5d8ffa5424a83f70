//! Schema document assembly
//!
//! This module follows every `import`, `include` and `redefine` reachable
//! from a set of initial documents or namespaces and records, per directive,
//! where it resolved, what was loaded and what looked wrong.
//!
//! - [`request`] - load requests and their messages
//! - [`resolution`] - namespace / schemaLocation resolution policy
//! - [`engine`] - breadth-first traversal over the discovered documents
//! - [`checker`] - input configuration and lazily computed results
//! - [`report`] - log, warning and summary views

pub mod checker;
pub mod engine;
pub mod report;
pub mod request;
pub mod resolution;

pub use checker::{SchemaAssemblyChecker, Stage};
pub use engine::Assembly;
pub use report::{AssemblyReport, NamespaceSummary};
pub use request::{LoadRequest, Message, RequestKind, Severity};
pub use resolution::resolve_request;
