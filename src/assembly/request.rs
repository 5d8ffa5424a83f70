//! Load requests and their messages

use std::fmt;

use serde::Serialize;
use url::Url;

use crate::documents::SchemaReference;

/// What caused a document to be requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind {
    /// A schema document or namespace given as input
    InitialLoad,
    /// `xs:import`
    Import,
    /// `xs:include`
    Include,
    /// `xs:redefine`
    Redefine,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestKind::InitialLoad => "initial load",
            RequestKind::Import => "import",
            RequestKind::Include => "include",
            RequestKind::Redefine => "redefine",
        };
        f.write_str(name)
    }
}

/// Severity of an assembly message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// What happened; shown in verbose output
    Log,
    /// Something about the assembly is wrong or ambiguous
    Warning,
}

/// One finding attached to a load request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Severity
    pub severity: Severity,
    /// Text; file locations appear as full `file:` URLs
    pub text: String,
}

/// One attempted contribution of a document to the schema
#[derive(Debug, Clone, Serialize)]
pub struct LoadRequest {
    /// What caused the request
    pub kind: RequestKind,
    /// Document containing the directive; `None` for initial loads
    pub parent: Option<Url>,
    /// Line of the directive in the parent; 0 for initial loads
    pub parent_line: u32,
    /// Namespace the loaded document must declare as its target namespace
    pub expected_namespace: Option<String>,
    /// `namespace` attribute as written
    pub namespace_attr: Option<String>,
    /// `schemaLocation` attribute as written
    pub schema_location_attr: Option<String>,
    /// Local document the namespace resolved to through the catalog
    pub namespace_resolved: Option<Url>,
    /// Local document the schemaLocation resolved to
    pub schema_location_resolved: Option<Url>,
    /// Findings, in the order they were made
    pub messages: Vec<Message>,
}

impl LoadRequest {
    fn new(kind: RequestKind) -> Self {
        Self {
            kind,
            parent: None,
            parent_line: 0,
            expected_namespace: None,
            namespace_attr: None,
            schema_location_attr: None,
            namespace_resolved: None,
            schema_location_resolved: None,
            messages: Vec::new(),
        }
    }

    /// Initial load of a schema document
    pub fn initial_file(url: &Url) -> Self {
        Self {
            schema_location_attr: Some(url.to_string()),
            ..Self::new(RequestKind::InitialLoad)
        }
    }

    /// Initial load of a namespace through the catalog
    pub fn initial_namespace(namespace: &str) -> Self {
        Self {
            expected_namespace: Some(namespace.trim().to_string()),
            namespace_attr: Some(namespace.to_string()),
            ..Self::new(RequestKind::InitialLoad)
        }
    }

    /// Request for a directive found in `parent`
    ///
    /// Imports expect their own `namespace`; includes and redefines inherit
    /// the expectation of the request that loaded `parent`. Only imports
    /// carry a `namespace` attribute.
    pub fn from_reference(parent: &Url, inherited: Option<&str>, reference: &SchemaReference) -> Self {
        let (namespace_attr, expected_namespace) = match reference.kind {
            RequestKind::Import => (
                reference.namespace.clone(),
                reference.namespace.as_deref().map(|ns| ns.trim().to_string()),
            ),
            _ => (None, inherited.map(str::to_string)),
        };
        Self {
            parent: Some(parent.clone()),
            parent_line: reference.line,
            expected_namespace,
            namespace_attr,
            schema_location_attr: reference.schema_location.clone(),
            ..Self::new(reference.kind)
        }
    }

    /// Add a log message
    pub fn log(&mut self, text: impl Into<String>) {
        self.messages.push(Message {
            severity: Severity::Log,
            text: text.into(),
        });
    }

    /// Add a warning
    pub fn warn(&mut self, text: impl Into<String>) {
        self.messages.push(Message {
            severity: Severity::Warning,
            text: text.into(),
        });
    }

    /// Warnings only
    pub fn warnings(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.severity == Severity::Warning)
    }

    /// Whether any warning was raised
    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    /// One-line description of the request, for reports
    pub fn header(&self) -> String {
        let mut header = self.kind.to_string();
        if let Some(ns) = &self.namespace_attr {
            header.push_str(&format!(" namespace=\"{}\"", ns));
        }
        if let Some(loc) = &self.schema_location_attr {
            header.push_str(&format!(" schemaLocation=\"{}\"", loc));
        }
        if let Some(parent) = &self.parent {
            header.push_str(&format!(" at {}:{}", parent, self.parent_line));
        }
        header
    }
}
