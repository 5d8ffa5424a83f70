//! XML namespace declaration ledger
//!
//! Every prefix declaration seen in any loaded schema document is recorded
//! in encounter order. Once assembly is complete the ledger is reconciled:
//! a prefix bound to more than one namespace, or a namespace bound to more
//! than one prefix, makes the assembled schema harder to read and to
//! translate consistently, so both are reported.

use indexmap::IndexMap;
use serde::Serialize;
use url::Url;

use crate::{XML_NAMESPACE, XSD_NAMESPACE};

/// Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// One `xmlns:prefix="uri"` declaration in a schema document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceDeclaration {
    /// Declared prefix
    pub prefix: Prefix,
    /// Namespace bound to the prefix
    pub uri: NamespaceUri,
    /// Document containing the declaration
    pub file: Url,
    /// Line of the declaring element
    pub line: u32,
    /// Nesting depth of the declaring element (document element is 0)
    pub depth: usize,
}

impl NamespaceDeclaration {
    fn location(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

/// Whether a declaration belongs in the ledger
///
/// Default namespace declarations, the XML Schema namespace and the
/// built-in `xml` binding are not interesting for reconciliation.
pub fn is_ledger_binding(prefix: Option<&str>, uri: &str) -> bool {
    match prefix {
        None | Some("") | Some("xml") => false,
        Some(_) => uri != XSD_NAMESPACE && uri != XML_NAMESPACE,
    }
}

/// Ordered record of namespace declarations across all loaded documents
#[derive(Debug, Clone, Default)]
pub struct NamespaceLedger {
    declarations: Vec<NamespaceDeclaration>,
}

impl NamespaceLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a declaration
    pub fn record(&mut self, declaration: NamespaceDeclaration) {
        self.declarations.push(declaration);
    }

    /// All declarations in encounter order
    pub fn declarations(&self) -> &[NamespaceDeclaration] {
        &self.declarations
    }

    /// Number of recorded declarations
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Warnings for conflicting bindings
    ///
    /// Prefix conflicts come first, then namespace conflicts, each in the
    /// order the prefix or namespace was first declared. Every binding is
    /// listed with the first place it was declared.
    pub fn conflicts(&self) -> Vec<String> {
        let mut by_prefix: IndexMap<&str, IndexMap<&str, &NamespaceDeclaration>> = IndexMap::new();
        let mut by_uri: IndexMap<&str, IndexMap<&str, &NamespaceDeclaration>> = IndexMap::new();

        for decl in &self.declarations {
            by_prefix
                .entry(decl.prefix.as_str())
                .or_default()
                .entry(decl.uri.as_str())
                .or_insert(decl);
            by_uri
                .entry(decl.uri.as_str())
                .or_default()
                .entry(decl.prefix.as_str())
                .or_insert(decl);
        }

        let mut warnings = Vec::new();
        for (prefix, uris) in &by_prefix {
            if uris.len() > 1 {
                let bindings: Vec<String> = uris
                    .iter()
                    .map(|(uri, decl)| format!("{} ({})", uri, decl.location()))
                    .collect();
                warnings.push(format!(
                    "prefix {} bound to multiple namespaces: {}",
                    prefix,
                    bindings.join(", ")
                ));
            }
        }
        for (uri, prefixes) in &by_uri {
            if prefixes.len() > 1 {
                let bindings: Vec<String> = prefixes
                    .iter()
                    .map(|(prefix, decl)| format!("{} ({})", prefix, decl.location()))
                    .collect();
                warnings.push(format!(
                    "namespace {} bound to multiple prefixes: {}",
                    uri,
                    bindings.join(", ")
                ));
            }
        }
        warnings
    }
}
