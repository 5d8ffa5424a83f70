//! Log, warning and summary views over a completed assembly
//!
//! File locations inside messages are shown relative to the schema root
//! directory. Each request contributes a header line followed by its
//! messages, indented.

use serde::Serialize;
use url::Url;

use super::engine::Assembly;
use super::request::{LoadRequest, Severity};
use crate::error::{Error, Result};
use crate::locations::{display_directory, relative_to};

const INDENT: &str = "  ";

impl Assembly {
    /// Every message of every request, in queue order
    pub fn log_messages(&self) -> Vec<String> {
        let root = self.root_url();
        let mut lines = Vec::new();
        for request in &self.requests {
            lines.push(relative_to(&request.header(), root));
            for message in &request.messages {
                let marker = match message.severity {
                    Severity::Log => "",
                    Severity::Warning => "WARNING: ",
                };
                lines.push(format!("{}{}{}", INDENT, marker, relative_to(&message.text, root)));
            }
        }
        lines
    }

    /// Warnings only: requests without warnings contribute nothing
    ///
    /// Namespace declaration conflicts follow the per-request warnings.
    pub fn warning_messages(&self) -> Vec<String> {
        let root = self.root_url();
        let mut lines = Vec::new();
        for request in self.requests.iter().filter(|r| r.has_warnings()) {
            lines.push(relative_to(&request.header(), root));
            for message in request.warnings() {
                lines.push(format!("{}{}", INDENT, relative_to(&message.text, root)));
            }
        }
        lines.extend(self.ledger_warnings.iter().map(|w| relative_to(w, root)));
        lines
    }

    /// Schema root directory in file system form; empty if no files
    pub fn root_directory(&self) -> String {
        match &self.root {
            Some(root) => display_directory(root),
            None => String::new(),
        }
    }

    /// Display form of a URL, relative to the root directory
    pub fn display(&self, url: &Url) -> String {
        relative_to(url.as_str(), self.root_url())
    }
}

/// A namespace of the assembled schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceSummary {
    /// Namespace URI
    pub namespace: String,
    /// Document providing it, relative to the root directory
    pub file: String,
    /// Version marker; empty if none
    pub version: String,
}

/// Serializable summary of a whole check
#[derive(Debug, Clone, Serialize)]
pub struct AssemblyReport {
    /// Longest common directory of all files involved
    pub schema_root_directory: String,
    /// Problems with the inputs themselves
    pub initialization_errors: Vec<String>,
    /// Findings about the catalog documents
    pub catalog_validation_results: Vec<String>,
    /// Initial documents handed to the assembly
    pub initial_schema_uris: Vec<String>,
    /// Documents that parsed, sorted
    pub assembled_schema_documents: Vec<String>,
    /// Namespaces, sorted
    pub namespaces: Vec<NamespaceSummary>,
    /// Whether any assembly warning was raised
    pub assembly_warnings: bool,
    /// Warning view
    pub warnings: Vec<String>,
    /// Full log view
    pub log: Vec<String>,
    /// Raw requests, in queue order
    pub requests: Vec<LoadRequest>,
}

impl AssemblyReport {
    /// Summarize an assembly together with its initialization results
    pub fn new(
        initialization_errors: &[String],
        catalog_validation_results: &[String],
        initial_schema_uris: &[Url],
        assembly: &Assembly,
    ) -> Self {
        let mut assembled: Vec<String> = assembly.loaded().iter().map(|u| assembly.display(u)).collect();
        assembled.sort();

        let mut namespaces: Vec<NamespaceSummary> = assembly
            .namespaces()
            .map(|ns| NamespaceSummary {
                namespace: ns.to_string(),
                file: assembly
                    .namespace_file(ns)
                    .map(|u| assembly.display(u))
                    .unwrap_or_default(),
                version: assembly.namespace_version(ns).to_string(),
            })
            .collect();
        namespaces.sort_by(|a, b| a.namespace.cmp(&b.namespace));

        Self {
            schema_root_directory: assembly.root_directory(),
            initialization_errors: initialization_errors.to_vec(),
            catalog_validation_results: catalog_validation_results
                .iter()
                .map(|r| relative_to(r, assembly.root_url()))
                .collect(),
            initial_schema_uris: initial_schema_uris.iter().map(|u| assembly.display(u)).collect(),
            assembled_schema_documents: assembled,
            namespaces,
            assembly_warnings: assembly.has_warnings(),
            warnings: assembly.warning_messages(),
            log: assembly.log_messages(),
            requests: assembly.requests().to_vec(),
        }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Other(format!("cannot serialize report: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::testing::{write_schema, MapResolver};
    use crate::limits::Limits;
    use tempfile::TempDir;

    fn assemble(dir: &TempDir) -> Assembly {
        let root = write_schema(
            dir.path(),
            "root.xsd",
            "urn:root",
            r#"<xs:import namespace="urn:a" schemaLocation="a.xsd"/>
  <xs:include/>"#,
        );
        write_schema(dir.path(), "a.xsd", "urn:a", "");
        Assembly::run(
            &MapResolver::new(),
            vec![LoadRequest::initial_file(&root)],
            &Limits::default(),
        )
    }

    #[test]
    fn test_log_messages_are_relative() {
        let dir = TempDir::new().unwrap();
        let assembly = assemble(&dir);
        let log = assembly.log_messages();

        assert_eq!(log[0], "initial load schemaLocation=\"root.xsd\"");
        assert!(log.contains(&"  parsed root.xsd".to_string()));
        assert!(log.contains(&"import namespace=\"urn:a\" schemaLocation=\"a.xsd\" at root.xsd:3".to_string()));
        assert!(log.iter().all(|line| !line.contains("file://")));
    }

    #[test]
    fn test_warning_messages_skip_clean_requests() {
        let dir = TempDir::new().unwrap();
        let assembly = assemble(&dir);

        assert_eq!(
            assembly.warning_messages(),
            vec![
                "include at root.xsd:4".to_string(),
                "  no schemaLocation attribute in include element".to_string(),
                "  can't determine a schema document to parse".to_string(),
            ]
        );
        assert!(assembly.has_warnings());
    }

    #[test]
    fn test_report_summary() {
        let dir = TempDir::new().unwrap();
        let assembly = assemble(&dir);
        let report = AssemblyReport::new(&[], &[], &[], &assembly);

        assert_eq!(report.assembled_schema_documents, vec!["a.xsd", "root.xsd"]);
        assert_eq!(report.namespaces.len(), 2);
        assert_eq!(report.namespaces[0].namespace, "urn:a");
        assert_eq!(report.namespaces[0].file, "a.xsd");
        assert!(report.assembly_warnings);

        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["requests"][0]["kind"], "initial-load");
        assert_eq!(value["requests"][2]["messages"][0]["severity"], "warning");
    }
}
