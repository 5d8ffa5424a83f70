//! Breadth-first assembly of a schema document set
//!
//! Requests are processed strictly in the order they were discovered: the
//! queue is a growing list read through a cursor. Loading a document only
//! appends new requests, so deep import chains never recurse.

use indexmap::{IndexMap, IndexSet};
use url::Url;

use super::request::{LoadRequest, RequestKind};
use super::resolution::resolve_request;
use crate::catalog::UriResolver;
use crate::documents::SchemaDocument;
use crate::limits::Limits;
use crate::locations::common_root;
use crate::namespaces::NamespaceLedger;

/// Completed assembly run
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    /// Every request, in queue order
    pub(crate) requests: Vec<LoadRequest>,
    /// Documents a load was attempted for, in attempt order
    pub(crate) attempted: IndexSet<Url>,
    /// Documents that parsed, in load order
    pub(crate) loaded: IndexSet<Url>,
    /// Namespace to the document that provides it
    pub(crate) namespace_files: IndexMap<String, Url>,
    /// Namespace to its version marker
    pub(crate) versions: IndexMap<String, String>,
    /// Prefix declarations across all loaded documents
    pub(crate) ledger: NamespaceLedger,
    /// Findings of the ledger reconciliation
    pub(crate) ledger_warnings: Vec<String>,
    /// Longest common directory of catalogs and attempted documents
    pub(crate) root: Option<String>,
}

/// Mutable traversal state shared by every load of one run
#[derive(Default)]
struct Traversal {
    attempted: IndexSet<Url>,
    loaded: IndexSet<Url>,
    namespace_files: IndexMap<String, Url>,
    versions: IndexMap<String, String>,
    ledger: NamespaceLedger,
}

impl Assembly {
    /// Drain the queue seeded with `initial` and compute the derived reports
    pub fn run(resolver: &dyn UriResolver, initial: Vec<LoadRequest>, limits: &Limits) -> Self {
        let mut requests = initial;
        let mut traversal = Traversal::default();

        let mut cursor = 0;
        while cursor < requests.len() {
            let mut discovered = Vec::new();
            let request = &mut requests[cursor];
            for target in resolve_request(request, resolver) {
                traversal.load(request, &target, limits, &mut discovered);
            }
            requests.extend(discovered);
            cursor += 1;
        }

        let root = common_root(resolver.catalog_files().iter().chain(traversal.attempted.iter()));
        let ledger_warnings = traversal.ledger.conflicts();

        Self {
            requests,
            attempted: traversal.attempted,
            loaded: traversal.loaded,
            namespace_files: traversal.namespace_files,
            versions: traversal.versions,
            ledger: traversal.ledger,
            ledger_warnings,
            root,
        }
    }

    /// Every request, in queue order
    pub fn requests(&self) -> &[LoadRequest] {
        &self.requests
    }

    /// Documents a load was attempted for
    pub fn attempted(&self) -> &IndexSet<Url> {
        &self.attempted
    }

    /// Documents that parsed, in load order
    pub fn loaded(&self) -> &IndexSet<Url> {
        &self.loaded
    }

    /// Document that provides a namespace
    pub fn namespace_file(&self, namespace: &str) -> Option<&Url> {
        self.namespace_files.get(namespace)
    }

    /// Namespaces of every loaded document, in first-load order
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespace_files.keys().map(String::as_str)
    }

    /// Version marker of a namespace; empty if none was found
    pub fn namespace_version(&self, namespace: &str) -> &str {
        self.versions.get(namespace).map_or("", String::as_str)
    }

    /// Namespace declaration ledger
    pub fn ledger(&self) -> &NamespaceLedger {
        &self.ledger
    }

    /// Root directory as a `file:` URL string ending in `/`; empty if no files
    pub fn root_url(&self) -> &str {
        self.root.as_deref().unwrap_or_default()
    }

    /// Whether resolution, loading or reconciliation raised any warning
    pub fn has_warnings(&self) -> bool {
        !self.ledger_warnings.is_empty() || self.requests.iter().any(LoadRequest::has_warnings)
    }
}

impl Traversal {
    /// Load one resolved document for `request`, at most once per run
    fn load(&mut self, request: &mut LoadRequest, url: &Url, limits: &Limits, discovered: &mut Vec<LoadRequest>) {
        if self.attempted.contains(url) {
            if self.loaded.contains(url) {
                request.log(format!("{} already parsed", url));
            } else {
                request.log(format!("{} already found non-parsable", url));
            }
            return;
        }
        self.attempted.insert(url.clone());

        let document = limits
            .check_documents(self.attempted.len())
            .and_then(|_| SchemaDocument::load(url, limits));
        match document {
            Ok(document) => {
                self.loaded.insert(url.clone());
                self.apply(request, document, discovered);
            }
            Err(e) if e.is_read_failure() => request.warn(format!("can't read {}: {}", url, e.reason())),
            Err(e) => request.warn(format!("can't parse {}: {}", url, e.reason())),
        }
    }

    /// Fold a parsed document into the traversal state
    fn apply(&mut self, request: &mut LoadRequest, document: SchemaDocument, discovered: &mut Vec<LoadRequest>) {
        request.log(format!("parsed {}", document.url));

        match &document.target_namespace {
            None => request.warn("no targetNamespace attribute"),
            Some(tns) => {
                if let Some(expected) = request.expected_namespace.as_deref() {
                    if expected != tns {
                        request.warn(format!(
                            "target namespace {} != expected namespace {}",
                            tns, expected
                        ));
                    }
                }
                self.record_namespace(request, tns, &document.url);
                if !document.version.is_empty() {
                    self.versions
                        .entry(tns.clone())
                        .or_insert_with(|| document.version.clone());
                }
            }
        }

        for declaration in document.declarations {
            self.ledger.record(declaration);
        }

        for reference in &document.references {
            if reference.kind != RequestKind::Import && request.namespace_resolved.is_some() {
                request.warn(format!(
                    "{} at line {} in {}, a document resolved through the catalog",
                    reference.kind, reference.line, document.url
                ));
            }
            discovered.push(LoadRequest::from_reference(
                &document.url,
                request.expected_namespace.as_deref(),
                reference,
            ));
        }
    }

    /// Track which document provides a namespace; a later file replaces an earlier one
    fn record_namespace(&mut self, request: &mut LoadRequest, tns: &str, url: &Url) {
        if let Some(previous) = self.namespace_files.get(tns) {
            if previous != url {
                request.warn(format!(
                    "namespace {} already loaded from a different file {}",
                    tns, previous
                ));
            }
        }
        self.namespace_files.insert(tns.to_string(), url.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::testing::{write_schema, MapResolver};
    use crate::locations::file_url;
    use tempfile::TempDir;

    fn warnings(assembly: &Assembly) -> Vec<String> {
        assembly
            .requests()
            .iter()
            .flat_map(|r| r.warnings().map(|m| m.text.clone()))
            .collect()
    }

    #[test]
    fn test_breadth_first_order() {
        let dir = TempDir::new().unwrap();
        let root = write_schema(
            dir.path(),
            "root.xsd",
            "urn:root",
            r#"<xs:import namespace="urn:a" schemaLocation="a.xsd"/>
  <xs:import namespace="urn:b" schemaLocation="b.xsd"/>"#,
        );
        write_schema(dir.path(), "a.xsd", "urn:a", r#"<xs:import namespace="urn:c" schemaLocation="c.xsd"/>"#);
        write_schema(dir.path(), "b.xsd", "urn:b", "");
        write_schema(dir.path(), "c.xsd", "urn:c", "");

        let assembly = Assembly::run(
            &MapResolver::new(),
            vec![LoadRequest::initial_file(&root)],
            &Limits::default(),
        );

        let order: Vec<&str> = assembly
            .loaded()
            .iter()
            .map(|u| u.path_segments().unwrap().last().unwrap())
            .collect();
        assert_eq!(order, vec!["root.xsd", "a.xsd", "b.xsd", "c.xsd"]);
        assert!(!assembly.has_warnings(), "{:?}", warnings(&assembly));
        assert_eq!(assembly.namespaces().count(), 4);
    }

    #[test]
    fn test_cycle_parsed_once() {
        let dir = TempDir::new().unwrap();
        let a = write_schema(dir.path(), "a.xsd", "urn:a", r#"<xs:import namespace="urn:b" schemaLocation="b.xsd"/>"#);
        write_schema(dir.path(), "b.xsd", "urn:b", r#"<xs:import namespace="urn:a" schemaLocation="a.xsd"/>"#);

        let assembly = Assembly::run(
            &MapResolver::new(),
            vec![LoadRequest::initial_file(&a)],
            &Limits::default(),
        );

        assert_eq!(assembly.requests().len(), 3);
        assert_eq!(assembly.loaded().len(), 2);
        let last = &assembly.requests()[2];
        assert!(last.messages.last().unwrap().text.ends_with("a.xsd already parsed"));
        assert!(!assembly.has_warnings(), "{:?}", warnings(&assembly));
    }

    #[test]
    fn test_unparsable_document_is_attempted_once() {
        let dir = TempDir::new().unwrap();
        let root = write_schema(
            dir.path(),
            "root.xsd",
            "urn:root",
            r#"<xs:import namespace="urn:bad" schemaLocation="bad.xsd"/>
  <xs:import namespace="urn:bad" schemaLocation="bad.xsd"/>"#,
        );
        std::fs::write(dir.path().join("bad.xsd"), "<xs:schema").unwrap();

        let assembly = Assembly::run(
            &MapResolver::new(),
            vec![LoadRequest::initial_file(&root)],
            &Limits::default(),
        );

        assert_eq!(assembly.attempted().len(), 2);
        assert_eq!(assembly.loaded().len(), 1);
        let warnings = warnings(&assembly);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("can't parse"));
        assert!(assembly.requests()[2]
            .messages
            .last()
            .unwrap()
            .text
            .ends_with("bad.xsd already found non-parsable"));
    }

    #[test]
    fn test_missing_document_is_read_failure() {
        let dir = TempDir::new().unwrap();
        let root = write_schema(
            dir.path(),
            "root.xsd",
            "urn:root",
            r#"<xs:include schemaLocation="missing.xsd"/>"#,
        );

        let assembly = Assembly::run(
            &MapResolver::new(),
            vec![LoadRequest::initial_file(&root)],
            &Limits::default(),
        );
        let warnings = warnings(&assembly);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("can't read"));
        assert!(warnings[0].contains("missing.xsd"));
    }

    #[test]
    fn test_target_namespace_findings() {
        let dir = TempDir::new().unwrap();
        let root = write_schema(
            dir.path(),
            "root.xsd",
            "urn:root",
            r#"<xs:import namespace="urn:y" schemaLocation="wrong.xsd"/>
  <xs:import namespace="urn:z" schemaLocation="none.xsd"/>"#,
        );
        write_schema(dir.path(), "wrong.xsd", "urn:other", "");
        std::fs::write(
            dir.path().join("none.xsd"),
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#,
        )
        .unwrap();

        let assembly = Assembly::run(
            &MapResolver::new(),
            vec![LoadRequest::initial_file(&root)],
            &Limits::default(),
        );
        assert_eq!(
            warnings(&assembly),
            vec![
                "target namespace urn:other != expected namespace urn:y",
                "no targetNamespace attribute",
            ]
        );
    }

    #[test]
    fn test_include_under_catalog_namespace_warns_and_loads() {
        let dir = TempDir::new().unwrap();
        let x = write_schema(dir.path(), "x.xsd", "urn:x", r#"<xs:include schemaLocation="x-part.xsd"/>"#);
        write_schema(dir.path(), "x-part.xsd", "urn:x", "");
        let resolver = MapResolver::new().map("urn:x", x.as_str());

        let assembly = Assembly::run(
            &resolver,
            vec![LoadRequest::initial_namespace("urn:x")],
            &Limits::default(),
        );

        let warnings = warnings(&assembly);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].starts_with("include at line"));
        assert!(warnings[1].starts_with("namespace urn:x already loaded from a different file"));
        assert!(warnings[1].ends_with(x.as_str()));
        assert_eq!(assembly.loaded().len(), 2);
        // the included fragment carries the expectation of the catalog load
        assert_eq!(assembly.requests()[1].expected_namespace.as_deref(), Some("urn:x"));
    }

    #[test]
    fn test_included_document_with_same_namespace_replaces_mapping() {
        let dir = TempDir::new().unwrap();
        let a = write_schema(dir.path(), "a.xsd", "urn:shared", r#"<xs:include schemaLocation="b.xsd"/>"#);
        let b = write_schema(dir.path(), "b.xsd", "urn:shared", "");

        let assembly = Assembly::run(
            &MapResolver::new(),
            vec![LoadRequest::initial_file(&a)],
            &Limits::default(),
        );

        assert_eq!(assembly.loaded().len(), 2);
        assert!(assembly.has_warnings());
        assert_eq!(
            warnings(&assembly),
            vec![format!("namespace urn:shared already loaded from a different file {}", a)]
        );
        assert_eq!(assembly.requests()[1].kind, RequestKind::Include);
        assert!(assembly.requests()[1].has_warnings());
        assert_eq!(assembly.namespace_file("urn:shared"), Some(&b));
    }

    #[test]
    fn test_redefined_document_with_same_namespace_warns() {
        let dir = TempDir::new().unwrap();
        let a = write_schema(dir.path(), "a.xsd", "urn:shared", r#"<xs:redefine schemaLocation="base.xsd"/>"#);
        let base = write_schema(dir.path(), "base.xsd", "urn:shared", "");

        let assembly = Assembly::run(
            &MapResolver::new(),
            vec![LoadRequest::initial_file(&a)],
            &Limits::default(),
        );

        assert_eq!(warnings(&assembly).len(), 1);
        assert_eq!(assembly.namespace_file("urn:shared"), Some(&base));
    }

    #[test]
    fn test_version_first_non_empty_wins() {
        let dir = TempDir::new().unwrap();
        let ct = r#"xmlns:ct="http://release.niem.gov/niem/conformanceTargets/3.0/" ct:conformanceTargets="http://reference.niem.gov/niem/specification/naming-and-design-rules/{v}/#ReferenceSchemaDocument""#;
        let main = dir.path().join("main.xsd");
        std::fs::write(
            &main,
            format!(
                r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:v">
  <xs:include schemaLocation="p1.xsd"/>
  <xs:include schemaLocation="p2.xsd"/>
</xs:schema>"#
            ),
        )
        .unwrap();
        for (name, v) in [("p1.xsd", "4.0"), ("p2.xsd", "5.0")] {
            std::fs::write(
                dir.path().join(name),
                format!(
                    r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:v" {}/>"#,
                    ct.replace("{v}", v)
                ),
            )
            .unwrap();
        }

        let assembly = Assembly::run(
            &MapResolver::new(),
            vec![LoadRequest::initial_file(&file_url(&main).unwrap())],
            &Limits::default(),
        );
        assert_eq!(assembly.namespace_version("urn:v"), "4.0");
        assert_eq!(assembly.namespace_version("urn:unknown"), "");
    }

    #[test]
    fn test_document_limit() {
        let dir = TempDir::new().unwrap();
        let root = write_schema(
            dir.path(),
            "root.xsd",
            "urn:root",
            r#"<xs:import namespace="urn:a" schemaLocation="a.xsd"/>"#,
        );
        write_schema(dir.path(), "a.xsd", "urn:a", "");

        let assembly = Assembly::run(
            &MapResolver::new(),
            vec![LoadRequest::initial_file(&root)],
            &Limits::default().with_max_documents(1),
        );
        assert_eq!(assembly.loaded().len(), 1);
        assert!(warnings(&assembly)[0].contains("document count 2 exceeds maximum 1"));
    }

    #[test]
    fn test_root_includes_catalog_files() {
        let dir = TempDir::new().unwrap();
        let schema = write_schema(&dir.path().join("xsd"), "a.xsd", "urn:a", "");
        let catalog = file_url(&dir.path().join("catalog.xml")).unwrap();
        let resolver = MapResolver::new().with_catalog(catalog.as_str());

        let assembly = Assembly::run(
            &resolver,
            vec![LoadRequest::initial_file(&schema)],
            &Limits::default(),
        );
        let root = assembly.root_url();
        assert!(catalog.as_str().starts_with(root));
        assert!(schema.as_str().starts_with(root));
        assert!(!root.ends_with("xsd/"));
    }
}
