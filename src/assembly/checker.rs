//! Checker configuration and lazily computed results
//!
//! A [`SchemaAssemblyChecker`] collects catalog files and initial inputs.
//! Results are computed on first access and kept until the inputs change.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use url::Url;

use super::engine::Assembly;
use super::report::AssemblyReport;
use super::request::LoadRequest;
use crate::catalog::{CatalogResolver, UriResolver};
use crate::limits::Limits;
use crate::locations::{file_url, is_local_file, Location};
use crate::namespaces::NamespaceDeclaration;

/// Fatal initialization error: nothing to assemble
pub const NO_READABLE_DOCUMENTS: &str = "no readable schema documents provided";

/// How far a checker has advanced since its inputs last changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Inputs collected, nothing computed
    Uninitialized,
    /// Catalogs loaded and initial inputs validated
    Initialized,
    /// Queue drained and reports computed
    Assembled,
}

/// Catalogs plus the initial inputs that survived validation
#[derive(Debug)]
struct Initialization {
    resolver: CatalogResolver,
    errors: Vec<String>,
    requests: Vec<LoadRequest>,
    initial_uris: Vec<Url>,
}

/// Assembly checker for a set of schema documents and namespaces
///
/// # Example
///
/// ```no_run
/// use xsd_assembly::SchemaAssemblyChecker;
///
/// let mut checker = SchemaAssemblyChecker::new();
/// checker.add_catalog_file("xml-catalog.xml");
/// checker.add_schema_file("extension/exchange.xsd");
///
/// for line in checker.assembly_warning_messages() {
///     println!("{}", line);
/// }
/// ```
#[derive(Debug, Default)]
pub struct SchemaAssemblyChecker {
    catalog_files: Vec<PathBuf>,
    inputs: Vec<Location>,
    limits: Limits,
    initialization: Option<Initialization>,
    assembly: Option<Assembly>,
}

impl SchemaAssemblyChecker {
    /// Create a checker without inputs
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given resource limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self.reset();
        self
    }

    /// Add a catalog file
    pub fn add_catalog_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.catalog_files.push(path.as_ref().to_path_buf());
        self.reset();
        self
    }

    /// Add an initial schema document
    pub fn add_schema_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.inputs.push(Location::Path(path.as_ref().to_path_buf()));
        self.reset();
        self
    }

    /// Add an initial namespace, resolved through the catalogs
    pub fn add_namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.inputs.push(Location::Namespace(namespace.into()));
        self.reset();
        self
    }

    /// Add an input that is either a schema document path or a namespace URI
    pub fn add_input(&mut self, input: &str) -> &mut Self {
        self.inputs.push(Location::classify(input));
        self.reset();
        self
    }

    /// Current stage
    pub fn stage(&self) -> Stage {
        match (&self.initialization, &self.assembly) {
            (_, Some(_)) => Stage::Assembled,
            (Some(_), None) => Stage::Initialized,
            (None, None) => Stage::Uninitialized,
        }
    }

    fn reset(&mut self) {
        self.initialization = None;
        self.assembly = None;
    }

    fn initialized(&mut self) -> &Initialization {
        self.initialization
            .get_or_insert_with(|| initialize(&self.catalog_files, &self.inputs, &self.limits))
    }

    /// Both stages, computing whatever is missing
    fn stages(&mut self) -> (&Initialization, &Assembly) {
        let init = self
            .initialization
            .get_or_insert_with(|| initialize(&self.catalog_files, &self.inputs, &self.limits));
        let limits = &self.limits;
        let assembly = self
            .assembly
            .get_or_insert_with(|| Assembly::run(&init.resolver, init.requests.clone(), limits));
        (&*init, &*assembly)
    }

    fn assembled(&mut self) -> &Assembly {
        self.stages().1
    }

    /// Problems with the catalogs and initial inputs
    pub fn initialization_errors(&mut self) -> Vec<String> {
        self.initialized().errors.clone()
    }

    /// Findings about the catalog documents themselves
    pub fn catalog_validation_results(&mut self) -> Vec<String> {
        self.initialized().resolver.validation_results().to_vec()
    }

    /// Initial documents, deduplicated; empty only in the fatal case
    pub fn all_initial_schema_uris(&mut self) -> Vec<Url> {
        self.initialized().initial_uris.clone()
    }

    /// Longest common directory of every catalog and attempted document
    pub fn schema_root_directory(&mut self) -> String {
        self.assembled().root_directory()
    }

    /// Documents that parsed, in load order
    pub fn assembled_schema_documents(&mut self) -> Vec<Url> {
        self.assembled().loaded().iter().cloned().collect()
    }

    /// Full assembly log
    pub fn assembly_log_messages(&mut self) -> Vec<String> {
        self.assembled().log_messages()
    }

    /// Warning lines only
    pub fn assembly_warning_messages(&mut self) -> Vec<String> {
        self.assembled().warning_messages()
    }

    /// Whether any assembly warning was raised
    pub fn assembly_warnings(&mut self) -> bool {
        self.assembled().has_warnings()
    }

    /// Target namespaces of all assembled documents
    pub fn namespaces(&mut self) -> BTreeSet<String> {
        self.assembled().namespaces().map(str::to_string).collect()
    }

    /// Version marker of a namespace; empty if none
    pub fn namespace_version(&mut self, namespace: &str) -> String {
        self.assembled().namespace_version(namespace).to_string()
    }

    /// Document that provides a namespace
    pub fn namespace_file(&mut self, namespace: &str) -> Option<Url> {
        self.assembled().namespace_file(namespace).cloned()
    }

    /// Every load request, in queue order
    pub fn load_requests(&mut self) -> Vec<LoadRequest> {
        self.assembled().requests().to_vec()
    }

    /// Every namespace prefix declaration found, in encounter order
    pub fn namespace_declarations(&mut self) -> Vec<NamespaceDeclaration> {
        self.assembled().ledger().declarations().to_vec()
    }

    /// Serializable summary of the whole check
    pub fn report(&mut self) -> AssemblyReport {
        let (init, assembly) = self.stages();
        AssemblyReport::new(
            &init.errors,
            init.resolver.validation_results(),
            &init.initial_uris,
            assembly,
        )
    }
}

/// Load the catalogs and turn every usable input into an initial request
fn initialize(catalog_files: &[PathBuf], inputs: &[Location], limits: &Limits) -> Initialization {
    let resolver = CatalogResolver::from_files(catalog_files, limits);
    let mut errors = resolver.errors().to_vec();
    let mut requests = Vec::new();
    let mut initial_uris = IndexSet::new();
    let mut namespaces = IndexSet::new();

    for input in inputs {
        match input {
            Location::Path(path) => match readable_schema(path) {
                Ok(url) => {
                    if initial_uris.insert(url.clone()) {
                        requests.push(LoadRequest::initial_file(&url));
                    }
                }
                Err(reason) => errors.push(format!(
                    "can't read schema document {}: {}",
                    path.display(),
                    reason
                )),
            },
            Location::Namespace(namespace) => match resolved_namespace(&resolver, namespace) {
                Ok(url) => {
                    if namespaces.insert(namespace.trim().to_string()) {
                        initial_uris.insert(url);
                        requests.push(LoadRequest::initial_namespace(namespace));
                    }
                }
                Err(error) => errors.push(error),
            },
        }
    }

    if requests.is_empty() {
        errors.push(NO_READABLE_DOCUMENTS.to_string());
    }

    Initialization {
        resolver,
        errors,
        requests,
        initial_uris: initial_uris.into_iter().collect(),
    }
}

/// URL of an initial schema file that exists and can be opened
fn readable_schema(path: &Path) -> Result<Url, String> {
    let metadata = std::fs::metadata(path).map_err(|e| e.to_string())?;
    if !metadata.is_file() {
        return Err("not a regular file".to_string());
    }
    File::open(path).map_err(|e| e.to_string())?;
    file_url(path).map_err(|e| e.reason())
}

/// Local file an initial namespace resolves to through the catalogs
fn resolved_namespace(resolver: &CatalogResolver, namespace: &str) -> Result<Url, String> {
    match resolver.resolve(namespace) {
        Ok(Some(url)) if is_local_file(&url) => Ok(url),
        Ok(Some(url)) => Err(format!("namespace {} resolves to non-local resource {}", namespace, url)),
        Ok(None) => Err(format!("namespace {} not resolved by catalog", namespace)),
        Err(e) => Err(format!("malformed namespace URI {}: {}", namespace, e.reason())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::testing::write_schema;
    use tempfile::TempDir;

    fn write_catalog(dir: &Path, entries: &[(&str, &str)]) -> PathBuf {
        let body: String = entries
            .iter()
            .map(|(name, uri)| format!("  <uri name=\"{}\" uri=\"{}\"/>\n", name, uri))
            .collect();
        let path = dir.join("catalog.xml");
        std::fs::write(
            &path,
            format!(
                "<catalog xmlns=\"urn:oasis:names:tc:entity:xmlns:xml:catalog\">\n{}</catalog>\n",
                body
            ),
        )
        .unwrap();
        path
    }

    #[test]
    fn test_stage_transitions() {
        let dir = TempDir::new().unwrap();
        write_schema(dir.path(), "a.xsd", "urn:a", "");

        let mut checker = SchemaAssemblyChecker::new();
        checker.add_schema_file(dir.path().join("a.xsd"));
        assert_eq!(checker.stage(), Stage::Uninitialized);

        assert!(checker.initialization_errors().is_empty());
        assert_eq!(checker.stage(), Stage::Initialized);

        assert!(!checker.assembly_warnings());
        assert_eq!(checker.stage(), Stage::Assembled);

        checker.add_namespace("urn:b");
        assert_eq!(checker.stage(), Stage::Uninitialized);
    }

    #[test]
    fn test_fatal_initialization() {
        let dir = TempDir::new().unwrap();
        let mut checker = SchemaAssemblyChecker::new();
        checker
            .add_schema_file(dir.path().join("missing.xsd"))
            .add_namespace("urn:nowhere");

        let errors = checker.initialization_errors();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("can't read schema document"));
        assert_eq!(errors[1], "namespace urn:nowhere not resolved by catalog");
        assert_eq!(errors[2], NO_READABLE_DOCUMENTS);
        assert!(checker.all_initial_schema_uris().is_empty());
        assert!(checker.assembled_schema_documents().is_empty());
    }

    #[test]
    fn test_partial_inputs_are_not_fatal() {
        let dir = TempDir::new().unwrap();
        write_schema(dir.path(), "a.xsd", "urn:a", "");

        let mut checker = SchemaAssemblyChecker::new();
        checker
            .add_schema_file(dir.path().join("a.xsd"))
            .add_schema_file(dir.path().join("missing.xsd"));

        let errors = checker.initialization_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(checker.all_initial_schema_uris().len(), 1);
        assert_eq!(checker.assembled_schema_documents().len(), 1);
    }

    #[test]
    fn test_directory_is_not_a_schema_file() {
        let dir = TempDir::new().unwrap();
        let mut checker = SchemaAssemblyChecker::new();
        checker.add_schema_file(dir.path());

        let errors = checker.initialization_errors();
        assert!(errors[0].ends_with("not a regular file"));
    }

    #[test]
    fn test_initial_uris_deduplicated() {
        let dir = TempDir::new().unwrap();
        let a = write_schema(dir.path(), "a.xsd", "urn:a", "");
        let catalog = write_catalog(dir.path(), &[("urn:a", "a.xsd")]);

        let mut checker = SchemaAssemblyChecker::new();
        checker
            .add_catalog_file(&catalog)
            .add_schema_file(dir.path().join("a.xsd"))
            .add_schema_file(dir.path().join(".").join("a.xsd"))
            .add_namespace("urn:a");

        assert_eq!(checker.all_initial_schema_uris(), vec![a.clone()]);
        assert_eq!(checker.assembled_schema_documents(), vec![a]);
        assert!(!checker.assembly_warnings(), "{:?}", checker.assembly_warning_messages());
        // second initial request finds the document already parsed
        assert!(checker
            .assembly_log_messages()
            .iter()
            .any(|line| line.ends_with("a.xsd already parsed")));
    }

    #[test]
    fn test_non_local_namespace_input() {
        let dir = TempDir::new().unwrap();
        write_schema(dir.path(), "a.xsd", "urn:a", "");
        let catalog = write_catalog(dir.path(), &[("urn:remote", "http://example.com/r.xsd")]);

        let mut checker = SchemaAssemblyChecker::new();
        checker
            .add_catalog_file(&catalog)
            .add_schema_file(dir.path().join("a.xsd"))
            .add_input("urn:remote");

        assert_eq!(
            checker.initialization_errors(),
            vec!["namespace urn:remote resolves to non-local resource http://example.com/r.xsd".to_string()]
        );
    }

    #[test]
    fn test_namespace_input_with_catalog() {
        let dir = TempDir::new().unwrap();
        let x = write_schema(
            dir.path(),
            "x.xsd",
            "urn:x",
            r#"<xs:import namespace="urn:y" schemaLocation="y.xsd"/>"#,
        );
        write_schema(dir.path(), "y.xsd", "urn:y", "");
        let catalog = write_catalog(dir.path(), &[("urn:x", "x.xsd")]);

        let mut checker = SchemaAssemblyChecker::new();
        checker.add_catalog_file(&catalog).add_input("urn:x");

        assert!(checker.initialization_errors().is_empty());
        assert_eq!(checker.all_initial_schema_uris(), vec![x.clone()]);
        assert_eq!(
            checker.namespaces().into_iter().collect::<Vec<_>>(),
            vec!["urn:x".to_string(), "urn:y".to_string()]
        );
        assert_eq!(checker.namespace_file("urn:x"), Some(x));
        assert_eq!(checker.load_requests().len(), 2);
        assert!(checker
            .assembly_warning_messages()
            .contains(&"  no catalog entry for namespace urn:y".to_string()));
        assert_eq!(checker.report().initial_schema_uris, vec!["x.xsd".to_string()]);
    }

    #[test]
    fn test_unreadable_catalog_is_initialization_error() {
        let dir = TempDir::new().unwrap();
        write_schema(dir.path(), "a.xsd", "urn:a", "");

        let mut checker = SchemaAssemblyChecker::new();
        checker
            .add_catalog_file(dir.path().join("missing-catalog.xml"))
            .add_schema_file(dir.path().join("a.xsd"));

        let errors = checker.initialization_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("can't load catalog file"));
        assert_eq!(checker.assembled_schema_documents().len(), 1);
    }
}
