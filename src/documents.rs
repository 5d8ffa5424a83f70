//! Schema document loading
//!
//! A schema document is parsed once into a [`SchemaDocument`] record: its
//! target namespace, version marker, namespace declarations and the
//! `import`/`include`/`redefine` references it contains. The parse does not
//! touch any assembly state; the engine applies the record afterwards.

use std::fs;

use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node, ParsingOptions};
use url::Url;

use crate::assembly::RequestKind;
use crate::error::{Error, ParseError, Result};
use crate::limits::Limits;
use crate::namespaces::{is_ledger_binding, NamespaceDeclaration};
use crate::XSD_NAMESPACE;

/// Naming and design rules version inside a `conformanceTargets` value
static NDR_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"naming-and-design-rules/([^/#\s]+)").expect("valid regex"));

/// Prefixed namespace declaration attribute inside a start tag
static PREFIX_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\sxmlns:([^\s=/>]+)\s*=").expect("valid regex"));

/// An `import`, `include` or `redefine` element found in a schema document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReference {
    /// Which directive this is
    pub kind: RequestKind,
    /// Line of the directive element
    pub line: u32,
    /// `namespace` attribute, as written
    pub namespace: Option<String>,
    /// `schemaLocation` attribute, as written
    pub schema_location: Option<String>,
}

/// What the assembly engine needs to know about one schema document
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    /// Location of the document
    pub url: Url,
    /// `targetNamespace` of the `xs:schema` element
    pub target_namespace: Option<String>,
    /// Version from the `conformanceTargets` attribute; empty if none
    pub version: String,
    /// Non-default prefix declarations, in document order
    pub declarations: Vec<NamespaceDeclaration>,
    /// Directives, in document order
    pub references: Vec<SchemaReference>,
}

impl SchemaDocument {
    /// Read and parse the document at a local file URL
    ///
    /// The file is read completely and closed before parsing starts.
    pub fn load(url: &Url, limits: &Limits) -> Result<Self> {
        let path = url
            .to_file_path()
            .map_err(|_| Error::Resource(format!("{} is not a local file", url)))?;
        let content = fs::read_to_string(&path)?;
        limits.check_xml_size(content.len())?;
        Self::parse(&content, url.clone(), limits)
    }

    /// Parse schema document text
    pub fn parse(text: &str, url: Url, limits: &Limits) -> Result<Self> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let doc = Document::parse_with_options(text, options).map_err(|e| {
            let pos = e.pos();
            Error::Parse(ParseError::new(e.to_string()).with_location(format!("{}:{}", pos.row, pos.col)))
        })?;

        let root = doc.root_element();
        if root.tag_name().name() != "schema" || root.tag_name().namespace() != Some(XSD_NAMESPACE) {
            return Err(Error::Parse(ParseError::new(format!(
                "not a schema document (root element is {})",
                root.tag_name().name()
            ))));
        }

        let mut schema = SchemaDocument {
            target_namespace: root.attribute("targetNamespace").map(|s| s.trim().to_string()),
            version: conformance_version(&root),
            declarations: Vec::new(),
            references: Vec::new(),
            url,
        };

        for node in root.descendants().filter(Node::is_element) {
            // ancestors() includes the node itself and the document node
            let depth = node.ancestors().count().saturating_sub(2);
            limits.check_xml_depth(depth)?;
            let line = doc.text_pos_at(node.range().start).row;

            schema.collect_declarations(text, &node, line, depth);

            if node.tag_name().namespace() != Some(XSD_NAMESPACE) {
                continue;
            }
            let kind = match node.tag_name().name() {
                "import" => RequestKind::Import,
                "include" => RequestKind::Include,
                "redefine" => RequestKind::Redefine,
                _ => continue,
            };
            schema.references.push(SchemaReference {
                kind,
                line,
                namespace: node.attribute("namespace").map(str::to_string),
                schema_location: node.attribute("schemaLocation").map(str::to_string),
            });
        }

        Ok(schema)
    }

    /// Record every prefix declared on `node` itself
    ///
    /// A declaration repeating a binding that is already in scope is still a
    /// declaration, so the start tag is read rather than the in-scope set.
    fn collect_declarations(&mut self, text: &str, node: &Node, line: u32, depth: usize) {
        let tag = start_tag(&text[node.range()]);
        for caps in PREFIX_DECLARATION.captures_iter(tag) {
            let prefix = &caps[1];
            let uri = match node.lookup_namespace_uri(Some(prefix)) {
                Some(uri) => uri,
                None => continue,
            };
            if !is_ledger_binding(Some(prefix), uri) {
                continue;
            }
            self.declarations.push(NamespaceDeclaration {
                prefix: prefix.to_string(),
                uri: uri.to_string(),
                file: self.url.clone(),
                line,
                depth,
            });
        }
    }
}

/// Start tag of an element's source text, without the closing `>`
fn start_tag(element: &str) -> &str {
    let mut quote = None;
    for (i, c) in element.char_indices() {
        match (quote, c) {
            (None, '"') | (None, '\'') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, '>') => return &element[..i],
            _ => {}
        }
    }
    element
}

/// Version marker of a schema document
///
/// Taken from a `conformanceTargets` attribute on the schema element: the
/// naming-and-design-rules version of the first target that names one.
fn conformance_version(root: &Node) -> String {
    root.attributes()
        .filter(|attr| {
            attr.name() == "conformanceTargets"
                && attr.namespace().map_or(false, |ns| ns.contains("conformanceTargets"))
        })
        .find_map(|attr| {
            NDR_VERSION
                .captures(attr.value())
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
        .unwrap_or_default()
}
