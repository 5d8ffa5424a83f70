//! XML Catalog support for namespace and schema location resolution
//!
//! The assembly engine only needs something that maps a requested URI to a
//! resolved URI; that capability is the [`UriResolver`] trait. The default
//! implementation, [`CatalogResolver`], reads OASIS XML Catalog files:
//! https://www.oasis-open.org/committees/entity/spec-2001-08-06.html
//!
//! # Supported Elements
//!
//! - `<catalog>` - Root element
//! - `<group>` - Grouping element (inherits base from parent)
//! - `<uri>`, `<system>`, `<public>` - Exact mappings
//! - `<rewriteURI>`, `<rewriteSystem>` - Prefix rewriting
//! - `<uriSuffix>`, `<systemSuffix>` - Suffix mappings
//! - `<nextCatalog>` - Includes another catalog file
//!
//! `xml:base` is honored on every element.
//!
//! # Example
//!
//! ```xml
//! <catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog">
//!   <uri name="http://release.niem.gov/niem/niem-core/5.0/"
//!        uri="niem/niem-core.xsd"/>
//!   <nextCatalog catalog="external/catalog.xml"/>
//! </catalog>
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use url::Url;

use crate::error::{Error, ParseError, Result};
use crate::limits::Limits;
use crate::locations::{canonical, file_url, is_local_file};

/// Resolves namespaces and schema locations to documents
///
/// Implementations must not panic on malformed input; a malformed URI is
/// reported as an `Err`, a URI without a mapping as `Ok(None)`.
pub trait UriResolver {
    /// Resolve a namespace URI or schema location
    fn resolve(&self, uri: &str) -> Result<Option<Url>>;

    /// Every catalog file consulted, including nested ones
    fn catalog_files(&self) -> &[Url];

    /// Human-readable findings about the catalog documents themselves
    fn validation_results(&self) -> &[String];

    /// Whether any catalog file is configured
    fn has_catalogs(&self) -> bool {
        !self.catalog_files().is_empty()
    }
}

/// One parsed catalog document and the catalogs it delegates to
#[derive(Debug, Clone)]
pub struct XmlCatalog {
    /// Location of this catalog file
    url: Url,
    /// URI name to URI mappings (name -> uri)
    uri_mappings: IndexMap<String, Url>,
    /// System ID to URI mappings (systemId -> uri)
    system_mappings: IndexMap<String, Url>,
    /// Public ID to URI mappings (publicId -> uri)
    public_mappings: IndexMap<String, Url>,
    /// Prefix rewrites (startString -> rewritePrefix)
    rewrites: Vec<(String, Url)>,
    /// Suffix mappings (suffix -> uri)
    suffixes: Vec<(String, Url)>,
    /// Catalogs referenced through `<nextCatalog>`, in document order
    next_catalogs: Vec<XmlCatalog>,
}

impl XmlCatalog {
    fn empty(url: Url) -> Self {
        Self {
            url,
            uri_mappings: IndexMap::new(),
            system_mappings: IndexMap::new(),
            public_mappings: IndexMap::new(),
            rewrites: Vec::new(),
            suffixes: Vec::new(),
            next_catalogs: Vec::new(),
        }
    }

    /// Load a catalog from a file, following `<nextCatalog>` references
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let url = file_url(path.as_ref())?;
        CatalogLoader::new(&Limits::default()).load(&url, 0)
    }

    /// Parse catalog XML content; relative entries resolve against `base`
    ///
    /// `<nextCatalog>` references are recorded but not followed.
    pub fn from_string(xml: &str, base: Url) -> Result<Self> {
        let mut catalog = Self::empty(base);
        catalog.parse_catalog(xml)?;
        Ok(catalog)
    }

    /// Location of this catalog file
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Resolve a URI using this catalog and its next catalogs
    ///
    /// Tries exact `uri`, `system` and `public` mappings, then the longest
    /// matching rewrite prefix, then the longest matching suffix, then the
    /// next catalogs in document order.
    pub fn resolve(&self, uri: &str) -> Option<Url> {
        if let Some(target) = self
            .uri_mappings
            .get(uri)
            .or_else(|| self.system_mappings.get(uri))
            .or_else(|| self.public_mappings.get(uri))
        {
            return Some(target.clone());
        }

        let rewrite = self
            .rewrites
            .iter()
            .filter(|(prefix, _)| uri.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len());
        if let Some((prefix, replacement)) = rewrite {
            let rewritten = format!("{}{}", replacement.as_str(), &uri[prefix.len()..]);
            if let Ok(url) = Url::parse(&rewritten) {
                return Some(url);
            }
        }

        let suffix = self
            .suffixes
            .iter()
            .filter(|(suffix, _)| uri.ends_with(suffix.as_str()))
            .max_by_key(|(suffix, _)| suffix.len());
        if let Some((_, target)) = suffix {
            return Some(target.clone());
        }

        self.next_catalogs.iter().find_map(|next| next.resolve(uri))
    }

    /// Check if this catalog is empty (has no mappings, nested ones included)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the number of mappings, nested catalogs included
    pub fn len(&self) -> usize {
        self.uri_mappings.len()
            + self.system_mappings.len()
            + self.public_mappings.len()
            + self.rewrites.len()
            + self.suffixes.len()
            + self.next_catalogs.iter().map(XmlCatalog::len).sum::<usize>()
    }

    /// Every mapping target of this catalog (not nested ones)
    fn targets(&self) -> impl Iterator<Item = (&str, &Url)> {
        self.uri_mappings
            .iter()
            .chain(self.system_mappings.iter())
            .chain(self.public_mappings.iter())
            .chain(self.suffixes.iter().map(|(k, v)| (k, v)))
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Parse catalog XML content into this catalog's entries
    ///
    /// Returns the `nextCatalog` references, already resolved against the
    /// in-scope base.
    fn parse_catalog(&mut self, xml: &str) -> Result<Vec<Url>> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut bases: Vec<Url> = vec![self.url.clone()];
        let mut next = Vec::new();
        let mut seen_root = false;

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::Parse(
                    ParseError::new(format!("malformed catalog ({})", e))
                        .with_location(format!("byte {}", reader.buffer_position())),
                )
            })?;
            match event {
                Event::Start(e) | Event::Empty(e) if !seen_root => {
                    if e.local_name().as_ref() != b"catalog" {
                        return Err(Error::Parse(ParseError::new(format!(
                            "expected catalog root element, got {}",
                            String::from_utf8_lossy(e.local_name().as_ref())
                        ))));
                    }
                    seen_root = true;
                    let base = element_base(&e, bases.last().unwrap_or(&self.url))?;
                    bases.push(base);
                }
                Event::Start(e) => {
                    let base = element_base(&e, bases.last().unwrap_or(&self.url))?;
                    self.process_entry(&e, &base, &mut next)?;
                    bases.push(base);
                }
                Event::Empty(e) => {
                    let base = element_base(&e, bases.last().unwrap_or(&self.url))?;
                    self.process_entry(&e, &base, &mut next)?;
                }
                Event::End(_) => {
                    bases.pop();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_root {
            return Err(Error::Parse(ParseError::new("empty catalog document")));
        }
        Ok(next)
    }

    /// Record one catalog entry element
    fn process_entry(&mut self, e: &BytesStart, base: &Url, next: &mut Vec<Url>) -> Result<()> {
        let target = |attr: &str| -> Result<Option<Url>> {
            match attribute(e, attr)? {
                Some(value) => Ok(Some(base.join(value.trim())?)),
                None => Ok(None),
            }
        };

        match e.local_name().as_ref() {
            b"uri" => {
                if let (Some(name), Some(uri)) = (attribute(e, "name")?, target("uri")?) {
                    self.uri_mappings.entry(name).or_insert(uri);
                }
            }
            b"system" => {
                if let (Some(id), Some(uri)) = (attribute(e, "systemId")?, target("uri")?) {
                    self.system_mappings.entry(id).or_insert(uri);
                }
            }
            b"public" => {
                if let (Some(id), Some(uri)) = (attribute(e, "publicId")?, target("uri")?) {
                    self.public_mappings.entry(id).or_insert(uri);
                }
            }
            b"rewriteURI" | b"rewriteSystem" => {
                if let (Some(start), Some(prefix)) =
                    (attribute(e, "uriStartString")?.or(attribute(e, "systemIdStartString")?), target("rewritePrefix")?)
                {
                    self.rewrites.push((start, prefix));
                }
            }
            b"uriSuffix" | b"systemSuffix" => {
                if let (Some(suffix), Some(uri)) =
                    (attribute(e, "uriSuffix")?.or(attribute(e, "systemIdSuffix")?), target("uri")?)
                {
                    self.suffixes.push((suffix, uri));
                }
            }
            b"nextCatalog" => {
                if let Some(catalog) = target("catalog")? {
                    next.push(catalog);
                }
            }
            // group only changes the base; annotations and unknown elements are skipped
            _ => {}
        }
        Ok(())
    }
}

/// Base URL for an element, honoring `xml:base`
fn element_base(e: &BytesStart, inherited: &Url) -> Result<Url> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::Parse(ParseError::new(format!("malformed attribute ({})", e))))?;
        if attr.key.as_ref() == b"xml:base" {
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Parse(ParseError::new(format!("malformed attribute ({})", e))))?;
            return Ok(inherited.join(value.trim())?);
        }
    }
    Ok(inherited.clone())
}

/// Value of an unprefixed attribute
fn attribute(e: &BytesStart, name: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::Parse(ParseError::new(format!("malformed attribute ({})", e))))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Parse(ParseError::new(format!("malformed attribute ({})", e))))?;
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}

/// Loads a catalog tree, following `<nextCatalog>` without revisiting files
struct CatalogLoader<'a> {
    limits: &'a Limits,
    visited: HashSet<Url>,
    files: Vec<Url>,
    results: Vec<String>,
}

impl<'a> CatalogLoader<'a> {
    fn new(limits: &'a Limits) -> Self {
        Self {
            limits,
            visited: HashSet::new(),
            files: Vec::new(),
            results: Vec::new(),
        }
    }

    fn load(&mut self, url: &Url, depth: usize) -> Result<XmlCatalog> {
        self.limits.check_catalog_depth(depth)?;
        self.visited.insert(url.clone());

        let path = url
            .to_file_path()
            .map_err(|_| Error::Catalog(format!("catalog {} is not a local file", url)))?;
        let content = fs::read_to_string(&path).map_err(|e| {
            Error::Catalog(format!("can't read catalog {}: {}", path.display(), e))
        })?;
        self.files.push(url.clone());
        self.limits.check_xml_size(content.len())?;

        let mut catalog = XmlCatalog::empty(url.clone());
        let next = catalog.parse_catalog(&content)?;
        self.check_targets(&catalog);

        for next_url in next {
            let next_url = canonical(next_url);
            if self.visited.contains(&next_url) {
                continue;
            }
            match self.load(&next_url, depth + 1) {
                Ok(nested) => catalog.next_catalogs.push(nested),
                Err(e) => self
                    .results
                    .push(format!("catalog {}: nextCatalog {} not loaded: {}", url, next_url, e.reason())),
            }
        }
        Ok(catalog)
    }

    /// Report mappings that point at local files which do not exist
    fn check_targets(&mut self, catalog: &XmlCatalog) {
        for (key, target) in catalog.targets() {
            if !is_local_file(target) {
                continue;
            }
            let exists = target.to_file_path().map(|p| p.exists()).unwrap_or(false);
            if !exists {
                self.results.push(format!(
                    "catalog {}: entry {} maps to nonexistent file {}",
                    catalog.url, key, target
                ));
            }
        }
    }
}

/// Resolver backed by a list of catalog files
///
/// Catalogs are consulted in the order they were given; the first one that
/// maps a URI wins.
#[derive(Debug, Clone, Default)]
pub struct CatalogResolver {
    catalogs: Vec<XmlCatalog>,
    catalog_files: Vec<Url>,
    validation_results: Vec<String>,
    errors: Vec<String>,
}

impl CatalogResolver {
    /// Create a resolver without catalogs; nothing resolves
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every catalog file, recording failures instead of stopping
    pub fn from_files(paths: &[PathBuf], limits: &Limits) -> Self {
        let mut resolver = Self::new();
        let mut loader = CatalogLoader::new(limits);

        for path in paths {
            let url = match file_url(path) {
                Ok(url) => url,
                Err(e) => {
                    resolver
                        .errors
                        .push(format!("can't read catalog file {}: {}", path.display(), e.reason()));
                    continue;
                }
            };
            if loader.visited.contains(&url) {
                continue;
            }
            match loader.load(&url, 0) {
                Ok(catalog) => resolver.catalogs.push(catalog),
                Err(e) => {
                    // A configured catalog counts even when it fails to load
                    if !loader.files.contains(&url) {
                        loader.files.push(url);
                    }
                    resolver
                        .errors
                        .push(format!("can't load catalog file {}: {}", path.display(), e.reason()));
                }
            }
        }

        resolver.catalog_files = loader.files;
        resolver.validation_results = loader.results;
        resolver
    }

    /// Failures loading the requested catalog files themselves
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// The successfully loaded top-level catalogs
    pub fn catalogs(&self) -> &[XmlCatalog] {
        &self.catalogs
    }
}

impl UriResolver for CatalogResolver {
    fn resolve(&self, uri: &str) -> Result<Option<Url>> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Ok(None);
        }
        match Url::parse(uri) {
            Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {}
            Err(e) => return Err(Error::Url(e)),
        }
        Ok(self
            .catalogs
            .iter()
            .find_map(|catalog| catalog.resolve(uri))
            .map(canonical))
    }

    fn catalog_files(&self) -> &[Url] {
        &self.catalog_files
    }

    fn validation_results(&self) -> &[String] {
        &self.validation_results
    }
}
