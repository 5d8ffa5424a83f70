//! Limits and constraints for schema assembly
//!
//! Schema sets reached through catalogs can be large, and a misconfigured
//! catalog can point at arbitrary files. These limits bound the work a
//! single assembly run will do.

use crate::error::{Error, Result};

/// Global limits configuration
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum size of a single schema or catalog document in bytes
    pub max_xml_size: usize,

    /// Maximum element nesting depth inside a schema document
    pub max_xml_depth: usize,

    /// Maximum length of a `nextCatalog` chain
    pub max_catalog_depth: usize,

    /// Maximum number of distinct schema documents parsed in one run
    pub max_documents: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_size: 100 * 1024 * 1024, // 100 MB
            max_xml_depth: 1000,
            max_catalog_depth: 32,
            max_documents: 10000,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_xml_size: 10 * 1024 * 1024, // 10 MB
            max_xml_depth: 100,
            max_catalog_depth: 8,
            max_documents: 1000,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_xml_size: 1024 * 1024 * 1024, // 1 GB
            max_xml_depth: 10000,
            max_catalog_depth: 256,
            max_documents: 1_000_000,
        }
    }

    /// Set the maximum document size
    pub fn with_max_xml_size(mut self, size: usize) -> Self {
        self.max_xml_size = size;
        self
    }

    /// Set the maximum number of parsed documents
    pub fn with_max_documents(mut self, count: usize) -> Self {
        self.max_documents = count;
        self
    }

    /// Size of one schema or catalog document, in bytes
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        within(size, self.max_xml_size, "document size (bytes)")
    }

    /// Element nesting depth inside a schema document
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        within(depth, self.max_xml_depth, "element depth")
    }

    /// Length of a `nextCatalog` chain
    pub fn check_catalog_depth(&self, depth: usize) -> Result<()> {
        within(depth, self.max_catalog_depth, "nextCatalog chain depth")
    }

    /// Number of distinct schema documents attempted in one run
    pub fn check_documents(&self, count: usize) -> Result<()> {
        within(count, self.max_documents, "document count")
    }
}

fn within(value: usize, max: usize, what: &str) -> Result<()> {
    if value > max {
        return Err(Error::LimitExceeded(format!("{} {} exceeds maximum {}", what, value, max)));
    }
    Ok(())
}
