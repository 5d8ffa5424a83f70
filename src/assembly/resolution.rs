//! Resolution policy for one load request
//!
//! A directive may name its document twice: through `namespace`, which only
//! the catalog can map to a file, and through `schemaLocation`, which the
//! catalog may map and which otherwise resolves relative to the referencing
//! document. When the two answers differ, both documents are loaded so the
//! contradiction shows up downstream instead of being hidden.

use url::Url;

use super::request::{LoadRequest, RequestKind};
use crate::catalog::UriResolver;
use crate::locations::{is_local_file, resolve_relative};

/// Non-empty trimmed attribute value
fn attr_value(attr: &Option<String>) -> Option<String> {
    attr.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Resolve the request's attributes and decide which documents to load
///
/// Fills in `namespace_resolved` and `schema_location_resolved`, appends the
/// resolution findings to the request, and returns the documents to load in
/// order (none, one, or two when the answers disagree).
pub fn resolve_request(request: &mut LoadRequest, resolver: &dyn UriResolver) -> Vec<Url> {
    let namespace = attr_value(&request.namespace_attr);
    let schema_location = attr_value(&request.schema_location_attr);

    if let Some(ns) = &namespace {
        request.namespace_resolved = resolve_namespace(request, resolver, ns);
    } else if request.kind == RequestKind::Import {
        request.warn("no namespace attribute in import element");
    }

    let mut location_via_catalog = false;
    let mut location_rejected = false;
    if let Some(loc) = &schema_location {
        if request.namespace_resolved.is_some() {
            match resolver.resolve(loc) {
                Ok(Some(url)) if is_local_file(&url) => {
                    request.schema_location_resolved = Some(url);
                    location_via_catalog = true;
                }
                Ok(Some(url)) => {
                    request.warn(format!("schemaLocation {} resolves to non-local resource {}", loc, url));
                    location_rejected = true;
                }
                Ok(None) | Err(_) => {}
            }
        }
        if !location_via_catalog && !location_rejected {
            request.schema_location_resolved = resolve_location(request, loc);
        }
    } else if request.kind != RequestKind::InitialLoad {
        request.warn(format!("no schemaLocation attribute in {} element", request.kind));
    }

    let location_how = if location_via_catalog { " through catalog" } else { "" };
    match (request.namespace_resolved.clone(), request.schema_location_resolved.clone()) {
        (Some(from_ns), Some(from_loc)) => {
            if from_ns != from_loc {
                request.warn(format!(
                    "resolved namespace != resolved schemaLocation: {} != {}",
                    from_ns, from_loc
                ));
            }
            request.log(format!(
                "namespace {} resolved to {} through catalog",
                namespace.as_deref().unwrap_or_default(),
                from_ns
            ));
            request.log(format!(
                "schemaLocation {} resolved to {}{}",
                schema_location.as_deref().unwrap_or_default(),
                from_loc,
                location_how
            ));
            if from_ns == from_loc {
                vec![from_ns]
            } else {
                vec![from_ns, from_loc]
            }
        }
        (Some(from_ns), None) => {
            request.log(format!(
                "namespace {} resolved to {} through catalog",
                namespace.as_deref().unwrap_or_default(),
                from_ns
            ));
            vec![from_ns]
        }
        (None, Some(from_loc)) => {
            request.log(format!(
                "schemaLocation {} resolved to {}{}",
                schema_location.as_deref().unwrap_or_default(),
                from_loc,
                location_how
            ));
            vec![from_loc]
        }
        (None, None) => {
            request.warn("can't determine a schema document to parse");
            Vec::new()
        }
    }
}

/// Catalog lookup of a namespace; only local files count as resolved
fn resolve_namespace(request: &mut LoadRequest, resolver: &dyn UriResolver, ns: &str) -> Option<Url> {
    match resolver.resolve(ns) {
        Ok(Some(url)) if is_local_file(&url) => Some(url),
        Ok(Some(url)) => {
            request.warn(format!("namespace {} resolves to non-local resource {}", ns, url));
            None
        }
        Ok(None) => {
            if resolver.has_catalogs() {
                request.warn(format!("no catalog entry for namespace {}", ns));
            }
            None
        }
        Err(e) => {
            request.warn(format!("malformed namespace URI {}: {}", ns, e.reason()));
            None
        }
    }
}

/// Relative resolution of a schemaLocation against the referencing document
fn resolve_location(request: &mut LoadRequest, loc: &str) -> Option<Url> {
    match resolve_relative(request.parent.as_ref(), loc) {
        Ok(url) if is_local_file(&url) => Some(url),
        Ok(url) => {
            request.warn(format!("schemaLocation {} resolves to non-local resource {}", loc, url));
            None
        }
        Err(e) => {
            request.warn(format!("malformed schemaLocation {}: {}", loc, e.reason()));
            None
        }
    }
}
