//! Resource location resolution
//!
//! Initial inputs are either schema document paths or namespace URIs. All
//! schema documents are identified by canonical `file:` URLs so that the same
//! document reached through different spellings is recognized as one.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use url::Url;

/// Initial input to an assembly run - a schema document path or a namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// File system path of a schema document
    Path(PathBuf),
    /// Namespace URI, resolved through the catalog
    Namespace(String),
}

impl Location {
    /// Classify an input string
    ///
    /// A string that parses as a URI with a scheme other than `file` is a
    /// namespace. Single-letter schemes are drive letters (`C:\schemas`), so
    /// those stay paths.
    pub fn classify(s: &str) -> Self {
        let s = s.trim();
        if let Ok(url) = Url::parse(s) {
            if url.scheme() == "file" {
                if let Ok(path) = url.to_file_path() {
                    return Location::Path(path);
                }
            } else if url.scheme().len() > 1 {
                return Location::Namespace(s.to_string());
            }
        }
        Location::Path(PathBuf::from(s))
    }

    /// Check if this is a namespace to be resolved through the catalog
    pub fn is_namespace(&self) -> bool {
        matches!(self, Location::Namespace(_))
    }
}

/// Whether `url` identifies a local file
pub fn is_local_file(url: &Url) -> bool {
    url.scheme() == "file"
}

/// Canonical `file:` URL for a file system path
///
/// Existing files are canonicalized (symlinks resolved); missing files are
/// made absolute against the current directory.
pub fn file_url(path: &Path) -> Result<Url> {
    let absolute = match path.canonicalize() {
        Ok(p) => p,
        Err(_) if path.is_absolute() => path.to_path_buf(),
        Err(_) => std::env::current_dir()?.join(path),
    };
    Url::from_file_path(&absolute).map_err(|_| {
        Error::Resource(format!("cannot express '{}' as a file URL", absolute.display()))
    })
}

/// Canonicalize a resolved URL
///
/// Local files that exist are rewritten to their canonical path; everything
/// else is returned unchanged.
pub fn canonical(url: Url) -> Url {
    if !is_local_file(&url) {
        return url;
    }
    url.to_file_path()
        .ok()
        .and_then(|p| p.canonicalize().ok())
        .and_then(|p| Url::from_file_path(p).ok())
        .unwrap_or(url)
}

/// Resolve a `schemaLocation` against the document that references it
///
/// Without a referencing document, the location must be an absolute URL or
/// a file system path.
pub fn resolve_relative(base: Option<&Url>, location: &str) -> Result<Url> {
    let resolved = match base {
        Some(base) => base.join(location)?,
        None => match Url::parse(location) {
            Ok(url) if url.scheme().len() > 1 => url,
            _ => file_url(Path::new(location))?,
        },
    };
    Ok(canonical(resolved))
}

/// Longest common directory of a set of local file URLs
///
/// The result always ends with `/` and is a prefix of every local URL given.
/// Non-local URLs are ignored. Returns `None` when no local URL is given.
pub fn common_root<'a>(urls: impl IntoIterator<Item = &'a Url>) -> Option<String> {
    let mut root: Option<&str> = None;
    for url in urls.into_iter().filter(|u| is_local_file(u)) {
        let s = url.as_str();
        let dir = &s[..s.rfind('/').map_or(0, |i| i + 1)];
        root = Some(match root {
            None => dir,
            Some(current) => common_prefix(current, dir),
        });
    }
    let root = root?;
    // Cut back to a whole directory
    let end = root.rfind('/').map_or(0, |i| i + 1);
    Some(root[..end].to_string())
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .char_indices()
        .zip(b.chars())
        .take_while(|((_, ca), cb)| ca == cb)
        .last()
        .map_or(0, |((i, ca), _)| i + ca.len_utf8());
    &a[..len]
}

/// File system form of a directory URL, for display
pub fn display_directory(root: &str) -> String {
    Url::parse(root)
        .ok()
        .and_then(|u| u.to_file_path().ok())
        .map(|p| {
            let mut s = p.to_string_lossy().to_string();
            if !s.ends_with(std::path::MAIN_SEPARATOR) {
                s.push(std::path::MAIN_SEPARATOR);
            }
            s
        })
        .unwrap_or_else(|| root.to_string())
}

/// Rewrite every occurrence of `root` in `text` so paths read relative to it
pub fn relative_to(text: &str, root: &str) -> String {
    if root.is_empty() {
        text.to_string()
    } else {
        text.replace(root, "")
    }
}
