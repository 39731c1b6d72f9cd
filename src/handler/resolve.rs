//! URL path to file resolution
//!
//! Maps a request path onto the public root, handling `/`, directory
//! indexes and traversal attempts.

use percent_encoding::percent_decode_str;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::error::ServeError;
use crate::logger;

/// Index file looked up inside directories
pub const INDEX_FILE: &str = "index.html";

/// File chosen to answer a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub path: PathBuf,
    /// True when `path` is the index of a requested directory
    pub is_directory: bool,
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Serve(ResolvedTarget),
    /// Directory requested without trailing slash; carries the new location
    Redirect(String),
}

/// Resolve `url_path` (as received, percent-encoded) against `root`
///
/// `root` must already be canonical. `query` is carried over to redirects.
pub async fn resolve(
    root: &Path,
    url_path: &str,
    query: Option<&str>,
) -> Result<Resolution, ServeError> {
    let url_path = if url_path == "/" { "/index.html" } else { url_path };
    let not_found = || ServeError::NotFound(url_path.to_string());

    let decoded = percent_decode_str(url_path)
        .decode_utf8()
        .map_err(|_| not_found())?;
    let relative = relative_path(&decoded).ok_or_else(|| {
        logger::log_warning(&format!("Path traversal attempt blocked: {url_path}"));
        not_found()
    })?;

    let candidate = root.join(relative);
    let metadata = match fs::metadata(&candidate).await {
        Ok(m) => m,
        Err(e) if is_not_found(&e) => return Err(not_found()),
        Err(source) => {
            return Err(ServeError::Filesystem {
                path: url_path.to_string(),
                source,
            })
        }
    };

    let canonical = contained(root, &candidate, url_path).await?;

    if !metadata.is_dir() {
        return Ok(Resolution::Serve(ResolvedTarget {
            path: canonical,
            is_directory: false,
        }));
    }

    let index = canonical.join(INDEX_FILE);
    match fs::metadata(&index).await {
        Ok(m) if m.is_file() => {}
        Ok(_) => return Err(ServeError::DirectoryWithoutIndex(url_path.to_string())),
        Err(e) if is_not_found(&e) => {
            return Err(ServeError::DirectoryWithoutIndex(url_path.to_string()))
        }
        Err(source) => {
            return Err(ServeError::Filesystem {
                path: url_path.to_string(),
                source,
            })
        }
    }
    let index = contained(root, &index, url_path).await?;

    if !url_path.ends_with('/') {
        // A single leading slash keeps `//host` from becoming an off-site URL
        let path = url_path.trim_start_matches('/');
        let location = match query {
            Some(q) => format!("/{path}/?{q}"),
            None => format!("/{path}/"),
        };
        return Ok(Resolution::Redirect(location));
    }

    Ok(Resolution::Serve(ResolvedTarget {
        path: index,
        is_directory: true,
    }))
}

/// Canonicalize `path` and require it to stay under `root`
///
/// Symlinks may still point outside the root.
async fn contained(root: &Path, path: &Path, url_path: &str) -> Result<PathBuf, ServeError> {
    let canonical = match fs::canonicalize(path).await {
        Ok(p) => p,
        Err(e) if is_not_found(&e) => return Err(ServeError::NotFound(url_path.to_string())),
        Err(source) => {
            return Err(ServeError::Filesystem {
                path: url_path.to_string(),
                source,
            })
        }
    };
    if !canonical.starts_with(root) {
        logger::log_warning(&format!(
            "Path escapes public root: {url_path} -> {}",
            canonical.display()
        ));
        return Err(ServeError::NotFound(url_path.to_string()));
    }
    Ok(canonical)
}

/// Turn a decoded URL path into a path relative to the root, rejecting
/// anything that could leave it
fn relative_path(decoded: &str) -> Option<PathBuf> {
    let trimmed = decoded.trim_start_matches('/');
    if trimmed.contains('\0') || trimmed.contains('\\') {
        return None;
    }

    let mut relative = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(relative)
}

fn is_not_found(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}
