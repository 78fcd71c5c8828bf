//! Loading FHIR packages from disk into a [`FhirDefinitions`] registry
//!
//! A package on disk follows the npm layout used by the FHIR package
//! registry: `<root>/package/` holds one JSON file per resource plus a
//! `package.json` manifest. Only the top level of that directory is read.

use crate::canonical::FhirDefinitions;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Errors raised while reading a package directory
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Package directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load every resource under `root/package` into `defs`
///
/// Returns the number of resources the registry accepted. Files that are not
/// valid JSON are skipped with a warning.
pub fn load_from_path(
    root: &Path,
    package_id: &str,
    defs: &mut FhirDefinitions,
) -> Result<usize, LoadError> {
    let package_dir = root.join("package");
    if !package_dir.is_dir() {
        return Err(LoadError::MissingDirectory(package_dir));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(&package_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
        .collect();
    files.sort();

    let mut added = 0;
    for path in files {
        let content = fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let json: Value = match serde_json::from_str(&content) {
            Ok(json) => json,
            Err(err) => {
                warn!("Skipping {}: {}", path.display(), err);
                continue;
            }
        };

        if path.file_name().and_then(|name| name.to_str()) == Some("package.json") {
            defs.add_package_json(package_id, json);
            continue;
        }
        if defs.add(json) {
            added += 1;
        } else {
            debug!("Ignoring {}: not a definition", path.display());
        }
    }

    defs.packages.push(package_id.to_string());
    debug!("Loaded {} definitions from {}", added, package_id);
    Ok(added)
}
