//! Unit discovery for the ignition generator.
//!
//! Recursively scans a project root for TS/JS modules and loads the ones
//! that can possibly reference the startup marker.

use lazy_static::lazy_static;
#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE UNITS
// ═══════════════════════════════════════════════════════════════════════════════

/// One already-loaded compilation unit. The pipeline core operates on these
/// and performs no further I/O.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceUnit {
    pub path: PathBuf,
    pub source: String,
}

lazy_static! {
    static ref SOURCE_EXTENSIONS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("ts");
        s.insert("tsx");
        s.insert("mts");
        s.insert("js");
        s.insert("jsx");
        s.insert("mjs");
        s
    };

    static ref SKIP_DIRS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("node_modules");
        s.insert("dist");
        s.insert("build");
        s.insert("coverage");
        s
    };
}

fn keep_entry(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return false;
    }
    if entry.file_type().is_dir() && SKIP_DIRS.contains(name.as_ref()) {
        return false;
    }
    true
}

/// Recursively find all TS/JS source files under `root`, in sorted order so
/// discovery sequence numbers are reproducible across runs. Previously
/// generated units are not source.
pub fn find_source_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(keep_entry);

    for entry in walker.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.contains(".generated.") {
            continue;
        }
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if SOURCE_EXTENSIONS.contains(ext) {
                files.push(path.to_path_buf());
            }
        }
    }

    files
}

/// Load the units that can possibly carry the marker. Any unit using (or
/// defining) the marker must spell its short name somewhere in the text, so
/// a substring test is a safe prefilter that keeps parse work proportional
/// to actual marker usage.
pub fn load_units(root: &Path, marker_name: &str) -> Vec<SourceUnit> {
    let mut units = Vec::new();

    for path in find_source_files(root) {
        let source = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[Ignition] Failed to read {:?}: {}", path, e);
                continue;
            }
        };

        if !source.contains(marker_name) {
            continue;
        }

        units.push(SourceUnit { path, source });
    }

    units
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
#[napi]
pub fn discover_startup_units_native(root_dir: String, marker_name: String) -> serde_json::Value {
    let paths: Vec<String> = load_units(Path::new(&root_dir), &marker_name)
        .into_iter()
        .map(|u| u.path.to_string_lossy().to_string())
        .collect();
    serde_json::to_value(paths).unwrap_or(serde_json::Value::Null)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
