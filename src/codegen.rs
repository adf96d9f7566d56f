//! Emitter for the ignition generator.
//!
//! Renders the single generated startup unit: aliased imports of each
//! selected class, a module-local once-guard, and an exported entry point
//! invoked at module evaluation — the host's one-shot load mechanism.
//! Output is assembled textually, then parse-verified before it is allowed
//! to leave the pipeline.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_parser::Parser;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::plan::OrderedEntry;
use crate::resolve::{normalize_path, strip_source_ext};
use crate::scan::{source_type_for, ExportKind};
use crate::validate::{
    GeneratorError, ERR_EMIT_CLOBBER, ERR_EMIT_IO, ERR_EMIT_UNPARSABLE,
};

pub const GENERATED_HEADER: &str = "// Code generated by ignition. DO NOT EDIT.";

lazy_static! {
    static ref GENERATED_RE: Regex =
        Regex::new(r"^\x{FEFF}?\s*// Code generated by ignition").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// GENERATED UNIT
// ═══════════════════════════════════════════════════════════════════════════════

/// The single textual output artifact. Never mutated after emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedUnit {
    pub file_name: String,
    pub code: String,
    pub entry_count: usize,
}

/// Whether file contents were written by this generator.
pub fn is_generated_code(source: &str) -> bool {
    GENERATED_RE.is_match(source)
}

// ═══════════════════════════════════════════════════════════════════════════════
// IMPORT SPECIFIERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Relative, extension-free module specifier from the output unit's
/// directory to a source unit. Always slash-separated and `./`-anchored,
/// the form module resolvers expect.
fn relative_specifier(from_dir: &Path, to_unit: &Path) -> String {
    let from = normalize_path(from_dir);
    let to = strip_source_ext(&normalize_path(to_unit));

    let from_parts: Vec<String> = from
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    let to_parts: Vec<String> = to
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from_parts.len() {
        parts.push("..".to_string());
    }
    parts.extend(to_parts[common..].iter().cloned());

    if parts.first().map(|p| p == "..").unwrap_or(false) {
        parts.join("/")
    } else {
        format!("./{}", parts.join("/"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDERING
// ═══════════════════════════════════════════════════════════════════════════════

/// Render the startup unit for a planned sequence. An empty plan produces
/// no artifact at all; dead bootstrap code is worse than no file.
pub fn render_startup_unit(
    entries: &[OrderedEntry],
    root: &Path,
    out_file: &str,
) -> Result<Option<GeneratedUnit>, GeneratorError> {
    if entries.is_empty() {
        return Ok(None);
    }

    let out_path = normalize_path(&root.join(out_file));
    let out_dir = out_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    // Calls go through deterministic aliases keyed on (unit, class), so
    // same-named classes from different units never collide and the
    // invocation cannot be intercepted by shadowing at the call site.
    let mut alias_for: HashMap<(PathBuf, String), String> = HashMap::new();
    let mut import_lines: Vec<String> = Vec::new();
    for entry in entries {
        let key = (entry.unit.clone(), entry.class_name.clone());
        if alias_for.contains_key(&key) {
            continue;
        }
        let alias = format!("{}_{}", entry.class_name, alias_for.len());
        let specifier = relative_specifier(&out_dir, &entry.unit);
        import_lines.push(match entry.export {
            ExportKind::Named => format!(
                "import {{ {} as {} }} from '{}';",
                entry.class_name, alias, specifier
            ),
            ExportKind::Default => format!("import {} from '{}';", alias, specifier),
        });
        alias_for.insert(key, alias);
    }

    let mut code = String::new();
    code.push_str(GENERATED_HEADER);
    code.push('\n');
    code.push_str("// Startup invocation order: priority ascending, source order on ties.\n\n");
    for line in &import_lines {
        code.push_str(line);
        code.push('\n');
    }
    code.push_str("\nlet invoked = false;\n\n");
    code.push_str("export function runStartup() {\n");
    code.push_str("  if (invoked) {\n    return;\n  }\n  invoked = true;\n");
    for entry in entries {
        let key = (entry.unit.clone(), entry.class_name.clone());
        let alias = &alias_for[&key];
        code.push_str(&format!("  // priority {}\n", entry.priority));
        code.push_str(&format!("  {}.{}();\n", alias, entry.method_name));
    }
    code.push_str("}\n\nrunStartup();\n");

    let unit = GeneratedUnit {
        file_name: out_file.to_string(),
        code,
        entry_count: entries.len(),
    };

    if let Some(err) = verify_unit_syntax(&unit) {
        return Err(err);
    }
    Ok(Some(unit))
}

/// Re-parse the rendered module; a malformed render must never surface as
/// a partial artifact.
fn verify_unit_syntax(unit: &GeneratedUnit) -> Option<GeneratorError> {
    let allocator = Allocator::default();
    let source_type = source_type_for(Path::new(&unit.file_name));
    let ret = Parser::new(&allocator, &unit.code, source_type).parse();

    if ret.panicked || !ret.errors.is_empty() {
        return Some(GeneratorError::with_details(
            ERR_EMIT_UNPARSABLE,
            &format!(
                "Rendered startup unit '{}' failed syntax verification.",
                unit.file_name
            ),
            &unit.file_name,
            0,
            0,
            Some(format!("{:?}", ret.errors.first())),
            vec![],
        ));
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISK OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

pub fn compute_hash(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Write the unit under `root`. Returns `Ok(false)` when the on-disk
/// artifact is already byte-identical (no churn for downstream watchers).
/// A pre-existing file that this generator did not write is never
/// overwritten.
pub fn write_unit(root: &Path, unit: &GeneratedUnit) -> Result<bool, GeneratorError> {
    let path = root.join(&unit.file_name);
    let file = path.to_string_lossy().to_string();

    if path.exists() {
        let existing = fs::read_to_string(&path).unwrap_or_default();
        if !is_generated_code(&existing) {
            return Err(GeneratorError::with_details(
                ERR_EMIT_CLOBBER,
                &format!("Output path '{}' holds a file ignition did not generate.", file),
                &file,
                0,
                0,
                None,
                vec!["Move the file or pick a different outFile.".to_string()],
            ));
        }
        if compute_hash(&existing) == compute_hash(&unit.code) {
            return Ok(false);
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok();
    }
    fs::write(&path, &unit.code)
        .map_err(|e| GeneratorError::new(ERR_EMIT_IO, &format!("Failed to write: {}", e), &file, 0, 0))?;
    Ok(true)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
