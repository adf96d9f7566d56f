//! Shared error surface and option validation for the ignition generator.

use lazy_static::lazy_static;
#[cfg(feature = "napi")]
use napi_derive::napi;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

/// Marker export located but not a callable with at most one parameter.
pub const ERR_MARKER_CORRUPT: &str = "IGN-ERR-MARKER-001";
/// The marker applied more than once to the same method.
pub const ERR_MARKER_REPEATED: &str = "IGN-ERR-MARKER-002";
/// Marker argument that is not an integer literal.
pub const ERR_PRIORITY_MALFORMED: &str = "IGN-ERR-PRIORITY-001";
/// Generator options that cannot identify a marker or an output unit.
pub const ERR_OPTIONS_INVALID: &str = "IGN-ERR-OPTIONS-001";
/// Rendered startup unit failed syntax verification.
pub const ERR_EMIT_UNPARSABLE: &str = "IGN-ERR-EMIT-001";
/// Output path occupied by a file the generator did not write.
pub const ERR_EMIT_CLOBBER: &str = "IGN-ERR-EMIT-002";
/// The generated unit could not be written to disk.
pub const ERR_EMIT_IO: &str = "IGN-ERR-EMIT-003";

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_MARKER_CORRUPT => {
            "The startup marker is a callable decorator factory with a single optional integer parameter."
        }
        ERR_MARKER_REPEATED => "A declaration registers for startup at most once.",
        ERR_PRIORITY_MALFORMED => "Startup priority is a compile-time integer literal.",
        ERR_OPTIONS_INVALID => "Generator options identify a resolvable marker before scanning begins.",
        ERR_EMIT_UNPARSABLE => "Emitted startup units are syntactically valid modules.",
        ERR_EMIT_CLOBBER => "The generator only overwrites files it generated itself.",
        ERR_EMIT_IO => "The generated artifact reaches disk or the build fails loudly.",
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GENERATOR ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct GeneratorError {
    pub code: String,
    pub error_type: String,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl GeneratorError {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Self::with_details(code, message, file, line, column, None, vec![])
    }

    pub fn with_details(
        code: &str,
        message: &str,
        file: &str,
        line: u32,
        column: u32,
        context: Option<String>,
        hints: Vec<String>,
    ) -> Self {
        GeneratorError {
            code: code.to_string(),
            error_type: "GENERATOR_INVARIANT_VIOLATION".to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            file: file.to_string(),
            line,
            column,
            context,
            hints,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE LOCATIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

/// Map a byte offset into `source` to a 1-based line/column pair.
pub fn offset_to_location(source: &str, offset: u32) -> SourceLocation {
    let offset = (offset as usize).min(source.len());
    let prefix = &source[..offset];
    let line = prefix.bytes().filter(|b| *b == b'\n').count() as u32 + 1;
    let column = match prefix.rfind('\n') {
        Some(nl) => (offset - nl) as u32,
        None => offset as u32 + 1,
    };
    SourceLocation { line, column }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPTION VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref IDENT_RE: Regex = Regex::new(r"^[a-zA-Z_$][a-zA-Z0-9_$]*$").unwrap();
}

pub fn is_valid_identifier(name: &str) -> bool {
    IDENT_RE.is_match(name)
}

/// Validate the marker/output configuration before any scanning runs.
pub fn validate_marker_options(
    marker_name: &str,
    marker_module: &str,
    out_file: &str,
) -> Option<GeneratorError> {
    if !is_valid_identifier(marker_name) {
        return Some(GeneratorError::new(
            ERR_OPTIONS_INVALID,
            &format!("Marker name '{}' is not a valid identifier.", marker_name),
            "<options>",
            0,
            0,
        ));
    }

    if marker_module.is_empty() || marker_module.starts_with('/') {
        return Some(GeneratorError::with_details(
            ERR_OPTIONS_INVALID,
            &format!(
                "Marker module '{}' must be a non-empty path relative to the project root.",
                marker_module
            ),
            "<options>",
            0,
            0,
            None,
            vec!["Pass the marker module as e.g. 'src/startup'.".to_string()],
        ));
    }

    let has_source_ext = [".ts", ".tsx", ".mts", ".js", ".jsx", ".mjs"]
        .iter()
        .any(|ext| out_file.ends_with(ext));
    if out_file.is_empty() || !has_source_ext {
        return Some(GeneratorError::new(
            ERR_OPTIONS_INVALID,
            &format!("Output file '{}' must be a TS/JS module path.", out_file),
            "<options>",
            0,
            0,
        ));
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
