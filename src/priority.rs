//! Priority extraction for the ignition generator.
//!
//! Reads the confirmed marker use of each resolved candidate. Only
//! compile-time integer literals participate; anything the scanner could
//! not reduce to one is the same unrecoverable failure class as a corrupt
//! marker, because the planned order would otherwise be unknowable.

use crate::resolve::ResolvedCandidate;
use crate::scan::DecoratorArgValue;
use crate::validate::{GeneratorError, ERR_PRIORITY_MALFORMED};

pub const DEFAULT_PRIORITY: i32 = 0;

/// A resolved candidate paired with its declared priority. Produced in
/// discovery order; the planner owns reordering.
#[derive(Debug, Clone)]
pub struct PrioritizedCandidate {
    pub priority: i32,
    pub candidate: ResolvedCandidate,
}

/// Bare marker or empty call → default 0; one integer literal → its value.
pub fn extract_priority(candidate: &ResolvedCandidate) -> Result<i32, GeneratorError> {
    let marker = &candidate.marker;

    if !marker.called || marker.args.is_empty() {
        return Ok(DEFAULT_PRIORITY);
    }

    if marker.args.len() > 1 {
        return Err(priority_error(
            candidate,
            &format!("takes one priority argument, found {}", marker.args.len()),
            None,
        ));
    }

    match &marker.args[0] {
        DecoratorArgValue::Int(value) => Ok(*value),
        DecoratorArgValue::Unsupported(snippet) => Err(priority_error(
            candidate,
            "priority must be an integer literal",
            Some(snippet.clone()),
        )),
    }
}

pub fn extract_all(
    candidates: Vec<ResolvedCandidate>,
) -> Result<Vec<PrioritizedCandidate>, GeneratorError> {
    let mut out = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let priority = extract_priority(&candidate)?;
        out.push(PrioritizedCandidate {
            priority,
            candidate,
        });
    }
    Ok(out)
}

fn priority_error(
    candidate: &ResolvedCandidate,
    detail: &str,
    context: Option<String>,
) -> GeneratorError {
    GeneratorError::with_details(
        ERR_PRIORITY_MALFORMED,
        &format!(
            "Startup marker on {}: {}.",
            candidate.qualified_name, detail
        ),
        &candidate.unit.to_string_lossy(),
        candidate.marker.location.line,
        candidate.marker.location.column,
        context,
        vec!["Use e.g. @Startup(-10) or @Startup() for the default 0.".to_string()],
    )
}
