//! # Ignition Startup Generator
//!
//! Compile-time discovery and ordering of `@Startup(priority)` static
//! methods across a TS/JS project, emitted as a single auto-invoked
//! generated module.
//!
//! ## Ordering Invariants
//!
//! 1. **Ascending priorities**: the generated invocation sequence's
//!    priorities are non-decreasing; lower priorities run earlier.
//!
//! 2. **Stable ties**: entries with equal priority run in discovery order,
//!    which itself is reproducible (sorted unit walk, source-order scan).
//!
//! 3. **Identity, not spelling**: a decorator only counts as the marker if
//!    its root binding is a value import resolving to the marker's defining
//!    unit. Same-named lookalikes are dropped silently.
//!
//! 4. **Exactly once**: the generated unit invokes its entry point at
//!    module evaluation and guards re-entry; there is exactly one top-level
//!    invocation in the artifact.
//!
//! 5. **No partial artifacts**: a corrupt marker, malformed priority,
//!    repeated marker or unverifiable render aborts the pass with a fatal
//!    diagnostic instead of emitting anything.
//!
//! 6. **Inert outside builds**: any command other than `build` produces
//!    nothing, so interactive hosts never accumulate stale artifacts.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod codegen;
mod discovery;
mod pipeline;
mod plan;
mod priority;
mod resolve;
mod scan;
mod validate;

#[cfg(test)]
mod ordering_tests;

// Internal Rust-to-Rust API (for build-tool plugins)
pub use codegen::{render_startup_unit, write_unit, GeneratedUnit, GENERATED_HEADER};
pub use discovery::{find_source_files, load_units, SourceUnit};
pub use pipeline::{
    generate_startup_from_json, generate_startup_internal, plan_from_units, EntrySummary,
    GenerateOptions, GenerateResult, PipelineConfig, StartupPlan,
};
pub use plan::{plan_order, OrderedEntry};
pub use priority::{extract_all, extract_priority, PrioritizedCandidate, DEFAULT_PRIORITY};
pub use resolve::{locate_marker, MarkerDefinition, ResolvedCandidate, Resolver};
pub use scan::{scan_unit, DecoratorArgValue, DecoratorUse, ExportKind, SyntacticCandidate};
pub use validate::{GeneratorError, SourceLocation};

#[cfg(feature = "napi")]
pub use discovery::discover_startup_units_native;
#[cfg(feature = "napi")]
pub use pipeline::generate_startup_native;

#[cfg(feature = "napi")]
#[napi]
pub fn ignition_bridge() -> String {
    "Ignition Native Bridge Connected".to_string()
}
