//! Pipeline orchestration for the ignition generator.
//!
//! One synchronous pass per invocation: discovery → scan → resolve →
//! extract → plan → emit. Per-candidate problems are absorbed inside the
//! stages; global problems surface as errors on the result, and no partial
//! artifact is ever produced.

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::codegen::{render_startup_unit, write_unit, GeneratedUnit};
use crate::discovery::{load_units, SourceUnit};
use crate::plan::{plan_order, OrderedEntry};
use crate::priority::extract_all;
use crate::resolve::{locate_marker, Resolver};
use crate::scan::scan_unit;
use crate::validate::{validate_marker_options, GeneratorError, ERR_OPTIONS_INVALID};

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateOptions {
    pub root_dir: String,
    /// Root-relative module defining the marker, extension optional.
    pub marker_module: String,
    pub marker_name: String,
    pub out_file: String,
    /// The harness's command. Anything other than `build` leaves the
    /// pipeline inert, so interactive hosts never produce stale artifacts.
    pub command: String,
    pub write: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            root_dir: ".".to_string(),
            marker_module: "startup".to_string(),
            marker_name: "Startup".to_string(),
            out_file: "startup.generated.ts".to_string(),
            command: "build".to_string(),
            write: true,
        }
    }
}

/// Core-facing configuration; the pure pipeline never touches option
/// parsing or the filesystem.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub root: PathBuf,
    pub marker_module: String,
    pub marker_name: String,
    pub out_file: String,
}

impl From<&GenerateOptions> for PipelineConfig {
    fn from(options: &GenerateOptions) -> Self {
        PipelineConfig {
            root: PathBuf::from(&options.root_dir),
            marker_module: options.marker_module.clone(),
            marker_name: options.marker_name.clone(),
            out_file: options.out_file.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CORE PIPELINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of one run over an in-memory unit set.
#[derive(Debug)]
pub struct StartupPlan {
    pub marker_found: bool,
    pub candidates_found: usize,
    pub entries: Vec<OrderedEntry>,
    pub generated: Option<GeneratedUnit>,
}

/// Run the analysis and rendering stages over already-loaded units.
/// The resolver (and its per-unit cache) lives exactly as long as this call.
pub fn plan_from_units(
    units: &[SourceUnit],
    config: &PipelineConfig,
) -> Result<StartupPlan, GeneratorError> {
    let marker = match locate_marker(
        units,
        &config.root,
        &config.marker_module,
        &config.marker_name,
    )? {
        Some(marker) => marker,
        None => {
            return Ok(StartupPlan {
                marker_found: false,
                candidates_found: 0,
                entries: vec![],
                generated: None,
            })
        }
    };

    let mut seq = 0;
    let mut candidates = Vec::new();
    for unit in units {
        candidates.extend(scan_unit(unit, &config.marker_name, &mut seq));
    }
    let candidates_found = candidates.len();

    let mut resolver = Resolver::new(units, &marker);
    let resolved = resolver.resolve_all(&candidates)?;
    let prioritized = extract_all(resolved)?;
    let entries = plan_order(prioritized);
    let generated = render_startup_unit(&entries, &config.root, &config.out_file)?;

    Ok(StartupPlan {
        marker_found: true,
        candidates_found,
        entries,
        generated,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOST-FACING RESULT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub priority: i32,
    pub qualified_name: String,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResult {
    pub generated: Option<GeneratedUnit>,
    /// Planned invocations in execution order, for build-log auditability.
    pub entries: Vec<EntrySummary>,
    pub units_scanned: usize,
    pub candidates_found: usize,
    pub wrote_output: bool,
    pub skipped: bool,
    pub skip_reason: Option<String>,
    pub has_errors: bool,
    pub errors: Vec<GeneratorError>,
}

impl GenerateResult {
    fn inert(reason: String, units_scanned: usize) -> Self {
        GenerateResult {
            generated: None,
            entries: vec![],
            units_scanned,
            candidates_found: 0,
            wrote_output: false,
            skipped: true,
            skip_reason: Some(reason),
            has_errors: false,
            errors: vec![],
        }
    }

    fn failed(error: GeneratorError, units_scanned: usize) -> Self {
        GenerateResult {
            generated: None,
            entries: vec![],
            units_scanned,
            candidates_found: 0,
            wrote_output: false,
            skipped: false,
            skip_reason: None,
            has_errors: true,
            errors: vec![error],
        }
    }
}

pub fn generate_startup_internal(options: &GenerateOptions) -> GenerateResult {
    if let Some(err) = validate_marker_options(
        &options.marker_name,
        &options.marker_module,
        &options.out_file,
    ) {
        return GenerateResult::failed(err, 0);
    }

    if options.command != "build" {
        return GenerateResult::inert(
            format!("command '{}' is not a build invocation", options.command),
            0,
        );
    }

    let config = PipelineConfig::from(options);
    let units = load_units(&config.root, &config.marker_name);
    let units_scanned = units.len();

    let plan = match plan_from_units(&units, &config) {
        Ok(plan) => plan,
        Err(err) => return GenerateResult::failed(err, units_scanned),
    };

    if !plan.marker_found {
        eprintln!(
            "[Ignition] Marker '{}' not found under {:?}; nothing to order.",
            options.marker_name, config.root
        );
        return GenerateResult::inert("marker not present in the compilation set".to_string(), units_scanned);
    }

    let wrote_output = match (&plan.generated, options.write) {
        (Some(unit), true) => match write_unit(&config.root, unit) {
            Ok(wrote) => wrote,
            Err(err) => return GenerateResult::failed(err, units_scanned),
        },
        _ => false,
    };

    let entries = plan
        .entries
        .iter()
        .map(|e| EntrySummary {
            priority: e.priority,
            qualified_name: e.qualified_name.clone(),
            unit: e.unit.to_string_lossy().to_string(),
        })
        .collect();

    GenerateResult {
        generated: plan.generated,
        entries,
        units_scanned,
        candidates_found: plan.candidates_found,
        wrote_output,
        skipped: false,
        skip_reason: None,
        has_errors: false,
        errors: vec![],
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// JSON / NAPI BOUNDARY
// ═══════════════════════════════════════════════════════════════════════════════

/// JSON-in/JSON-out entry point for hosts without the N-API bridge.
pub fn generate_startup_from_json(options: serde_json::Value) -> serde_json::Value {
    let options: GenerateOptions = match serde_json::from_value(options) {
        Ok(options) => options,
        Err(e) => {
            let err = GeneratorError::new(
                ERR_OPTIONS_INVALID,
                &format!("Options did not deserialize: {}", e),
                "<options>",
                0,
                0,
            );
            return serde_json::to_value(GenerateResult::failed(err, 0))
                .unwrap_or(serde_json::Value::Null);
        }
    };
    serde_json::to_value(generate_startup_internal(&options)).unwrap_or(serde_json::Value::Null)
}

#[cfg(feature = "napi")]
#[napi]
pub fn generate_startup_native(options: serde_json::Value) -> serde_json::Value {
    generate_startup_from_json(options)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicU32, Ordering};

    static DIR_SEQ: AtomicU32 = AtomicU32::new(0);

    const MARKER_SRC: &str = "export function Startup(priority = 0) {\n\
                              \x20 return (_target, _key, _desc) => {};\n\
                              }\n";

    fn temp_project(tag: &str) -> PathBuf {
        let seq = DIR_SEQ.fetch_add(1, Ordering::SeqCst);
        let root = std::env::temp_dir().join(format!(
            "ignition-pipeline-{}-{}-{}",
            tag,
            std::process::id(),
            seq
        ));
        fs::create_dir_all(root.join("src")).unwrap();
        root
    }

    fn options_for(root: &std::path::Path) -> GenerateOptions {
        GenerateOptions {
            root_dir: root.to_string_lossy().to_string(),
            ..GenerateOptions::default()
        }
    }

    #[test]
    fn test_full_generation_round_trip() {
        let root = temp_project("round");
        fs::write(root.join("startup.ts"), MARKER_SRC).unwrap();
        fs::write(
            root.join("src/app.ts"),
            "import { Startup } from '../startup';\n\
             export class App {\n  @Startup(-1)\n  static init() {}\n}\n",
        )
        .unwrap();

        let result = generate_startup_internal(&options_for(&root));
        assert!(!result.has_errors, "errors: {:?}", result.errors);
        assert!(!result.skipped);
        assert_eq!(result.candidates_found, 1);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].qualified_name, "App.init");
        assert!(result.wrote_output);
        assert!(root.join("startup.generated.ts").exists());

        // Second run over unchanged sources: same plan, no rewrite.
        let again = generate_startup_internal(&options_for(&root));
        assert!(!again.has_errors);
        assert!(!again.wrote_output);
        assert_eq!(
            again.generated.as_ref().map(|u| u.code.clone()),
            result.generated.as_ref().map(|u| u.code.clone())
        );

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_non_build_command_is_inert() {
        let root = temp_project("inert");
        fs::write(root.join("startup.ts"), MARKER_SRC).unwrap();

        let options = GenerateOptions {
            command: "serve".to_string(),
            ..options_for(&root)
        };
        let result = generate_startup_internal(&options);
        assert!(result.skipped);
        assert!(!result.has_errors);
        assert!(result.generated.is_none());
        assert!(!root.join("startup.generated.ts").exists());

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_marker_is_silent_noop() {
        let root = temp_project("nomarker");
        fs::write(
            root.join("src/app.ts"),
            "export class App { static init() {} }\n",
        )
        .unwrap();

        let result = generate_startup_internal(&options_for(&root));
        assert!(result.skipped);
        assert!(!result.has_errors);
        assert!(result.generated.is_none());

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_invalid_options_json_reports_error() {
        let result = generate_startup_from_json(serde_json::json!({ "write": "yes" }));
        assert_eq!(result["hasErrors"], serde_json::json!(true));
        assert_eq!(result["errors"][0]["code"], serde_json::json!(ERR_OPTIONS_INVALID));
    }

    #[test]
    fn test_invalid_marker_name_reports_error() {
        let options = GenerateOptions {
            marker_name: "not an ident".to_string(),
            ..GenerateOptions::default()
        };
        let result = generate_startup_internal(&options);
        assert!(result.has_errors);
        assert_eq!(result.errors[0].code, ERR_OPTIONS_INVALID);
    }
}
