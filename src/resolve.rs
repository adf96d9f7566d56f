//! Symbol resolution for the ignition generator.
//!
//! Confirms that a candidate's decorator actually refers to the registered
//! startup marker, by identity rather than by spelling: the decorator's
//! root identifier must be a value import whose specifier resolves to the
//! marker's defining unit. Decorator expressions evaluate in module scope,
//! so a unit's module-scope binding table is the exact resolution context;
//! tables are cached per unit for the duration of one pipeline run.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPattern, Declaration, Expression, ImportDeclarationSpecifier, ImportOrExportKind,
    ModuleExportName, Statement,
};
use oxc_parser::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::discovery::SourceUnit;
use crate::scan::{source_type_for, DecoratorUse, ExportKind, SyntacticCandidate};
use crate::validate::{GeneratorError, ERR_MARKER_CORRUPT, ERR_MARKER_REPEATED};

// ═══════════════════════════════════════════════════════════════════════════════
// PATH IDENTITY
// ═══════════════════════════════════════════════════════════════════════════════

const SOURCE_EXTENSIONS: [&str; 6] = ["ts", "tsx", "mts", "js", "jsx", "mjs"];

/// Lexical normalization: resolves `.` and `..` without touching the
/// filesystem, so identity comparison works on in-memory unit sets too.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

pub(crate) fn strip_source_ext(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if SOURCE_EXTENSIONS.contains(&ext) => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}

/// Resolve a relative import specifier against the importing unit's
/// directory, to an extension-stripped identity key. Bare (package)
/// specifiers have no unit inside the compilation set and never match.
fn resolve_specifier(unit: &Path, specifier: &str) -> Option<PathBuf> {
    if !specifier.starts_with("./") && !specifier.starts_with("../") {
        return None;
    }
    let dir = unit.parent().unwrap_or_else(|| Path::new(""));
    Some(strip_source_ext(&normalize_path(&dir.join(specifier))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// MARKER DEFINITION
// ═══════════════════════════════════════════════════════════════════════════════

/// The registered startup marker: identity is (defining unit, export name),
/// never display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerDefinition {
    pub unit: PathBuf,
    /// Normalized, extension-stripped identity key of the defining unit.
    pub key: PathBuf,
    pub export_name: String,
}

impl MarkerDefinition {
    /// The canonical export and its `Attribute`-suffixed alias share the
    /// marker's identity.
    pub fn accepts_name(&self, name: &str) -> bool {
        name == self.export_name || name == format!("{}Attribute", self.export_name)
    }
}

fn callable_param_count_ok(count: usize) -> bool {
    count <= 1
}

/// Locate the marker's defining unit and validate the export's shape.
///
/// - Unit or canonical export missing: `Ok(None)` — the pipeline has
///   nothing to order (configuration error, handled silently upstream).
/// - Export present but not a callable with at most one parameter: the
///   pass fails hard; priority extraction could not proceed safely.
pub fn locate_marker(
    units: &[SourceUnit],
    root: &Path,
    marker_module: &str,
    marker_name: &str,
) -> Result<Option<MarkerDefinition>, GeneratorError> {
    let key = strip_source_ext(&normalize_path(&root.join(marker_module)));

    let defining = units
        .iter()
        .find(|u| strip_source_ext(&normalize_path(&u.path)) == key);
    let defining = match defining {
        Some(unit) => unit,
        None => return Ok(None),
    };
    let file = defining.path.to_string_lossy().to_string();

    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, &defining.source, source_type_for(&defining.path)).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return Err(GeneratorError::new(
            ERR_MARKER_CORRUPT,
            &format!("Marker module {:?} has parse errors.", defining.path),
            &file,
            0,
            0,
        ));
    }

    for stmt in &ret.program.body {
        let decl = match stmt {
            Statement::ExportNamedDeclaration(export) => match &export.declaration {
                Some(decl) => decl,
                None => continue,
            },
            _ => continue,
        };

        match decl {
            Declaration::FunctionDeclaration(func) => {
                let name = match &func.id {
                    Some(id) => id.name.as_str(),
                    None => continue,
                };
                if name != marker_name {
                    continue;
                }
                if !callable_param_count_ok(func.params.items.len()) {
                    return Err(marker_shape_error(marker_name, &file, "extra parameters"));
                }
                return Ok(Some(MarkerDefinition {
                    unit: defining.path.clone(),
                    key,
                    export_name: marker_name.to_string(),
                }));
            }
            Declaration::VariableDeclaration(var) => {
                for declarator in &var.declarations {
                    let id = match &declarator.id {
                        BindingPattern::BindingIdentifier(id) => id,
                        _ => continue,
                    };
                    if id.name.as_str() != marker_name {
                        continue;
                    }
                    let ok = match &declarator.init {
                        Some(Expression::ArrowFunctionExpression(arrow)) => {
                            callable_param_count_ok(arrow.params.items.len())
                        }
                        Some(Expression::FunctionExpression(func)) => {
                            callable_param_count_ok(func.params.items.len())
                        }
                        _ => false,
                    };
                    if !ok {
                        return Err(marker_shape_error(marker_name, &file, "not a callable"));
                    }
                    return Ok(Some(MarkerDefinition {
                        unit: defining.path.clone(),
                        key,
                        export_name: marker_name.to_string(),
                    }));
                }
            }
            Declaration::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    if id.name.as_str() == marker_name {
                        return Err(marker_shape_error(marker_name, &file, "a class"));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(None)
}

fn marker_shape_error(marker_name: &str, file: &str, detail: &str) -> GeneratorError {
    GeneratorError::with_details(
        ERR_MARKER_CORRUPT,
        &format!(
            "Marker export '{}' exists but is structurally unusable ({}).",
            marker_name, detail
        ),
        file,
        0,
        0,
        None,
        vec![format!(
            "Declare the marker as `export function {}(priority = 0) {{ … }}`.",
            marker_name
        )],
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODULE-SCOPE BINDING TABLES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    ImportNamed { source: String, imported: String },
    ImportDefault { source: String },
    ImportNamespace { source: String },
    Local,
}

#[derive(Debug, Default)]
pub struct UnitBindings {
    map: HashMap<String, Binding>,
}

impl UnitBindings {
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.map.get(name)
    }
}

fn export_name_text(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::IdentifierName(id) => id.name.to_string(),
        ModuleExportName::IdentifierReference(id) => id.name.to_string(),
        ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
    }
}

fn collect_declaration_bindings(decl: &Declaration, map: &mut HashMap<String, Binding>) {
    match decl {
        Declaration::ClassDeclaration(class) => {
            if let Some(id) = &class.id {
                map.insert(id.name.to_string(), Binding::Local);
            }
        }
        Declaration::FunctionDeclaration(func) => {
            if let Some(id) = &func.id {
                map.insert(id.name.to_string(), Binding::Local);
            }
        }
        Declaration::VariableDeclaration(var) => {
            for declarator in &var.declarations {
                if let BindingPattern::BindingIdentifier(id) = &declarator.id {
                    map.insert(id.name.to_string(), Binding::Local);
                }
            }
        }
        Declaration::TSEnumDeclaration(decl) => {
            map.insert(decl.id.name.to_string(), Binding::Local);
        }
        _ => {}
    }
}

/// Build a unit's module-scope binding table. Type-only imports carry no
/// runtime value and are not bindings here.
fn build_unit_bindings(unit: &SourceUnit) -> UnitBindings {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, &unit.source, source_type_for(&unit.path)).parse();
    if ret.panicked {
        return UnitBindings::default();
    }

    let mut map = HashMap::new();
    for stmt in &ret.program.body {
        match stmt {
            Statement::ImportDeclaration(import) => {
                if matches!(import.import_kind, ImportOrExportKind::Type) {
                    continue;
                }
                let source = import.source.value.to_string();
                let specifiers = match &import.specifiers {
                    Some(specifiers) => specifiers,
                    None => continue,
                };
                for specifier in specifiers {
                    match specifier {
                        ImportDeclarationSpecifier::ImportSpecifier(spec) => {
                            if matches!(spec.import_kind, ImportOrExportKind::Type) {
                                continue;
                            }
                            map.insert(
                                spec.local.name.to_string(),
                                Binding::ImportNamed {
                                    source: source.clone(),
                                    imported: export_name_text(&spec.imported),
                                },
                            );
                        }
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(spec) => {
                            map.insert(
                                spec.local.name.to_string(),
                                Binding::ImportDefault {
                                    source: source.clone(),
                                },
                            );
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(spec) => {
                            map.insert(
                                spec.local.name.to_string(),
                                Binding::ImportNamespace {
                                    source: source.clone(),
                                },
                            );
                        }
                    }
                }
            }
            Statement::ExportNamedDeclaration(export) => {
                if let Some(decl) = &export.declaration {
                    collect_declaration_bindings(decl, &mut map);
                }
            }
            Statement::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    map.insert(id.name.to_string(), Binding::Local);
                }
            }
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    map.insert(id.name.to_string(), Binding::Local);
                }
            }
            Statement::VariableDeclaration(var) => {
                for declarator in &var.declarations {
                    if let BindingPattern::BindingIdentifier(id) = &declarator.id {
                        map.insert(id.name.to_string(), Binding::Local);
                    }
                }
            }
            Statement::TSEnumDeclaration(decl) => {
                map.insert(decl.id.name.to_string(), Binding::Local);
            }
            _ => {}
        }
    }

    UnitBindings { map }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLVED CANDIDATES
// ═══════════════════════════════════════════════════════════════════════════════

/// A candidate confirmed to carry the true marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCandidate {
    pub unit: PathBuf,
    pub class_name: String,
    pub method_name: String,
    pub export: ExportKind,
    pub qualified_name: String,
    pub marker: DecoratorUse,
    pub discovery_seq: u32,
    pub location: crate::validate::SourceLocation,
}

pub struct Resolver<'a> {
    marker: &'a MarkerDefinition,
    units: HashMap<PathBuf, &'a SourceUnit>,
    cache: HashMap<PathBuf, UnitBindings>,
}

impl<'a> Resolver<'a> {
    /// A resolver (and its cache) lives for exactly one pipeline run.
    pub fn new(units: &'a [SourceUnit], marker: &'a MarkerDefinition) -> Self {
        Resolver {
            marker,
            units: units.iter().map(|u| (u.path.clone(), u)).collect(),
            cache: HashMap::new(),
        }
    }

    fn bindings_for(&mut self, unit_path: &Path) -> &UnitBindings {
        if !self.cache.contains_key(unit_path) {
            let built = self
                .units
                .get(unit_path)
                .map(|u| build_unit_bindings(u))
                .unwrap_or_default();
            self.cache.insert(unit_path.to_path_buf(), built);
        }
        &self.cache[unit_path]
    }

    /// Units whose binding table has been computed so far.
    pub fn cached_units(&self) -> usize {
        self.cache.len()
    }

    /// Resolve one candidate. `Ok(None)` means every marker-named decorator
    /// on it was a lookalike; more than one confirmed marker is rejected
    /// explicitly.
    pub fn resolve(
        &mut self,
        candidate: &SyntacticCandidate,
    ) -> Result<Option<ResolvedCandidate>, GeneratorError> {
        let marker = self.marker;
        let unit_path = candidate.unit.clone();
        let bindings = self.bindings_for(&unit_path);

        let confirmed: Vec<&DecoratorUse> = candidate
            .markers
            .iter()
            .filter(|m| is_marker_use(m, bindings, marker, &unit_path))
            .collect();

        match confirmed.len() {
            0 => Ok(None),
            1 => Ok(Some(ResolvedCandidate {
                unit: candidate.unit.clone(),
                class_name: candidate.class_name.clone(),
                method_name: candidate.method_name.clone(),
                export: candidate.export,
                qualified_name: format!("{}.{}", candidate.class_name, candidate.method_name),
                marker: confirmed[0].clone(),
                discovery_seq: candidate.discovery_seq,
                location: candidate.location.clone(),
            })),
            n => Err(GeneratorError::new(
                ERR_MARKER_REPEATED,
                &format!(
                    "{}.{} carries the startup marker {} times; it may appear once.",
                    candidate.class_name, candidate.method_name, n
                ),
                &candidate.unit.to_string_lossy(),
                candidate.location.line,
                candidate.location.column,
            )),
        }
    }

    /// Resolve the full candidate list, preserving discovery order.
    pub fn resolve_all(
        &mut self,
        candidates: &[SyntacticCandidate],
    ) -> Result<Vec<ResolvedCandidate>, GeneratorError> {
        let mut resolved = Vec::new();
        for candidate in candidates {
            if let Some(r) = self.resolve(candidate)? {
                resolved.push(r);
            }
        }
        Ok(resolved)
    }
}

fn is_marker_use(
    usage: &DecoratorUse,
    bindings: &UnitBindings,
    marker: &MarkerDefinition,
    unit_path: &Path,
) -> bool {
    let root = match usage.path.first() {
        Some(root) => root,
        None => return false,
    };

    match bindings.get(root) {
        Some(Binding::ImportNamed { source, imported }) => {
            usage.path.len() == 1
                && marker.accepts_name(imported)
                && resolve_specifier(unit_path, source)
                    .map_or(false, |key| key == marker.key)
        }
        Some(Binding::ImportNamespace { source }) => {
            usage.path.len() == 2
                && marker.accepts_name(&usage.path[1])
                && resolve_specifier(unit_path, source)
                    .map_or(false, |key| key == marker.key)
        }
        // A local declaration, a default import, or an unresolved name is
        // some other construct that happens to share the spelling.
        _ => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
