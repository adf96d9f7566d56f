//! Candidate scanner for the ignition generator.
//!
//! Parses each discovered unit with oxc and collects the static class
//! methods that syntactically carry the startup marker. This stage filters
//! on shape and spelling only; semantic confirmation is the resolver's job.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, Class, ClassElement, Declaration, ExportDefaultDeclarationKind, Expression,
    MethodDefinitionKind, PropertyKey, Statement,
};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use oxc_syntax::operator::UnaryOperator;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::discovery::SourceUnit;
use crate::validate::{offset_to_location, SourceLocation};

// ═══════════════════════════════════════════════════════════════════════════════
// CANDIDATE TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// How the enclosing class leaves its unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportKind {
    Named,
    Default,
}

/// One argument of a marker decorator, reduced to what the extractor needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecoratorArgValue {
    Int(i32),
    Unsupported(String),
}

/// One syntactic use of a marker-named decorator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoratorUse {
    /// Dotted path as written, e.g. `["Startup"]` or `["boot", "Startup"]`.
    pub path: Vec<String>,
    /// Whether the decorator was a call (`@Startup(…)`) or bare (`@Startup`).
    pub called: bool,
    pub args: Vec<DecoratorArgValue>,
    pub location: SourceLocation,
}

/// A static method that syntactically carries the marker. Created by the
/// scanner, consumed by the resolver, discarded after resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntacticCandidate {
    pub unit: std::path::PathBuf,
    pub class_name: String,
    pub method_name: String,
    pub export: ExportKind,
    /// Every marker-named decorator on the method, in source order.
    pub markers: Vec<DecoratorUse>,
    pub discovery_seq: u32,
    pub location: SourceLocation,
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAME MATCHING
// ═══════════════════════════════════════════════════════════════════════════════

/// Accepts the short name, the `Attribute`-suffixed name, and any dotted
/// path ending in either. Spelling tolerance only; identity is confirmed
/// later against the marker's defining unit.
pub fn matches_marker_name(path: &[String], marker_name: &str) -> bool {
    match path.last() {
        Some(last) => last == marker_name || *last == format!("{}Attribute", marker_name),
        None => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn source_type_for(path: &Path) -> SourceType {
    let base = SourceType::default().with_module(true);
    match path.extension().and_then(|e| e.to_str()) {
        Some("ts") | Some("mts") => base.with_typescript(true),
        Some("tsx") => base.with_typescript(true).with_jsx(true),
        Some("jsx") => base.with_jsx(true),
        _ => base,
    }
}

fn snippet(source: &str, span: Span) -> String {
    let start = (span.start as usize).min(source.len());
    let end = (span.end as usize).min(source.len()).max(start);
    source[start..end].to_string()
}

fn unwrap_parens<'b, 'a>(mut expr: &'b Expression<'a>) -> &'b Expression<'a> {
    while let Expression::ParenthesizedExpression(paren) = expr {
        expr = &paren.expression;
    }
    expr
}

/// Flatten `a.b.C` decorator expressions to their dotted path. Anything
/// other than identifier/member chains (computed access, template calls)
/// is not marker-shaped.
fn decorator_path(expr: &Expression) -> Option<Vec<String>> {
    match expr {
        Expression::Identifier(ident) => Some(vec![ident.name.to_string()]),
        Expression::StaticMemberExpression(member) => {
            let mut path = decorator_path(&member.object)?;
            path.push(member.property.name.to_string());
            Some(path)
        }
        _ => None,
    }
}

fn integer_arg(value: f64, span: Span, source: &str) -> DecoratorArgValue {
    if value.is_finite()
        && value.fract() == 0.0
        && value >= i32::MIN as f64
        && value <= i32::MAX as f64
    {
        DecoratorArgValue::Int(value as i32)
    } else {
        DecoratorArgValue::Unsupported(snippet(source, span))
    }
}

fn argument_value(arg: &Argument, source: &str) -> DecoratorArgValue {
    let expr = match arg.as_expression() {
        Some(expr) => expr,
        None => return DecoratorArgValue::Unsupported(snippet(source, arg.span())),
    };
    let expr = unwrap_parens(expr);
    match expr {
        Expression::NumericLiteral(lit) => integer_arg(lit.value, expr.span(), source),
        Expression::UnaryExpression(unary) if unary.operator == UnaryOperator::UnaryNegation => {
            match unwrap_parens(&unary.argument) {
                Expression::NumericLiteral(lit) => integer_arg(-lit.value, expr.span(), source),
                _ => DecoratorArgValue::Unsupported(snippet(source, expr.span())),
            }
        }
        _ => DecoratorArgValue::Unsupported(snippet(source, expr.span())),
    }
}

fn decorator_use(expr: &Expression, source: &str, marker_name: &str) -> Option<DecoratorUse> {
    let (path, called, args) = match expr {
        Expression::CallExpression(call) => {
            let path = decorator_path(&call.callee)?;
            let args = call
                .arguments
                .iter()
                .map(|arg| argument_value(arg, source))
                .collect();
            (path, true, args)
        }
        other => (decorator_path(other)?, false, vec![]),
    };

    if !matches_marker_name(&path, marker_name) {
        return None;
    }

    Some(DecoratorUse {
        path,
        called,
        args,
        location: offset_to_location(source, expr.span().start),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// CANDIDATE COLLECTION
// ═══════════════════════════════════════════════════════════════════════════════

fn collect_class(
    class: &Class,
    export: ExportKind,
    unit: &SourceUnit,
    marker_name: &str,
    seq: &mut u32,
    out: &mut Vec<SyntacticCandidate>,
) {
    // Anonymous, ambient or generic classes cannot be named and invoked
    // from the generated unit; their members never become candidates.
    let class_name = match &class.id {
        Some(id) if !class.declare && class.type_parameters.is_none() => id.name.to_string(),
        _ => return,
    };

    for element in &class.body.body {
        let method = match element {
            ClassElement::MethodDefinition(method) => method,
            _ => continue,
        };

        if !matches!(method.kind, MethodDefinitionKind::Method) {
            continue;
        }
        if !method.r#static || method.value.type_parameters.is_some() {
            continue;
        }
        let method_name = match &method.key {
            PropertyKey::StaticIdentifier(key) => key.name.to_string(),
            _ => continue,
        };

        let markers: Vec<DecoratorUse> = method
            .decorators
            .iter()
            .filter_map(|d| decorator_use(&d.expression, &unit.source, marker_name))
            .collect();
        if markers.is_empty() {
            continue;
        }

        let location = offset_to_location(&unit.source, method.key.span().start);
        out.push(SyntacticCandidate {
            unit: unit.path.clone(),
            class_name: class_name.clone(),
            method_name,
            export,
            markers,
            discovery_seq: *seq,
            location,
        });
        *seq += 1;
    }
}

/// Scan one unit for syntactic candidates, in natural encounter order.
/// Units oxc cannot parse are logged and skipped; the host compiler owns
/// those diagnostics.
pub fn scan_unit(unit: &SourceUnit, marker_name: &str, seq: &mut u32) -> Vec<SyntacticCandidate> {
    let allocator = Allocator::default();
    let source_type = source_type_for(&unit.path);
    let ret = Parser::new(&allocator, &unit.source, source_type).parse();

    if ret.panicked || !ret.errors.is_empty() {
        eprintln!(
            "[Ignition] Skipping {:?}: {} parse error(s)",
            unit.path,
            ret.errors.len().max(1)
        );
        return vec![];
    }

    let mut out = Vec::new();
    for stmt in &ret.program.body {
        match stmt {
            Statement::ExportNamedDeclaration(export) => {
                if let Some(Declaration::ClassDeclaration(class)) = &export.declaration {
                    collect_class(class, ExportKind::Named, unit, marker_name, seq, &mut out);
                }
            }
            Statement::ExportDefaultDeclaration(export) => {
                if let ExportDefaultDeclarationKind::ClassDeclaration(class) = &export.declaration {
                    collect_class(class, ExportKind::Default, unit, marker_name, seq, &mut out);
                }
            }
            // A non-exported class is invisible to the generated unit.
            _ => {}
        }
    }

    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
