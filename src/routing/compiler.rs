//! Pattern compilation.
//!
//! Turns a route's `{placeholder}` pattern into the form stored in the route
//! table: a fit bitmask, a wildcard outline used as the lookup key, and an
//! anchored regex that confirms a full match and extracts placeholder values.
//!
//! # Rules
//! - A segment containing any `{name}` is a wildcard segment (bit 0, `%`)
//! - A literal segment contributes a 1 bit; the first segment is the high bit
//! - Trailing whole-segment placeholders with a default are optional and do
//!   not count towards fit, outline or `num_parts`
//! - The first required segment must be literal: candidate outlines always
//!   keep the leading path segment, so `/%/...` could never be looked up
//! - A requirement keyed by a placeholder name constrains that placeholder;
//!   keys starting with `_` never do

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::outline::normalize_path;
use crate::routing::route::Route;

/// Maximum number of outline segments a compiled route may have.
pub const MAX_PARTS: usize = 9;

/// Marker used for placeholder segments in outlines.
pub const WILDCARD: &str = "%";

const DEFAULT_CONSTRAINT: &str = "[^/]+";

/// A pattern the compiler cannot accept.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("Malformed pattern '{pattern}': unbalanced braces")]
    UnbalancedBraces { pattern: String },

    #[error("Malformed pattern '{pattern}': invalid placeholder name '{name}'")]
    InvalidPlaceholder { pattern: String, name: String },

    #[error("Malformed pattern '{pattern}': placeholder '{name}' used more than once")]
    DuplicatePlaceholder { pattern: String, name: String },

    #[error("Malformed pattern '{pattern}': {parts} segments exceed the maximum of {max}")]
    TooManyParts { pattern: String, parts: usize, max: usize },

    #[error("Malformed pattern '{pattern}': invalid constraint: {reason}")]
    InvalidConstraint { pattern: String, reason: String },

    #[error("Malformed pattern '{pattern}': the first segment must be literal")]
    LeadingPlaceholder { pattern: String },
}

/// Result type for pattern compilation.
pub type PatternResult<T> = Result<T, PatternError>;

/// Derived, persisted representation of a route pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledRoute {
    /// One bit per outline segment, 1 = literal.
    pub fit: u32,
    /// Pattern with placeholder segments replaced by `%`.
    pub pattern_outline: String,
    /// Number of outline segments.
    pub num_parts: usize,
    /// Anchored regex over the slash-joined path segments.
    #[serde(with = "regex_source")]
    pub regex: Regex,
    /// Placeholder names in pattern order.
    pub variables: Vec<String>,
}

impl CompiledRoute {
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(subject(&normalize_path(path)))
    }

    /// Placeholder values captured from `path`, or `None` on mismatch.
    pub fn captures(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let normalized = normalize_path(path);
        let caps = self.regex.captures(subject(&normalized))?;
        let values = self
            .variables
            .iter()
            .filter_map(|name| caps.name(name).map(|m| (name.clone(), m.as_str().to_string())))
            .collect();
        Some(values)
    }
}

impl PartialEq for CompiledRoute {
    fn eq(&self, other: &Self) -> bool {
        self.fit == other.fit
            && self.pattern_outline == other.pattern_outline
            && self.num_parts == other.num_parts
            && self.regex.as_str() == other.regex.as_str()
            && self.variables == other.variables
    }
}

fn subject(normalized: &str) -> &str {
    normalized.trim_start_matches('/')
}

/// Compiles route patterns. Must be deterministic and side-effect free.
pub trait PatternCompiler: Send + Sync + fmt::Debug {
    fn compile(&self, route: &Route) -> PatternResult<CompiledRoute>;
}

/// The stock `{placeholder}` compiler.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathPatternCompiler;

impl PatternCompiler for PathPatternCompiler {
    fn compile(&self, route: &Route) -> PatternResult<CompiledRoute> {
        compile_pattern(&route.pattern, &route.requirements, &route.defaults)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece<'a> {
    Text(&'a str),
    Var(&'a str),
}

/// Compile a pattern with its placeholder constraints and defaults.
pub fn compile_pattern(
    pattern: &str,
    requirements: &BTreeMap<String, String>,
    defaults: &BTreeMap<String, String>,
) -> PatternResult<CompiledRoute> {
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let parsed = segments
        .iter()
        .map(|segment| parse_segment(segment, pattern))
        .collect::<PatternResult<Vec<_>>>()?;

    let mut variables: Vec<String> = Vec::new();
    for piece in parsed.iter().flatten() {
        if let Piece::Var(name) = piece {
            if variables.iter().any(|v| v == name) {
                return Err(PatternError::DuplicatePlaceholder {
                    pattern: pattern.to_string(),
                    name: name.to_string(),
                });
            }
            variables.push(name.to_string());
        }
    }

    // Trailing placeholders with defaults may be left off the path.
    let mut required = parsed.len();
    while required > 0 {
        match parsed[required - 1].as_slice() {
            [Piece::Var(name)] if defaults.contains_key(*name) => required -= 1,
            _ => break,
        }
    }

    if required > 0 && !is_literal(&parsed[0]) {
        return Err(PatternError::LeadingPlaceholder {
            pattern: pattern.to_string(),
        });
    }

    if required > MAX_PARTS {
        return Err(PatternError::TooManyParts {
            pattern: pattern.to_string(),
            parts: required,
            max: MAX_PARTS,
        });
    }

    let mut fit = 0u32;
    let mut outline = Vec::with_capacity(required);
    for (segment, pieces) in segments.iter().zip(&parsed).take(required) {
        fit <<= 1;
        if is_literal(pieces) {
            fit |= 1;
            outline.push(*segment);
        } else {
            outline.push(WILDCARD);
        }
    }

    let mut source = String::from("^");
    for (i, pieces) in parsed[..required].iter().enumerate() {
        if i > 0 {
            source.push('/');
        }
        push_segment(&mut source, pieces, requirements);
    }
    let optional = &parsed[required..];
    for (i, pieces) in optional.iter().enumerate() {
        source.push_str("(?:");
        if required > 0 || i > 0 {
            source.push('/');
        }
        push_segment(&mut source, pieces, requirements);
    }
    for _ in optional {
        source.push_str(")?");
    }
    source.push('$');

    let regex = Regex::new(&source).map_err(|e| PatternError::InvalidConstraint {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    Ok(CompiledRoute {
        fit,
        pattern_outline: format!("/{}", outline.join("/")),
        num_parts: required,
        regex,
        variables,
    })
}

fn parse_segment<'a>(segment: &'a str, pattern: &str) -> PatternResult<Vec<Piece<'a>>> {
    let unbalanced = || PatternError::UnbalancedBraces {
        pattern: pattern.to_string(),
    };

    let mut pieces = Vec::new();
    let mut rest = segment;
    while !rest.is_empty() {
        let Some(open) = rest.find(|c: char| c == '{' || c == '}') else {
            pieces.push(Piece::Text(rest));
            break;
        };
        if rest.as_bytes()[open] == b'}' {
            return Err(unbalanced());
        }
        if open > 0 {
            pieces.push(Piece::Text(&rest[..open]));
        }
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(unbalanced)?;
        let name = &after[..close];
        if name.contains('{') {
            return Err(unbalanced());
        }
        if !is_valid_name(name) {
            return Err(PatternError::InvalidPlaceholder {
                pattern: pattern.to_string(),
                name: name.to_string(),
            });
        }
        pieces.push(Piece::Var(name));
        rest = &after[close + 1..];
    }
    Ok(pieces)
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_literal(pieces: &[Piece<'_>]) -> bool {
    pieces.iter().all(|p| matches!(p, Piece::Text(_)))
}

fn push_segment(source: &mut String, pieces: &[Piece<'_>], requirements: &BTreeMap<String, String>) {
    for piece in pieces {
        match piece {
            Piece::Text(text) => source.push_str(&regex::escape(text)),
            Piece::Var(name) => {
                source.push_str("(?P<");
                source.push_str(name);
                source.push('>');
                source.push_str(constraint(requirements, name));
                source.push(')');
            }
        }
    }
}

fn constraint<'r>(requirements: &'r BTreeMap<String, String>, name: &str) -> &'r str {
    if name.starts_with('_') {
        return DEFAULT_CONSTRAINT;
    }
    match requirements.get(name) {
        Some(value) => {
            let value = value.strip_prefix('^').unwrap_or(value);
            value.strip_suffix('$').unwrap_or(value)
        }
        None => DEFAULT_CONSTRAINT,
    }
}

mod regex_source {
    use regex::Regex;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(regex: &Regex, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(regex.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Regex, D::Error> {
        let source = String::deserialize(deserializer)?;
        Regex::new(&source).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(pattern: &str) -> CompiledRoute {
        PathPatternCompiler.compile(&Route::new("test", pattern)).unwrap()
    }

    #[test]
    fn test_fit_and_outline() {
        let compiled = compile("/node/{nid}/edit");
        assert_eq!(compiled.fit, 0b101);
        assert_eq!(compiled.pattern_outline, "/node/%/edit");
        assert_eq!(compiled.num_parts, 3);
        assert_eq!(compiled.variables, vec!["nid".to_string()]);
    }

    #[test]
    fn test_same_shape_same_key() {
        let a = compile("/user/{uid}/contact");
        let b = compile("user/{account}/contact/");
        assert_eq!(a.fit, b.fit);
        assert_eq!(a.pattern_outline, b.pattern_outline);
    }

    #[test]
    fn test_literal_segment_increases_fit() {
        let wild = compile("/node/{nid}/{op}");
        let literal = compile("/node/{nid}/edit");
        let more = compile("/node/add/edit");
        assert!(literal.fit > wild.fit);
        assert!(more.fit > literal.fit);
        assert_eq!(more.fit.count_ones(), 3);
    }

    #[test]
    fn test_mixed_segment_is_wildcard() {
        let compiled = compile("/files/report-{id}.pdf");
        assert_eq!(compiled.pattern_outline, "/files/%");
        assert_eq!(compiled.fit, 0b10);
        let params = compiled.captures("/files/report-7.pdf").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("7"));
        assert!(!compiled.is_match("/files/summary-7.pdf"));
    }

    #[test]
    fn test_root_pattern() {
        let compiled = compile("/");
        assert_eq!(compiled.pattern_outline, "/");
        assert_eq!(compiled.fit, 0);
        assert_eq!(compiled.num_parts, 0);
        assert!(compiled.is_match("/"));
        assert!(!compiled.is_match("/anything"));
    }

    #[test]
    fn test_constraint_rejects_non_matching_value() {
        let route = Route::new("node.view", "/node/{nid}").with_requirement("nid", "^\\d+$");
        let compiled = PathPatternCompiler.compile(&route).unwrap();
        assert!(compiled.is_match("/node/42"));
        assert!(!compiled.is_match("/node/abc"));
    }

    #[test]
    fn test_underscore_requirement_is_not_a_constraint() {
        let route = Route::new("x", "/x/{_format}").with_requirement("_format", "json");
        let compiled = PathPatternCompiler.compile(&route).unwrap();
        assert!(compiled.is_match("/x/xml"));
    }

    #[test]
    fn test_trailing_defaults_are_optional() {
        let route = Route::new("node.page", "/node/{nid}/{op}").with_default("op", "view");
        let compiled = PathPatternCompiler.compile(&route).unwrap();
        assert_eq!(compiled.pattern_outline, "/node/%");
        assert_eq!(compiled.num_parts, 2);
        assert!(compiled.is_match("/node/3"));
        assert!(compiled.is_match("/node/3/edit"));
        assert!(!compiled.is_match("/node/3/edit/more"));

        let params = route_with(compiled, route).parameters("/node/3").unwrap();
        assert_eq!(params.get("op").map(String::as_str), Some("view"));
    }

    fn route_with(compiled: CompiledRoute, mut route: Route) -> Route {
        route.compiled = Some(compiled);
        route
    }

    #[test]
    fn test_all_optional_pattern() {
        let route = Route::new("front", "/{page}").with_default("page", "home");
        let compiled = PathPatternCompiler.compile(&route).unwrap();
        assert_eq!(compiled.pattern_outline, "/");
        assert!(compiled.is_match("/"));
        assert!(compiled.is_match("/about"));
    }

    #[test]
    fn test_malformed_patterns() {
        let cases = [
            "/node/{nid",
            "/node/nid}",
            "/node/{n{id}}",
        ];
        for pattern in cases {
            let err = PathPatternCompiler.compile(&Route::new("bad", pattern)).unwrap_err();
            assert!(matches!(err, PatternError::UnbalancedBraces { .. }), "{pattern}");
        }

        let err = PathPatternCompiler.compile(&Route::new("bad", "/a/{1x}")).unwrap_err();
        assert!(matches!(err, PatternError::InvalidPlaceholder { .. }));

        let err = PathPatternCompiler.compile(&Route::new("bad", "/a/{x}/{x}")).unwrap_err();
        assert!(matches!(err, PatternError::DuplicatePlaceholder { .. }));

        let err = PathPatternCompiler
            .compile(&Route::new("bad", "/a/b/c/d/e/f/g/h/i/j"))
            .unwrap_err();
        assert_eq!(
            err,
            PatternError::TooManyParts {
                pattern: "/a/b/c/d/e/f/g/h/i/j".into(),
                parts: 10,
                max: MAX_PARTS
            }
        );

        for pattern in ["/{slug}", "/{lang}/about", "/v{version}/api"] {
            let err = PathPatternCompiler.compile(&Route::new("bad", pattern)).unwrap_err();
            assert_eq!(err, PatternError::LeadingPlaceholder { pattern: pattern.into() });
        }

        let route = Route::new("bad", "/a/{x}").with_requirement("x", "(");
        let err = PathPatternCompiler.compile(&route).unwrap_err();
        assert!(matches!(err, PatternError::InvalidConstraint { .. }));
        assert!(err.to_string().starts_with("Malformed pattern '/a/{x}'"));
    }

    #[test]
    fn test_compiled_route_survives_serialization() {
        let compiled = compile("/taxonomy/term/{tid}");
        let json = serde_json::to_string(&compiled).unwrap();
        let restored: CompiledRoute = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, compiled);
        assert!(restored.is_match("/taxonomy/term/9"));
    }
}
