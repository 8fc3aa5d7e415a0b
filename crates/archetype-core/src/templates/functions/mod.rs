//! Helper functions callable from templates
//!
//! Helpers are plain function pointers over [`Value`] slices. The registry
//! records each helper's arity so the executor can report argument-count
//! mistakes uniformly, and the parser uses it to reject unknown names.

mod builtins;
mod dicts;
mod encoding;
pub(crate) mod format;
mod lists;
mod logic;
mod math;
mod patterns;
mod strings;
mod system;

use std::collections::HashMap;
use std::fmt;

use crate::templates::value::Value;

pub use strings::CaseTransform;

/// Signature shared by every helper
pub type HelperFn = fn(&[Value]) -> Result<Value, String>;

/// Accepted argument counts for a helper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments
    Exact(usize),
    /// At least this many arguments
    AtLeast(usize),
    /// Between the two bounds, inclusive
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Between(lo, hi) => (lo..=hi).contains(&count),
        }
    }

    /// Error text used when `count` is rejected
    pub(crate) fn mismatch(&self, name: &str, count: usize) -> String {
        match *self {
            Arity::Exact(n) => format!("wrong number of args for {}: want {} got {}", name, n, count),
            Arity::AtLeast(n) => format!(
                "wrong number of args for {}: want at least {} got {}",
                name, n, count
            ),
            Arity::Between(lo, hi) => format!(
                "wrong number of args for {}: want {} to {} got {}",
                name, lo, hi, count
            ),
        }
    }
}

/// A registered helper
#[derive(Clone, Copy)]
pub struct Helper {
    pub arity: Arity,
    pub call: HelperFn,
}

impl fmt::Debug for Helper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Helper").field("arity", &self.arity).finish()
    }
}

/// Name-to-helper table consulted at parse and execution time
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    helpers: HashMap<String, Helper>,
}

impl FunctionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the full helper library installed
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        builtins::register(&mut registry);
        strings::register(&mut registry);
        lists::register(&mut registry);
        dicts::register(&mut registry);
        logic::register(&mut registry);
        math::register(&mut registry);
        encoding::register(&mut registry);
        patterns::register(&mut registry);
        system::register(&mut registry);
        registry
    }

    /// Add or replace a helper.
    pub fn register(&mut self, name: impl Into<String>, arity: Arity, call: HelperFn) {
        self.helpers.insert(name.into(), Helper { arity, call });
    }

    pub fn get(&self, name: &str) -> Option<&Helper> {
        self.helpers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }
}

// Argument coercion shared by the helper modules.

pub(crate) fn string_arg(args: &[Value], index: usize) -> Result<&str, String> {
    match &args[index] {
        Value::String(s) => Ok(s),
        other => Err(format!(
            "wrong type for value; expected string; got {}",
            other.type_name()
        )),
    }
}

pub(crate) fn int_arg(args: &[Value], index: usize) -> Result<i64, String> {
    match &args[index] {
        Value::Int(i) => Ok(*i),
        Value::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
        other => Err(format!(
            "wrong type for value; expected int; got {}",
            other.type_name()
        )),
    }
}

pub(crate) fn bool_arg(args: &[Value], index: usize) -> Result<bool, String> {
    match &args[index] {
        Value::Bool(b) => Ok(*b),
        other => Err(format!(
            "wrong type for value; expected bool; got {}",
            other.type_name()
        )),
    }
}

pub(crate) fn list_arg<'v>(args: &'v [Value], index: usize, helper: &str) -> Result<&'v [Value], String> {
    match &args[index] {
        Value::List(items) => Ok(items),
        other => Err(format!(
            "Cannot {} on type {}",
            helper,
            other.type_name()
        )),
    }
}

pub(crate) fn map_arg<'v>(
    args: &'v [Value],
    index: usize,
) -> Result<&'v std::collections::BTreeMap<String, Value>, String> {
    match &args[index] {
        Value::Map(map) => Ok(map),
        other => Err(format!(
            "wrong type for value; expected map[string]interface {{}}; got {}",
            other.type_name()
        )),
    }
}

/// Lenient string conversion: strings pass through, everything else is
/// formatted with `%v`.
pub(crate) fn to_string(value: &Value) -> String {
    value.to_display_string()
}

/// Lenient integer conversion; unparseable input becomes zero.
pub(crate) fn to_int64(value: &Value) -> i64 {
    match value {
        Value::Int(i) => *i,
        Value::Float(f) => *f as i64,
        Value::Bool(b) => i64::from(*b),
        Value::String(s) => parse_int_literal(s.trim()).unwrap_or(0),
        _ => 0,
    }
}

/// Lenient float conversion; unparseable input becomes zero.
pub(crate) fn to_float64(value: &Value) -> f64 {
    match value {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn parse_int_literal(s: &str) -> Option<i64> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let magnitude = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else if body.len() > 1 && body.starts_with('0') {
        i64::from_str_radix(body.trim_start_matches(['0', 'o', 'O']), 8).ok()?
    } else {
        body.parse().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Flatten a value into strings the way `join` and friends expect:
/// lists yield their non-nil elements, scalars yield themselves.
pub(crate) fn to_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::List(items) => items
            .iter()
            .filter(|v| !v.is_nil())
            .map(to_string)
            .collect(),
        Value::Nil => Vec::new(),
        other => vec![to_string(other)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_has_core_helpers() {
        let registry = FunctionRegistry::builtin();
        for name in ["and", "printf", "default", "quote", "toJson", "regexMatch", "env"] {
            assert!(registry.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_arity_messages() {
        assert_eq!(
            Arity::Exact(1).mismatch("upper", 2),
            "wrong number of args for upper: want 1 got 2"
        );
        assert!(Arity::AtLeast(1).accepts(3));
        assert!(!Arity::Between(1, 2).accepts(3));
    }

    #[test]
    fn test_lenient_conversions() {
        assert_eq!(to_int64(&Value::from("42")), 42);
        assert_eq!(to_int64(&Value::from("0x10")), 16);
        assert_eq!(to_int64(&Value::from("nope")), 0);
        assert_eq!(to_int64(&Value::Float(2.9)), 2);
        assert_eq!(to_float64(&Value::from("1.5")), 1.5);
    }

    #[test]
    fn test_string_list() {
        let list = Value::List(vec![Value::from("a"), Value::Nil, Value::Int(1)]);
        assert_eq!(to_string_list(&list), vec!["a", "1"]);
        assert_eq!(to_string_list(&Value::from("x")), vec!["x"]);
    }
}
