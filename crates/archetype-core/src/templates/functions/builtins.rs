//! Helpers every Go template has: boolean logic, comparison, indexing,
//! printing and escaping.
//!
//! `and` and `or` are registered here for arity checks but the executor
//! evaluates them itself so that they short-circuit.

use crate::templates::functions::format::{sprint, sprintf, sprintln};
use crate::templates::functions::{int_arg, string_arg, Arity, FunctionRegistry};
use crate::templates::value::Value;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register("and", Arity::AtLeast(1), and);
    registry.register("or", Arity::AtLeast(1), or);
    registry.register("not", Arity::Exact(1), not);
    registry.register("len", Arity::Exact(1), len);
    registry.register("index", Arity::AtLeast(1), index);
    registry.register("slice", Arity::AtLeast(1), slice);
    registry.register("print", Arity::AtLeast(0), |args| Ok(Value::String(sprint(args))));
    registry.register("println", Arity::AtLeast(0), |args| {
        Ok(Value::String(sprintln(args)))
    });
    registry.register("printf", Arity::AtLeast(1), printf);
    registry.register("eq", Arity::AtLeast(1), eq);
    registry.register("ne", Arity::Exact(2), ne);
    registry.register("lt", Arity::Exact(2), |args| ordering(args).map(|o| o.is_lt().into()));
    registry.register("le", Arity::Exact(2), |args| ordering(args).map(|o| o.is_le().into()));
    registry.register("gt", Arity::Exact(2), |args| ordering(args).map(|o| o.is_gt().into()));
    registry.register("ge", Arity::Exact(2), |args| ordering(args).map(|o| o.is_ge().into()));
    registry.register("html", Arity::AtLeast(0), |args| {
        Ok(Value::String(html_escape(&joined(args))))
    });
    registry.register("js", Arity::AtLeast(0), |args| {
        Ok(Value::String(js_escape(&joined(args))))
    });
    registry.register("urlquery", Arity::AtLeast(0), |args| {
        Ok(Value::String(query_escape(&joined(args))))
    });
}

fn and(args: &[Value]) -> Result<Value, String> {
    for arg in args {
        if !arg.is_true() {
            return Ok(arg.clone());
        }
    }
    Ok(args.last().cloned().unwrap_or_default())
}

fn or(args: &[Value]) -> Result<Value, String> {
    for arg in args {
        if arg.is_true() {
            return Ok(arg.clone());
        }
    }
    Ok(args.last().cloned().unwrap_or_default())
}

fn not(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Bool(!args[0].is_true()))
}

fn len(args: &[Value]) -> Result<Value, String> {
    let n = match &args[0] {
        Value::String(s) => s.len(),
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        Value::Nil => return Err("len of nil pointer".to_string()),
        other => return Err(format!("len of type {}", other.type_name())),
    };
    Ok(Value::Int(n as i64))
}

fn index(args: &[Value]) -> Result<Value, String> {
    let mut item = args[0].clone();
    for (i, key) in args[1..].iter().enumerate() {
        item = match item {
            Value::List(items) => {
                let idx = int_arg(&args[1..], i)?;
                usize::try_from(idx)
                    .ok()
                    .and_then(|idx| items.into_iter().nth(idx))
                    .ok_or_else(|| format!("index out of range: {}", idx))?
            }
            Value::String(s) => {
                let idx = int_arg(&args[1..], i)?;
                let byte = usize::try_from(idx)
                    .ok()
                    .and_then(|idx| s.as_bytes().get(idx).copied())
                    .ok_or_else(|| format!("index out of range: {}", idx))?;
                Value::Int(i64::from(byte))
            }
            Value::Map(mut map) => match key {
                Value::String(k) => map.remove(k).unwrap_or_default(),
                other => {
                    return Err(format!(
                        "value has type {}; should be string",
                        other.type_name()
                    ))
                }
            },
            Value::Nil => return Err("index of untyped nil".to_string()),
            other => {
                return Err(format!("can't index item of type {}", other.type_name()));
            }
        };
    }
    Ok(item)
}

fn slice(args: &[Value]) -> Result<Value, String> {
    let indexes = args[1..]
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let idx = int_arg(&args[1..], i)?;
            usize::try_from(idx).map_err(|_| format!("index out of range: {}", idx))
        })
        .collect::<Result<Vec<_>, String>>()?;
    if indexes.len() > 3 {
        return Err(format!("too many slice indexes: {}", indexes.len()));
    }
    let check = |len: usize| -> Result<(usize, usize), String> {
        let start = indexes.first().copied().unwrap_or(0);
        let end = indexes.get(1).copied().unwrap_or(len);
        if let Some(&cap) = indexes.get(2) {
            if cap > len {
                return Err(format!("index out of range: {}", cap));
            }
            if end > cap {
                return Err(format!("invalid slice index: {} > {}", end, cap));
            }
        }
        if end > len {
            return Err(format!("index out of range: {}", end));
        }
        if start > end {
            return Err(format!("invalid slice index: {} > {}", start, end));
        }
        Ok((start, end))
    };
    match &args[0] {
        Value::String(s) => {
            if indexes.len() == 3 {
                return Err("cannot 3-index slice a string".to_string());
            }
            let (start, end) = check(s.len())?;
            s.get(start..end)
                .map(Value::from)
                .ok_or_else(|| format!("invalid slice index: {}", start))
        }
        Value::List(items) => {
            let (start, end) = check(items.len())?;
            Ok(Value::List(items[start..end].to_vec()))
        }
        Value::Nil => Err("slice of untyped nil".to_string()),
        other => Err(format!("can't slice item of type {}", other.type_name())),
    }
}

fn printf(args: &[Value]) -> Result<Value, String> {
    let format = string_arg(args, 0)?;
    Ok(Value::String(sprintf(format, &args[1..])))
}

/// Equality of basic values. Integers and floats never compare equal to each other.
pub(crate) fn values_equal(a: &Value, b: &Value) -> Result<bool, String> {
    match (a, b) {
        (Value::List(_) | Value::Map(_), _) | (_, Value::List(_) | Value::Map(_)) => {
            Err("invalid type for comparison".to_string())
        }
        (Value::Nil, Value::Nil) => Ok(true),
        (Value::Nil, _) | (_, Value::Nil) => Ok(false),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::String(x), Value::String(y)) => Ok(x == y),
        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (Value::Float(x), Value::Float(y)) => Ok(x == y),
        _ => Err("incompatible types for comparison".to_string()),
    }
}

fn eq(args: &[Value]) -> Result<Value, String> {
    if args.len() < 2 {
        return Err("missing argument for comparison".to_string());
    }
    for other in &args[1..] {
        if values_equal(&args[0], other)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn ne(args: &[Value]) -> Result<Value, String> {
    values_equal(&args[0], &args[1]).map(|equal| Value::Bool(!equal))
}

fn ordering(args: &[Value]) -> Result<std::cmp::Ordering, String> {
    let (a, b) = (&args[0], &args[1]);
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => x
            .partial_cmp(y)
            .ok_or_else(|| "invalid type for comparison".to_string()),
        (Value::Nil | Value::Bool(_) | Value::List(_) | Value::Map(_), _)
        | (_, Value::Nil | Value::Bool(_) | Value::List(_) | Value::Map(_)) => {
            Err("invalid type for comparison".to_string())
        }
        _ => Err("incompatible types for comparison".to_string()),
    }
}

fn joined(args: &[Value]) -> String {
    match args {
        [Value::String(s)] => s.clone(),
        _ => sprint(args),
    }
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

fn js_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '<' => out.push_str("\\u003C"),
            '>' => out.push_str("\\u003E"),
            '&' => out.push_str("\\u0026"),
            '=' => out.push_str("\\u003D"),
            c if (c as u32) < 0x20 || c.is_control() => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

fn query_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[i64]) -> Value {
        Value::List(items.iter().map(|i| Value::Int(*i)).collect())
    }

    #[test]
    fn test_and_or_return_operands() {
        assert_eq!(and(&[Value::Int(1), Value::from("")]).unwrap(), Value::from(""));
        assert_eq!(or(&[Value::from(""), Value::Int(2)]).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_len() {
        assert_eq!(len(&[Value::from("héllo")]).unwrap(), Value::Int(6));
        assert_eq!(len(&[list(&[1, 2])]).unwrap(), Value::Int(2));
        assert!(len(&[Value::Nil]).is_err());
    }

    #[test]
    fn test_index() {
        let data = Value::from(serde_json::json!({"a": {"b": [10, 20]}}));
        assert_eq!(
            index(&[data.clone(), Value::from("a"), Value::from("b"), Value::Int(1)]).unwrap(),
            Value::Int(20)
        );
        assert_eq!(index(&[data.clone(), Value::from("zz")]).unwrap(), Value::Nil);
        assert!(index(&[list(&[1]), Value::Int(5)]).is_err());
    }

    #[test]
    fn test_slice() {
        assert_eq!(
            slice(&[list(&[1, 2, 3]), Value::Int(1)]).unwrap(),
            list(&[2, 3])
        );
        assert_eq!(
            slice(&[Value::from("abcdef"), Value::Int(1), Value::Int(3)]).unwrap(),
            Value::from("bc")
        );
        assert!(slice(&[Value::from("abc"), Value::Int(2), Value::Int(1)]).is_err());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eq(&[Value::Int(1), Value::Int(2), Value::Int(1)]).unwrap(), Value::Bool(true));
        assert_eq!(eq(&[Value::Float(1.5), Value::Float(1.5)]).unwrap(), Value::Bool(true));
        assert_eq!(
            eq(&[Value::Int(1), Value::Float(1.0)]).unwrap_err(),
            "incompatible types for comparison"
        );
        assert_eq!(
            ordering(&[Value::Int(1), Value::Float(2.0)]).unwrap_err(),
            "incompatible types for comparison"
        );
        assert!(ordering(&[Value::Float(1.0), Value::Float(2.0)]).unwrap().is_lt());
        assert!(eq(&[Value::Int(1), Value::from("1")]).is_err());
        assert_eq!(eq(&[Value::Nil, Value::from("x")]).unwrap(), Value::Bool(false));
        assert!(ordering(&[Value::from("a"), Value::from("b")]).unwrap().is_lt());
        assert!(ordering(&[Value::Bool(true), Value::Bool(false)]).is_err());
    }

    #[test]
    fn test_escapers() {
        assert_eq!(html_escape("<a href=\"x\">"), "&lt;a href=&#34;x&#34;&gt;");
        assert_eq!(js_escape("it's <b>"), "it\\'s \\u003Cb\\u003E");
        assert_eq!(query_escape("a b&c"), "a+b%26c");
    }
}
