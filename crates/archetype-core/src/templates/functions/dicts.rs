//! Dictionary helpers

use std::collections::BTreeMap;

use crate::templates::functions::{map_arg, string_arg, to_string, Arity, FunctionRegistry};
use crate::templates::value::Value;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register("dict", Arity::AtLeast(0), dict);
    registry.register("get", Arity::Exact(2), |a| {
        let map = map_arg(a, 0)?;
        Ok(map
            .get(string_arg(a, 1)?)
            .cloned()
            .unwrap_or_else(|| Value::from("")))
    });
    registry.register("set", Arity::Exact(3), |a| {
        let mut map = map_arg(a, 0)?.clone();
        map.insert(string_arg(a, 1)?.to_string(), a[2].clone());
        Ok(Value::Map(map))
    });
    registry.register("unset", Arity::Exact(2), |a| {
        let mut map = map_arg(a, 0)?.clone();
        map.remove(string_arg(a, 1)?);
        Ok(Value::Map(map))
    });
    registry.register("hasKey", Arity::Exact(2), |a| {
        Ok(map_arg(a, 0)?.contains_key(string_arg(a, 1)?).into())
    });
    registry.register("keys", Arity::AtLeast(0), |a| {
        let mut keys = Vec::new();
        for index in 0..a.len() {
            keys.extend(map_arg(a, index)?.keys().cloned());
        }
        keys.sort();
        Ok(Value::List(keys.into_iter().map(Value::from).collect()))
    });
    registry.register("values", Arity::Exact(1), |a| {
        Ok(Value::List(map_arg(a, 0)?.values().cloned().collect()))
    });
    registry.register("pluck", Arity::AtLeast(1), |a| {
        let key = string_arg(a, 0)?;
        let mut found = Vec::new();
        for index in 1..a.len() {
            if let Some(value) = map_arg(a, index)?.get(key) {
                found.push(value.clone());
            }
        }
        Ok(Value::List(found))
    });
    registry.register("pick", Arity::AtLeast(1), |a| {
        let map = map_arg(a, 0)?;
        let mut picked = BTreeMap::new();
        for index in 1..a.len() {
            let key = string_arg(a, index)?;
            if let Some(value) = map.get(key) {
                picked.insert(key.to_string(), value.clone());
            }
        }
        Ok(Value::Map(picked))
    });
    registry.register("omit", Arity::AtLeast(1), |a| {
        let mut map = map_arg(a, 0)?.clone();
        for index in 1..a.len() {
            map.remove(string_arg(a, index)?);
        }
        Ok(Value::Map(map))
    });
    registry.register("merge", Arity::AtLeast(1), |a| merge_all(a, false));
    registry.register("mergeOverwrite", Arity::AtLeast(1), |a| merge_all(a, true));
    registry.register("dig", Arity::AtLeast(3), dig);
    registry.register("deepCopy", Arity::Exact(1), |a| Ok(a[0].clone()));
}

fn dict(args: &[Value]) -> Result<Value, String> {
    let mut map = BTreeMap::new();
    for pair in args.chunks(2) {
        let key = to_string(&pair[0]);
        let value = pair.get(1).cloned().unwrap_or_else(|| Value::from(""));
        map.insert(key, value);
    }
    Ok(Value::Map(map))
}

/// Fold every source into the first map. With `overwrite` unset, keys
/// already present in the destination win.
fn merge_all(args: &[Value], overwrite: bool) -> Result<Value, String> {
    let mut dest = map_arg(args, 0)?.clone();
    for index in 1..args.len() {
        merge_into(&mut dest, map_arg(args, index)?, overwrite);
    }
    Ok(Value::Map(dest))
}

fn merge_into(dest: &mut BTreeMap<String, Value>, src: &BTreeMap<String, Value>, overwrite: bool) {
    for (key, value) in src {
        match (dest.get_mut(key), value) {
            (Some(Value::Map(existing)), Value::Map(incoming)) => {
                merge_into(existing, incoming, overwrite);
            }
            (Some(existing), _) => {
                if overwrite || existing.is_empty() {
                    *existing = value.clone();
                }
            }
            (None, _) => {
                dest.insert(key.clone(), value.clone());
            }
        }
    }
}

fn dig(args: &[Value]) -> Result<Value, String> {
    let last = args.len() - 1;
    let map = map_arg(args, last)?;
    let default = &args[last - 1];
    let mut current = map;
    let keys = &args[..last - 1];
    for (i, key) in keys.iter().enumerate() {
        let key = match key {
            Value::String(k) => k,
            other => {
                return Err(format!(
                    "wrong type for value; expected string; got {}",
                    other.type_name()
                ))
            }
        };
        match current.get(key) {
            Some(value) if i + 1 == keys.len() => return Ok(value.clone()),
            Some(Value::Map(next)) => current = next,
            _ => return Ok(default.clone()),
        }
    }
    Ok(default.clone())
}
