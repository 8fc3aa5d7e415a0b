//! List helpers
//!
//! Every helper returns a new list; inputs are never modified.

use crate::templates::functions::{int_arg, list_arg, to_int64, Arity, FunctionRegistry};
use crate::templates::value::Value;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register("list", Arity::AtLeast(0), |a| Ok(Value::List(a.to_vec())));
    registry.register("first", Arity::Exact(1), |a| {
        Ok(list_arg(a, 0, "find first")?.first().cloned().unwrap_or_default())
    });
    registry.register("last", Arity::Exact(1), |a| {
        Ok(list_arg(a, 0, "find last")?.last().cloned().unwrap_or_default())
    });
    registry.register("rest", Arity::Exact(1), |a| {
        let items = list_arg(a, 0, "find rest")?;
        Ok(Value::List(items.iter().skip(1).cloned().collect()))
    });
    registry.register("initial", Arity::Exact(1), |a| {
        let items = list_arg(a, 0, "find initial")?;
        let keep = items.len().saturating_sub(1);
        Ok(Value::List(items[..keep].to_vec()))
    });
    registry.register("append", Arity::Exact(2), append);
    registry.register("push", Arity::Exact(2), append);
    registry.register("prepend", Arity::Exact(2), |a| {
        let mut items = vec![a[1].clone()];
        items.extend_from_slice(list_arg(a, 0, "prepend")?);
        Ok(Value::List(items))
    });
    registry.register("concat", Arity::AtLeast(0), |a| {
        let mut items = Vec::new();
        for index in 0..a.len() {
            items.extend_from_slice(list_arg(a, index, "concat")?);
        }
        Ok(Value::List(items))
    });
    registry.register("reverse", Arity::Exact(1), |a| {
        let mut items = list_arg(a, 0, "find reverse")?.to_vec();
        items.reverse();
        Ok(Value::List(items))
    });
    registry.register("uniq", Arity::Exact(1), |a| {
        let mut seen: Vec<Value> = Vec::new();
        for item in list_arg(a, 0, "find uniq")? {
            if !seen.contains(item) {
                seen.push(item.clone());
            }
        }
        Ok(Value::List(seen))
    });
    registry.register("without", Arity::AtLeast(1), |a| {
        let omit = &a[1..];
        Ok(Value::List(
            list_arg(a, 0, "find without")?
                .iter()
                .filter(|item| !omit.contains(item))
                .cloned()
                .collect(),
        ))
    });
    registry.register("has", Arity::Exact(2), |a| match &a[1] {
        Value::Nil => Ok(Value::Bool(false)),
        _ => Ok(list_arg(a, 1, "find has")?.contains(&a[0]).into()),
    });
    registry.register("compact", Arity::Exact(1), |a| {
        Ok(Value::List(
            list_arg(a, 0, "compact")?
                .iter()
                .filter(|item| item.is_true())
                .cloned()
                .collect(),
        ))
    });
    registry.register("until", Arity::Exact(1), |a| {
        let count = int_arg(a, 0)?;
        let step = if count < 0 { -1 } else { 1 };
        Ok(until_step(0, count, step))
    });
    registry.register("untilStep", Arity::Exact(3), |a| {
        Ok(until_step(to_int64(&a[0]), to_int64(&a[1]), to_int64(&a[2])))
    });
}

fn append(args: &[Value]) -> Result<Value, String> {
    let mut items = list_arg(args, 0, "append")?.to_vec();
    items.push(args[1].clone());
    Ok(Value::List(items))
}

fn until_step(start: i64, stop: i64, step: i64) -> Value {
    let mut items = Vec::new();
    if step == 0 || (step > 0 && start >= stop) || (step < 0 && start <= stop) {
        return Value::List(items);
    }
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        items.push(Value::Int(i));
        i += step;
    }
    Value::List(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, String> {
        let mut registry = FunctionRegistry::new();
        register(&mut registry);
        (registry.get(name).unwrap().call)(args)
    }

    fn ints(items: &[i64]) -> Value {
        Value::List(items.iter().map(|i| Value::Int(*i)).collect())
    }

    #[test]
    fn test_first_last_rest() {
        let l = ints(&[1, 2, 3]);
        assert_eq!(call("first", &[l.clone()]).unwrap(), Value::Int(1));
        assert_eq!(call("last", &[l.clone()]).unwrap(), Value::Int(3));
        assert_eq!(call("rest", &[l.clone()]).unwrap(), ints(&[2, 3]));
        assert_eq!(call("initial", &[l]).unwrap(), ints(&[1, 2]));
        assert_eq!(call("first", &[ints(&[])]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_append_does_not_mutate() {
        let l = ints(&[1]);
        assert_eq!(call("append", &[l.clone(), Value::Int(2)]).unwrap(), ints(&[1, 2]));
        assert_eq!(call("prepend", &[l.clone(), Value::Int(0)]).unwrap(), ints(&[0, 1]));
        assert_eq!(l, ints(&[1]));
    }

    #[test]
    fn test_uniq_without_has() {
        assert_eq!(call("uniq", &[ints(&[1, 1, 2])]).unwrap(), ints(&[1, 2]));
        assert_eq!(
            call("without", &[ints(&[1, 2, 3]), Value::Int(2)]).unwrap(),
            ints(&[1, 3])
        );
        assert_eq!(call("has", &[Value::Int(2), ints(&[1, 2])]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_until() {
        assert_eq!(call("until", &[Value::Int(3)]).unwrap(), ints(&[0, 1, 2]));
        assert_eq!(
            call("untilStep", &[Value::Int(3), Value::Int(6), Value::Int(2)]).unwrap(),
            ints(&[3, 5])
        );
        assert_eq!(call("until", &[Value::Int(-2)]).unwrap(), ints(&[0, -1]));
    }

    #[test]
    fn test_non_list_errors() {
        assert_eq!(
            call("first", &[Value::Int(1)]).unwrap_err(),
            "Cannot find first on type int64"
        );
    }
}
