//! Defaults, emptiness and type inspection

use crate::templates::functions::{bool_arg, string_arg, to_string, Arity, FunctionRegistry};

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register("default", Arity::AtLeast(1), |a| {
        match a.get(1) {
            Some(given) if given.is_true() => Ok(given.clone()),
            _ => Ok(a[0].clone()),
        }
    });
    registry.register("empty", Arity::Exact(1), |a| Ok(a[0].is_empty().into()));
    registry.register("coalesce", Arity::AtLeast(0), |a| {
        Ok(a.iter().find(|v| v.is_true()).cloned().unwrap_or_default())
    });
    registry.register("ternary", Arity::Exact(3), |a| {
        Ok(if bool_arg(a, 2)? { a[0].clone() } else { a[1].clone() })
    });
    registry.register("fail", Arity::Exact(1), |a| Err(to_string(&a[0])));
    registry.register("typeOf", Arity::Exact(1), |a| Ok(a[0].type_name().into()));
    registry.register("typeIs", Arity::Exact(2), |a| {
        Ok((string_arg(a, 0)? == a[1].type_name()).into())
    });
    registry.register("kindOf", Arity::Exact(1), |a| Ok(a[0].kind_name().into()));
    registry.register("kindIs", Arity::Exact(2), |a| {
        Ok((string_arg(a, 0)? == a[1].kind_name()).into())
    });
    registry.register("deepEqual", Arity::Exact(2), |a| Ok((a[0] == a[1]).into()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::value::Value;

    fn call(name: &str, args: &[Value]) -> Result<Value, String> {
        let mut registry = FunctionRegistry::new();
        register(&mut registry);
        (registry.get(name).unwrap().call)(args)
    }

    #[test]
    fn test_default() {
        assert_eq!(call("default", &[Value::from("d")]).unwrap(), Value::from("d"));
        assert_eq!(
            call("default", &[Value::from("d"), Value::from("")]).unwrap(),
            Value::from("d")
        );
        assert_eq!(
            call("default", &[Value::from("d"), Value::from("x")]).unwrap(),
            Value::from("x")
        );
        assert_eq!(
            call("default", &[Value::Int(5), Value::Int(0)]).unwrap(),
            Value::Int(5)
        );
    }

    #[test]
    fn test_coalesce_and_ternary() {
        assert_eq!(
            call("coalesce", &[Value::Nil, Value::from(""), Value::from("z")]).unwrap(),
            Value::from("z")
        );
        assert_eq!(
            call("ternary", &[Value::from("y"), Value::from("n"), Value::Bool(false)]).unwrap(),
            Value::from("n")
        );
        assert!(call("ternary", &[Value::Nil, Value::Nil, Value::Int(1)]).is_err());
    }

    #[test]
    fn test_fail() {
        assert_eq!(call("fail", &[Value::from("boom")]).unwrap_err(), "boom");
    }

    #[test]
    fn test_types() {
        assert_eq!(call("typeOf", &[Value::Int(1)]).unwrap(), Value::from("int64"));
        assert_eq!(
            call("kindIs", &[Value::from("map"), Value::empty_map()]).unwrap(),
            Value::Bool(true)
        );
    }
}
