//! Regular expression helpers

use regex::{NoExpand, Regex};

use crate::templates::functions::{int_arg, string_arg, Arity, FunctionRegistry};
use crate::templates::value::Value;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register("regexMatch", Arity::Exact(2), |a| {
        Ok(compile(a, 0)?.is_match(string_arg(a, 1)?).into())
    });
    registry.register("regexFind", Arity::Exact(2), |a| {
        let re = compile(a, 0)?;
        let found = re.find(string_arg(a, 1)?).map(|m| m.as_str()).unwrap_or("");
        Ok(found.into())
    });
    registry.register("regexFindAll", Arity::Exact(3), |a| {
        let re = compile(a, 0)?;
        let limit = limit(int_arg(a, 2)?);
        Ok(Value::List(
            re.find_iter(string_arg(a, 1)?)
                .take(limit)
                .map(|m| Value::from(m.as_str()))
                .collect(),
        ))
    });
    registry.register("regexReplaceAll", Arity::Exact(3), |a| {
        let re = compile(a, 0)?;
        Ok(re
            .replace_all(string_arg(a, 1)?, string_arg(a, 2)?)
            .into_owned()
            .into())
    });
    registry.register("regexReplaceAllLiteral", Arity::Exact(3), |a| {
        let re = compile(a, 0)?;
        Ok(re
            .replace_all(string_arg(a, 1)?, NoExpand(string_arg(a, 2)?))
            .into_owned()
            .into())
    });
    registry.register("regexSplit", Arity::Exact(3), |a| {
        let re = compile(a, 0)?;
        let s = string_arg(a, 1)?;
        let n = int_arg(a, 2)?;
        let parts: Vec<Value> = match n {
            0 => Vec::new(),
            n if n < 0 => re.split(s).map(Value::from).collect(),
            n => re.splitn(s, n as usize).map(Value::from).collect(),
        };
        Ok(Value::List(parts))
    });
}

fn compile(args: &[Value], index: usize) -> Result<Regex, String> {
    Regex::new(string_arg(args, index)?).map_err(|e| e.to_string())
}

/// Negative limits mean "all matches".
fn limit(n: i64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, String> {
        let mut registry = FunctionRegistry::new();
        register(&mut registry);
        (registry.get(name).unwrap().call)(args)
    }

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    #[test]
    fn test_match_and_find() {
        assert_eq!(call("regexMatch", &[s("^[a-z]+$"), s("chart")]).unwrap(), Value::Bool(true));
        assert_eq!(call("regexFind", &[s("[0-9]+"), s("v12.3")]).unwrap(), s("12"));
        assert_eq!(
            call("regexFindAll", &[s("[0-9]"), s("a1b2c3"), Value::Int(-1)]).unwrap(),
            Value::List(vec![s("1"), s("2"), s("3")])
        );
    }

    #[test]
    fn test_replace() {
        assert_eq!(
            call("regexReplaceAll", &[s("a(x*)b"), s("-ab-axxb-"), s("${1}W")]).unwrap(),
            s("-W-xxW-")
        );
        assert_eq!(
            call("regexReplaceAllLiteral", &[s("a(x*)b"), s("-ab-"), s("${1}")]).unwrap(),
            s("-${1}-")
        );
    }

    #[test]
    fn test_split() {
        assert_eq!(
            call("regexSplit", &[s("z+"), s("pizza"), Value::Int(-1)]).unwrap(),
            Value::List(vec![s("pi"), s("a")])
        );
    }

    #[test]
    fn test_bad_pattern() {
        assert!(call("regexMatch", &[s("("), s("x")]).is_err());
    }
}
