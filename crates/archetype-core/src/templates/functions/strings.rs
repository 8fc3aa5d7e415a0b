//! String helpers: case conversion, trimming, quoting, splitting

use std::collections::BTreeMap;

use crate::templates::functions::format::go_quote;
use crate::templates::functions::{
    int_arg, string_arg, to_string, to_string_list, Arity, FunctionRegistry,
};
use crate::templates::value::Value;

/// Case conversions exposed as template helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTransform {
    /// PascalCase (e.g., MyChart), exposed as `camelcase`
    PascalCase,
    /// snake_case (e.g., my_chart)
    SnakeCase,
    /// kebab-case (e.g., my-chart)
    KebabCase,
    /// UPPERCASE
    UpperCase,
    /// lowercase
    LowerCase,
    /// First letter of every word upper-cased
    TitleCase,
    /// First letter of every word lower-cased
    UntitleCase,
    /// Upper and lower case swapped
    SwapCase,
}

impl CaseTransform {
    /// Apply case transformation to a string
    pub fn apply(&self, input: &str) -> String {
        use heck::{ToKebabCase, ToPascalCase, ToSnakeCase};

        match self {
            CaseTransform::PascalCase => input.to_pascal_case(),
            CaseTransform::SnakeCase => input.to_snake_case(),
            CaseTransform::KebabCase => input.to_kebab_case(),
            CaseTransform::UpperCase => input.to_uppercase(),
            CaseTransform::LowerCase => input.to_lowercase(),
            CaseTransform::TitleCase => title(input),
            CaseTransform::UntitleCase => untitle(input),
            CaseTransform::SwapCase => swap_case(input),
        }
    }
}

/// Word boundaries as Go's `strings.Title` sees them
fn is_separator(c: char) -> bool {
    if c.is_ascii() {
        return !(c.is_ascii_alphanumeric() || c == '_');
    }
    if c.is_alphanumeric() {
        return false;
    }
    c.is_whitespace()
}

fn title(input: &str) -> String {
    let mut prev = ' ';
    input
        .chars()
        .map(|c| {
            let out = if is_separator(prev) {
                c.to_uppercase().collect::<String>()
            } else {
                c.to_string()
            };
            prev = c;
            out
        })
        .collect()
}

fn untitle(input: &str) -> String {
    let mut at_word_start = true;
    input
        .chars()
        .map(|c| {
            let out = if at_word_start {
                c.to_lowercase().collect::<String>()
            } else {
                c.to_string()
            };
            at_word_start = c.is_whitespace();
            out
        })
        .collect()
}

fn swap_case(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_uppercase() {
                c.to_lowercase().collect::<String>()
            } else if c.is_lowercase() {
                c.to_uppercase().collect::<String>()
            } else {
                c.to_string()
            }
        })
        .collect()
}

fn case_helper(registry: &mut FunctionRegistry, name: &str, call: fn(&[Value]) -> Result<Value, String>) {
    registry.register(name, Arity::Exact(1), call);
}

pub(super) fn register(registry: &mut FunctionRegistry) {
    case_helper(registry, "upper", |a| transform(a, CaseTransform::UpperCase));
    case_helper(registry, "lower", |a| transform(a, CaseTransform::LowerCase));
    case_helper(registry, "title", |a| transform(a, CaseTransform::TitleCase));
    case_helper(registry, "untitle", |a| transform(a, CaseTransform::UntitleCase));
    case_helper(registry, "swapcase", |a| transform(a, CaseTransform::SwapCase));
    case_helper(registry, "camelcase", |a| transform(a, CaseTransform::PascalCase));
    case_helper(registry, "snakecase", |a| transform(a, CaseTransform::SnakeCase));
    case_helper(registry, "kebabcase", |a| transform(a, CaseTransform::KebabCase));

    registry.register("trim", Arity::Exact(1), |a| {
        Ok(string_arg(a, 0)?.trim().into())
    });
    registry.register("trimAll", Arity::Exact(2), trim_all);
    registry.register("trimall", Arity::Exact(2), trim_all);
    registry.register("trimPrefix", Arity::Exact(2), |a| {
        let s = string_arg(a, 1)?;
        Ok(s.strip_prefix(string_arg(a, 0)?).unwrap_or(s).into())
    });
    registry.register("trimSuffix", Arity::Exact(2), |a| {
        let s = string_arg(a, 1)?;
        Ok(s.strip_suffix(string_arg(a, 0)?).unwrap_or(s).into())
    });
    registry.register("trunc", Arity::Exact(2), trunc);
    registry.register("abbrev", Arity::Exact(2), abbrev);
    registry.register("repeat", Arity::Exact(2), |a| {
        let count = int_arg(a, 0)?;
        let count = usize::try_from(count).map_err(|_| "negative repeat count".to_string())?;
        Ok(string_arg(a, 1)?.repeat(count).into())
    });
    registry.register("replace", Arity::Exact(3), |a| {
        Ok(string_arg(a, 2)?
            .replace(string_arg(a, 0)?, string_arg(a, 1)?)
            .into())
    });
    registry.register("contains", Arity::Exact(2), |a| {
        Ok(string_arg(a, 1)?.contains(string_arg(a, 0)?).into())
    });
    registry.register("hasPrefix", Arity::Exact(2), |a| {
        Ok(string_arg(a, 1)?.starts_with(string_arg(a, 0)?).into())
    });
    registry.register("hasSuffix", Arity::Exact(2), |a| {
        Ok(string_arg(a, 1)?.ends_with(string_arg(a, 0)?).into())
    });
    registry.register("quote", Arity::AtLeast(0), |a| {
        Ok(non_nil(a).map(|v| go_quote(&to_string(v))).collect::<Vec<_>>().join(" ").into())
    });
    registry.register("squote", Arity::AtLeast(0), |a| {
        Ok(non_nil(a)
            .map(|v| format!("'{}'", to_string(v)))
            .collect::<Vec<_>>()
            .join(" ")
            .into())
    });
    registry.register("cat", Arity::AtLeast(0), |a| {
        Ok(non_nil(a).map(to_string).collect::<Vec<_>>().join(" ").into())
    });
    registry.register("indent", Arity::Exact(2), |a| {
        Ok(indent(int_arg(a, 0)?, string_arg(a, 1)?).into())
    });
    registry.register("nindent", Arity::Exact(2), |a| {
        Ok(format!("\n{}", indent(int_arg(a, 0)?, string_arg(a, 1)?)).into())
    });
    registry.register("nospace", Arity::Exact(1), |a| {
        Ok(string_arg(a, 0)?
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .into())
    });
    registry.register("substr", Arity::Exact(3), substr);
    registry.register("initials", Arity::Exact(1), |a| {
        Ok(string_arg(a, 0)?
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .collect::<String>()
            .into())
    });
    registry.register("plural", Arity::Exact(3), |a| {
        let which = if int_arg(a, 2)? == 1 { 0 } else { 1 };
        Ok(string_arg(a, which)?.into())
    });
    registry.register("split", Arity::Exact(2), |a| {
        let parts = string_arg(a, 1)?.split(string_arg(a, 0)?);
        Ok(indexed_parts(parts))
    });
    registry.register("splitn", Arity::Exact(3), |a| {
        let n = int_arg(a, 1)?;
        let s = string_arg(a, 2)?;
        let sep = string_arg(a, 0)?;
        if n <= 0 {
            return Ok(Value::empty_map());
        }
        Ok(indexed_parts(s.splitn(n as usize, sep)))
    });
    registry.register("splitList", Arity::Exact(2), |a| {
        Ok(Value::List(
            string_arg(a, 1)?
                .split(string_arg(a, 0)?)
                .map(Value::from)
                .collect(),
        ))
    });
    registry.register("join", Arity::Exact(2), |a| {
        Ok(to_string_list(&a[1]).join(string_arg(a, 0)?).into())
    });
    registry.register("toString", Arity::Exact(1), |a| Ok(to_string(&a[0]).into()));
    registry.register("toStrings", Arity::Exact(1), |a| {
        Ok(Value::List(
            to_string_list(&a[0]).into_iter().map(Value::from).collect(),
        ))
    });
    registry.register("sortAlpha", Arity::Exact(1), |a| {
        let mut items = match &a[0] {
            Value::List(_) => to_string_list(&a[0]),
            other => vec![to_string(other)],
        };
        items.sort();
        Ok(Value::List(items.into_iter().map(Value::from).collect()))
    });
}

fn transform(args: &[Value], case: CaseTransform) -> Result<Value, String> {
    Ok(case.apply(string_arg(args, 0)?).into())
}

fn non_nil(args: &[Value]) -> impl Iterator<Item = &Value> {
    args.iter().filter(|v| !v.is_nil())
}

fn trim_all(args: &[Value]) -> Result<Value, String> {
    let cutset = string_arg(args, 0)?;
    Ok(string_arg(args, 1)?
        .trim_matches(|c: char| cutset.contains(c))
        .into())
}

fn trunc(args: &[Value]) -> Result<Value, String> {
    let count = int_arg(args, 0)?;
    let s = string_arg(args, 1)?;
    let len = s.chars().count() as i64;
    let out: String = if count < 0 && len + count > 0 {
        s.chars().skip((len + count) as usize).collect()
    } else if count >= 0 && len > count {
        s.chars().take(count as usize).collect()
    } else {
        s.to_string()
    };
    Ok(out.into())
}

fn abbrev(args: &[Value]) -> Result<Value, String> {
    let width = int_arg(args, 0)?;
    let s = string_arg(args, 1)?;
    let len = s.chars().count() as i64;
    if width < 4 || len <= width {
        return Ok(s.into());
    }
    let kept: String = s.chars().take((width - 3) as usize).collect();
    Ok(format!("{}...", kept).into())
}

fn indent(spaces: i64, s: &str) -> String {
    let pad = " ".repeat(usize::try_from(spaces).unwrap_or(0));
    format!("{}{}", pad, s.replace('\n', &format!("\n{}", pad)))
}

fn substr(args: &[Value]) -> Result<Value, String> {
    let start = int_arg(args, 0)?;
    let end = int_arg(args, 1)?;
    let chars: Vec<char> = string_arg(args, 2)?.chars().collect();
    let len = chars.len() as i64;
    let (from, to) = if start < 0 {
        (0, end.clamp(0, len))
    } else if end < 0 || end > len {
        (start.min(len), len)
    } else {
        (start.min(end), end)
    };
    Ok(chars[from as usize..to as usize].iter().collect::<String>().into())
}

fn indexed_parts<'s>(parts: impl Iterator<Item = &'s str>) -> Value {
    let map: BTreeMap<String, Value> = parts
        .enumerate()
        .map(|(i, part)| (format!("_{}", i), Value::from(part)))
        .collect();
    Value::Map(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, String> {
        let mut registry = FunctionRegistry::new();
        register(&mut registry);
        let helper = registry.get(name).unwrap();
        assert!(helper.arity.accepts(args.len()));
        (helper.call)(args)
    }

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    #[test]
    fn test_case_transforms() {
        assert_eq!(CaseTransform::PascalCase.apply("my_chart"), "MyChart");
        assert_eq!(CaseTransform::SnakeCase.apply("MyChart"), "my_chart");
        assert_eq!(CaseTransform::KebabCase.apply("MyChart"), "my-chart");
        assert_eq!(CaseTransform::TitleCase.apply("hello world-wide"), "Hello World-Wide");
        assert_eq!(CaseTransform::UntitleCase.apply("Hello World"), "hello world");
        assert_eq!(CaseTransform::SwapCase.apply("aBc"), "AbC");
    }

    #[test]
    fn test_trimming() {
        assert_eq!(call("trim", &[s("  x \n")]).unwrap(), s("x"));
        assert_eq!(call("trimAll", &[s("$"), s("$5.00$")]).unwrap(), s("5.00"));
        assert_eq!(call("trimSuffix", &[s("-"), s("hello-")]).unwrap(), s("hello"));
        assert_eq!(call("trimPrefix", &[s("-"), s("-hello")]).unwrap(), s("hello"));
    }

    #[test]
    fn test_trunc_and_abbrev() {
        assert_eq!(call("trunc", &[Value::Int(5), s("hello world")]).unwrap(), s("hello"));
        assert_eq!(call("trunc", &[Value::Int(-5), s("hello world")]).unwrap(), s("world"));
        assert_eq!(call("abbrev", &[Value::Int(5), s("hello world")]).unwrap(), s("he..."));
    }

    #[test]
    fn test_quote_skips_nil() {
        assert_eq!(
            call("quote", &[s("a"), Value::Nil, Value::Int(1)]).unwrap(),
            s("\"a\" \"1\"")
        );
        assert_eq!(call("squote", &[s("a")]).unwrap(), s("'a'"));
    }

    #[test]
    fn test_indent() {
        assert_eq!(call("indent", &[Value::Int(2), s("a\nb")]).unwrap(), s("  a\n  b"));
        assert_eq!(call("nindent", &[Value::Int(2), s("a")]).unwrap(), s("\n  a"));
    }

    #[test]
    fn test_split_and_join() {
        let parts = call("split", &[s("$"), s("foo$bar")]).unwrap();
        assert_eq!(parts.lookup(&["_1"]), Some(&s("bar")));
        let list = call("splitList", &[s(","), s("a,b")]).unwrap();
        assert_eq!(call("join", &[s("-"), list]).unwrap(), s("a-b"));
    }

    #[test]
    fn test_substr() {
        assert_eq!(call("substr", &[Value::Int(0), Value::Int(5), s("hello world")]).unwrap(), s("hello"));
        assert_eq!(call("substr", &[Value::Int(6), Value::Int(-1), s("hello world")]).unwrap(), s("world"));
    }

    #[test]
    fn test_type_error() {
        let err = call("upper", &[Value::Int(1)]).unwrap_err();
        assert_eq!(err, "wrong type for value; expected string; got int64");
    }
}
