//! Environment and time helpers

use chrono::{DateTime, FixedOffset, Local, SecondsFormat, TimeZone};

use crate::templates::functions::{string_arg, Arity, FunctionRegistry};
use crate::templates::value::Value;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register("env", Arity::Exact(1), |a| {
        Ok(std::env::var(string_arg(a, 0)?).unwrap_or_default().into())
    });
    registry.register("expandenv", Arity::Exact(1), |a| {
        Ok(expand_env(string_arg(a, 0)?, |name| std::env::var(name).ok()).into())
    });
    registry.register("now", Arity::Exact(0), |_| {
        Ok(Local::now()
            .to_rfc3339_opts(SecondsFormat::AutoSi, false)
            .into())
    });
    registry.register("date", Arity::Exact(2), |a| {
        let time = to_time(&a[1])?;
        Ok(time.format(&go_layout_to_strftime(string_arg(a, 0)?)).to_string().into())
    });
    registry.register("htmlDate", Arity::Exact(1), |a| {
        Ok(to_time(&a[0])?.format("%Y-%m-%d").to_string().into())
    });
    registry.register("unixEpoch", Arity::Exact(1), |a| {
        Ok(Value::Int(to_time(&a[0])?.timestamp()))
    });
}

/// Accept RFC 3339 strings (what `now` produces) or unix seconds.
fn to_time(value: &Value) -> Result<DateTime<FixedOffset>, String> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s).map_err(|e| e.to_string()),
        Value::Int(secs) => Local
            .timestamp_opt(*secs, 0)
            .single()
            .map(|t| t.fixed_offset())
            .ok_or_else(|| format!("timestamp out of range: {}", secs)),
        Value::Float(secs) => Local
            .timestamp_opt(*secs as i64, 0)
            .single()
            .map(|t| t.fixed_offset())
            .ok_or_else(|| format!("timestamp out of range: {}", secs)),
        other => Err(format!("cannot convert {} to a time", other.type_name())),
    }
}

/// Replace `$VAR` and `${VAR}` references; unset variables expand to "".
fn expand_env(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => {
                    out.push_str(&lookup(&braced[..end]).unwrap_or_default());
                    rest = &braced[end + 1..];
                }
                None => {
                    out.push_str(&rest[pos..]);
                    rest = "";
                }
            }
            continue;
        }
        let len = after
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(after.len());
        if len == 0 {
            out.push('$');
        } else {
            out.push_str(&lookup(&after[..len]).unwrap_or_default());
        }
        rest = &after[len..];
    }
    out.push_str(rest);
    out
}

/// Translate a Go reference-time layout ("2006-01-02") to strftime.
pub(crate) fn go_layout_to_strftime(layout: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("January", "%B"),
        ("Monday", "%A"),
        ("2006", "%Y"),
        ("Z07:00", "%:z"),
        ("-07:00", "%:z"),
        ("-0700", "%z"),
        (".000000000", "%.9f"),
        (".000000", "%.6f"),
        (".000", "%.3f"),
        ("Jan", "%b"),
        ("Mon", "%a"),
        ("MST", "%Z"),
        ("01", "%m"),
        ("02", "%d"),
        ("_2", "%e"),
        ("15", "%H"),
        ("03", "%I"),
        ("04", "%M"),
        ("05", "%S"),
        ("06", "%y"),
        ("PM", "%p"),
        ("pm", "%P"),
        ("1", "%-m"),
        ("2", "%-d"),
        ("3", "%-I"),
        ("4", "%-M"),
        ("5", "%-S"),
    ];

    let mut out = String::with_capacity(layout.len() * 2);
    let mut rest = layout;
    'outer: while !rest.is_empty() {
        for (go, strftime) in TOKENS {
            if let Some(tail) = rest.strip_prefix(go) {
                out.push_str(strftime);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                out.push_str("%%");
            } else {
                out.push(c);
            }
        }
        rest = chars.as_str();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_translation() {
        assert_eq!(go_layout_to_strftime("2006-01-02"), "%Y-%m-%d");
        assert_eq!(go_layout_to_strftime("15:04:05 MST"), "%H:%M:%S %Z");
        assert_eq!(go_layout_to_strftime("Jan 2, 2006"), "%b %-d, %Y");
        assert_eq!(go_layout_to_strftime("100%"), "100%%");
    }

    #[test]
    fn test_date_formats_rfc3339() {
        let t = to_time(&Value::from("2024-03-05T10:20:30+00:00")).unwrap();
        assert_eq!(t.format(&go_layout_to_strftime("2006-01-02 15:04")).to_string(), "2024-03-05 10:20");
        assert_eq!(t.timestamp(), 1709634030);
    }

    #[test]
    fn test_expand_env() {
        let lookup = |name: &str| match name {
            "HOME" => Some("/home/me".to_string()),
            _ => None,
        };
        assert_eq!(expand_env("$HOME/x ${HOME} $NOPE.", lookup), "/home/me/x /home/me .");
        assert_eq!(expand_env("cost: $", lookup), "cost: $");
    }
}
