//! Go `fmt` compatible formatting for `print`, `printf` and `quote`

use crate::templates::value::{format_float, Value};

/// `fmt.Sprint`: spaces are added between operands when neither is a string.
pub(crate) fn sprint(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            let prev_is_string = matches!(args[i - 1], Value::String(_));
            let is_string = matches!(arg, Value::String(_));
            if !prev_is_string && !is_string {
                out.push(' ');
            }
        }
        out.push_str(&arg.to_display_string());
    }
    out
}

/// `fmt.Sprintln`: operands always separated by spaces, newline appended.
pub(crate) fn sprintln(args: &[Value]) -> String {
    let mut out = args
        .iter()
        .map(Value::to_display_string)
        .collect::<Vec<_>>()
        .join(" ");
    out.push('\n');
    out
}

/// Double-quote `s` with Go escape rules.
pub(crate) fn go_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\u{0B}' => out.push_str("\\v"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c if c.is_control() => {
                if (c as u32) <= 0xFFFF {
                    out.push_str(&format!("\\u{:04x}", c as u32));
                } else {
                    out.push_str(&format!("\\U{:08x}", c as u32));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[derive(Debug, Default)]
struct Directive {
    minus: bool,
    plus: bool,
    zero: bool,
    space: bool,
    sharp: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

/// `fmt.Sprintf` over template values.
///
/// Supports the verbs chart templates use in practice. Integer and float
/// verbs accept either numeric kind since configuration numbers can arrive
/// as either.
pub(crate) fn sprintf(format: &str, args: &[Value]) -> String {
    let mut out = String::new();
    let mut chars = format.chars().peekable();
    let mut next_arg = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut directive = Directive::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => directive.minus = true,
                '+' => directive.plus = true,
                '0' => directive.zero = true,
                ' ' => directive.space = true,
                '#' => directive.sharp = true,
                _ => break,
            }
            chars.next();
        }
        directive.width = take_number(&mut chars);
        if chars.peek() == Some(&'.') {
            chars.next();
            directive.precision = Some(take_number(&mut chars).unwrap_or(0));
        }
        let verb = match chars.next() {
            Some(v) => v,
            None => {
                out.push_str("%!(NOVERB)");
                break;
            }
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        let arg = match args.get(next_arg) {
            Some(arg) => arg,
            None => {
                out.push_str(&format!("%!{}(MISSING)", verb));
                continue;
            }
        };
        next_arg += 1;
        let body = format_one(verb, &directive, arg);
        out.push_str(&pad(body, &directive, verb, arg));
    }

    if next_arg < args.len() {
        out.push_str("%!(EXTRA ");
        let extra = args[next_arg..]
            .iter()
            .map(|a| format!("{}={}", a.type_name(), a))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&extra);
        out.push(')');
    }
    out
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut number: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        number = Some(number.unwrap_or(0) * 10 + d as usize);
        chars.next();
    }
    number
}

fn bad_verb(verb: char, arg: &Value) -> String {
    match arg {
        Value::Nil => format!("%!{}(<nil>)", verb),
        other => format!("%!{}({}={})", verb, other.type_name(), other),
    }
}

fn signed(body: String, negative: bool, directive: &Directive) -> String {
    if negative {
        format!("-{}", body)
    } else if directive.plus {
        format!("+{}", body)
    } else if directive.space {
        format!(" {}", body)
    } else {
        body
    }
}

fn as_integer(arg: &Value) -> Option<i64> {
    match arg {
        Value::Int(i) => Some(*i),
        Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
        _ => None,
    }
}

fn format_one(verb: char, directive: &Directive, arg: &Value) -> String {
    match verb {
        'v' => match arg {
            Value::String(s) if directive.sharp => go_quote(s),
            other => other.to_display_string(),
        },
        's' => match arg {
            Value::String(s) => truncate(s, directive.precision),
            Value::List(_) | Value::Map(_) => arg.to_display_string(),
            other => bad_verb(verb, other),
        },
        'q' => match arg {
            Value::String(s) => go_quote(s),
            Value::Int(i) => match u32::try_from(*i).ok().and_then(char::from_u32) {
                Some(c) => format!("'{}'", c),
                None => bad_verb(verb, arg),
            },
            other => bad_verb(verb, other),
        },
        't' => match arg {
            Value::Bool(b) => b.to_string(),
            other => bad_verb(verb, other),
        },
        'd' => match as_integer(arg) {
            Some(i) => signed(i.unsigned_abs().to_string(), i < 0, directive),
            None => bad_verb(verb, arg),
        },
        'b' | 'o' | 'x' | 'X' => match (arg, as_integer(arg)) {
            (Value::String(s), _) if verb == 'x' || verb == 'X' => {
                let hex: String = s.bytes().map(|b| format!("{:02x}", b)).collect();
                if verb == 'X' {
                    hex.to_uppercase()
                } else {
                    hex
                }
            }
            (_, Some(i)) => {
                let magnitude = i.unsigned_abs();
                let digits = match verb {
                    'b' => format!("{:b}", magnitude),
                    'o' => format!("{:o}", magnitude),
                    'x' => format!("{:x}", magnitude),
                    _ => format!("{:X}", magnitude),
                };
                let digits = if directive.sharp {
                    match verb {
                        'o' => format!("0{}", digits),
                        'x' => format!("0x{}", digits),
                        'X' => format!("0X{}", digits),
                        _ => digits,
                    }
                } else {
                    digits
                };
                signed(digits, i < 0, directive)
            }
            _ => bad_verb(verb, arg),
        },
        'c' => match as_integer(arg)
            .and_then(|i| u32::try_from(i).ok())
            .and_then(char::from_u32)
        {
            Some(c) => c.to_string(),
            None => bad_verb(verb, arg),
        },
        'f' | 'F' | 'e' | 'E' | 'g' | 'G' => match arg.as_f64() {
            Some(x) => {
                let body = match verb {
                    'f' | 'F' => format!("{:.*}", directive.precision.unwrap_or(6), x.abs()),
                    'e' | 'E' => {
                        let raw = format!("{:.*e}", directive.precision.unwrap_or(6), x.abs());
                        let formatted = go_exponent(&raw);
                        if verb == 'E' {
                            formatted.to_uppercase()
                        } else {
                            formatted
                        }
                    }
                    _ => match directive.precision {
                        Some(p) => format!("{:.*}", p, x.abs()),
                        None => format_float(x.abs()),
                    },
                };
                signed(body, x.is_sign_negative() && x != 0.0, directive)
            }
            None => bad_verb(verb, arg),
        },
        'T' => arg.type_name().to_string(),
        _ => bad_verb(verb, arg),
    }
}

/// Rust writes `1.5e3`, Go writes `1.5e+03`.
fn go_exponent(raw: &str) -> String {
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => raw.to_string(),
    }
}

fn truncate(s: &str, precision: Option<usize>) -> String {
    match precision {
        Some(p) => s.chars().take(p).collect(),
        None => s.to_string(),
    }
}

fn pad(body: String, directive: &Directive, verb: char, arg: &Value) -> String {
    let width = match directive.width {
        Some(w) => w,
        None => return body,
    };
    let len = body.chars().count();
    if len >= width {
        return body;
    }
    let fill = width - len;
    if directive.minus {
        return format!("{}{}", body, " ".repeat(fill));
    }
    let numeric = arg.as_f64().is_some() && "dbcoxXeEfFgG".contains(verb);
    if directive.zero && numeric {
        let (sign, digits) = match body.chars().next() {
            Some(c @ ('-' | '+' | ' ')) => (c.to_string(), body[1..].to_string()),
            _ => (String::new(), body),
        };
        return format!("{}{}{}", sign, "0".repeat(fill), digits);
    }
    format!("{}{}", " ".repeat(fill), body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprint_spacing() {
        assert_eq!(sprint(&[Value::from("a"), Value::Int(1), Value::Int(2)]), "a1 2");
        assert_eq!(sprint(&[Value::from("a"), Value::from("b")]), "ab");
    }

    #[test]
    fn test_sprintf_verbs() {
        assert_eq!(
            sprintf("%s-%d", &[Value::from("app"), Value::Int(3)]),
            "app-3"
        );
        assert_eq!(sprintf("%05.2f", &[Value::Float(3.14159)]), "03.14");
        assert_eq!(sprintf("%q", &[Value::from("a\"b")]), "\"a\\\"b\"");
        assert_eq!(sprintf("%-4s|", &[Value::from("x")]), "x   |");
        assert_eq!(sprintf("%x", &[Value::Int(255)]), "ff");
        assert_eq!(sprintf("100%%", &[]), "100%");
        assert_eq!(sprintf("%v", &[Value::List(vec![Value::Int(1)])]), "[1]");
    }

    #[test]
    fn test_sprintf_mismatches() {
        assert_eq!(sprintf("%d", &[]), "%!d(MISSING)");
        assert_eq!(sprintf("%d", &[Value::from("x")]), "%!d(string=x)");
        assert_eq!(
            sprintf("%s", &[Value::from("a"), Value::Int(1)]),
            "a%!(EXTRA int64=1)"
        );
    }

    #[test]
    fn test_exponent() {
        assert_eq!(sprintf("%e", &[Value::Float(1500.0)]), "1.500000e+03");
    }

    #[test]
    fn test_go_quote() {
        assert_eq!(go_quote("a\nb"), "\"a\\nb\"");
        assert_eq!(go_quote("\u{1}"), "\"\\x01\"");
    }
}
