//! Parser for `--set` style `key=value` expressions
//!
//! Supports dotted keys (`a.b.c=1`), list indices (`a[0].b=1`), list
//! literals (`a={x,y}`), comma separated pairs and backslash escapes.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::templates::Value;

/// Largest list index accepted, to keep `a[99999999]=x` from allocating
pub const MAX_INDEX: i64 = 65536;

/// A malformed `--set` expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct StrvalsError(pub String);

/// Converts the raw text of a value into a tree node
pub type ValueReader<'a> = dyn Fn(&str) -> Result<Value, String> + 'a;

/// Parse `s` into a fresh map
pub fn parse(s: &str) -> Result<BTreeMap<String, Value>, StrvalsError> {
    let mut dest = BTreeMap::new();
    parse_into(s, &mut dest)?;
    Ok(dest)
}

/// Parse `s` into `dest`, inferring scalar types
pub fn parse_into(s: &str, dest: &mut BTreeMap<String, Value>) -> Result<(), StrvalsError> {
    let reader = |raw: &str| -> Result<Value, String> { Ok(typed_value(raw)) };
    Parser::new(s, &reader).parse(dest)
}

/// Parse `s` into `dest`, keeping every value a string
pub fn parse_into_string(s: &str, dest: &mut BTreeMap<String, Value>) -> Result<(), StrvalsError> {
    let reader = |raw: &str| -> Result<Value, String> { Ok(Value::String(raw.to_string())) };
    Parser::new(s, &reader).parse(dest)
}

/// Parse `s` into `dest`, passing each value through `reader`
///
/// `--set-file` uses this with a reader that loads the named file.
pub fn parse_into_with(
    s: &str,
    dest: &mut BTreeMap<String, Value>,
    reader: &ValueReader<'_>,
) -> Result<(), StrvalsError> {
    Parser::new(s, reader).parse(dest)
}

/// Infer the type of a `--set` value.
///
/// `true`/`false`/`null` match case-insensitively. Integers are only
/// recognised when they do not start with `0`, so `0123` stays a string.
pub fn typed_value(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if raw.eq_ignore_ascii_case("null") {
        return Value::Nil;
    }
    if raw == "0" {
        return Value::Int(0);
    }
    if !raw.is_empty() && !raw.starts_with('0') {
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Int(i);
        }
    }
    Value::String(raw.to_string())
}

enum Halt {
    Eof,
    NotList,
    Error(String),
}

impl Halt {
    fn error(message: impl Into<String>) -> Self {
        Halt::Error(message.into())
    }
}

type Step<T> = Result<T, Halt>;

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    reader: &'a ValueReader<'a>,
}

impl<'a> Parser<'a> {
    fn new(input: &str, reader: &'a ValueReader<'a>) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            reader,
        }
    }

    fn parse(&mut self, data: &mut BTreeMap<String, Value>) -> Result<(), StrvalsError> {
        loop {
            match self.key(data) {
                Ok(()) => continue,
                Err(Halt::Eof) => return Ok(()),
                Err(Halt::NotList) => return Err(StrvalsError("not a list".to_string())),
                Err(Halt::Error(message)) => return Err(StrvalsError(message)),
            }
        }
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        Some(c)
    }

    fn back(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    /// Collect characters up to one of `stop`, honouring `\` escapes.
    /// The stop character is consumed; `None` means end of input.
    fn until(&mut self, stop: &[char]) -> (String, Option<char>) {
        let mut collected = String::new();
        loop {
            match self.next_char() {
                None => return (collected, None),
                Some(c) if stop.contains(&c) => return (collected, Some(c)),
                Some('\\') => match self.next_char() {
                    Some(escaped) => collected.push(escaped),
                    None => return (collected, None),
                },
                Some(c) => collected.push(c),
            }
        }
    }

    fn read_value(&self, raw: &str) -> Step<Value> {
        (self.reader)(raw).map_err(Halt::Error)
    }

    fn key(&mut self, data: &mut BTreeMap<String, Value>) -> Step<()> {
        let (key, last) = self.until(&['=', '[', ',', '.']);
        match last {
            None if key.is_empty() => Err(Halt::Eof),
            None => Err(Halt::error(format!("key {:?} has no value", key))),
            Some('[') => {
                let index = self
                    .index()
                    .map_err(|e| Halt::error(format!("error parsing index: {}", e)))?;
                let list = match data.get(&key) {
                    Some(Value::List(list)) => list.clone(),
                    _ => Vec::new(),
                };
                let (list, result) = self.list_item(list, index);
                set(data, key, Value::List(list));
                result
            }
            Some('=') => match self.list_literal() {
                Ok(list) => {
                    set(data, key, Value::List(list));
                    Ok(())
                }
                Err(Halt::Eof) => {
                    set(data, key, Value::String(String::new()));
                    Err(Halt::Eof)
                }
                Err(Halt::NotList) => {
                    let raw = self.scalar();
                    let value = self.read_value(&raw)?;
                    set(data, key, value);
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Some(',') => {
                set(data, key.clone(), Value::String(String::new()));
                Err(Halt::error(format!(
                    "key {:?} has no value (cannot end with ,)",
                    key
                )))
            }
            Some(_) => {
                // '.': descend into a nested map, replacing non-map values
                let mut inner = match data.get(&key) {
                    Some(Value::Map(map)) => map.clone(),
                    _ => BTreeMap::new(),
                };
                let result = self.key(&mut inner);
                if inner.is_empty() {
                    return Err(Halt::error(format!("key map {:?} has no value", key)));
                }
                set(data, key, Value::Map(inner));
                result
            }
        }
    }

    fn index(&mut self) -> Result<i64, String> {
        let (raw, last) = self.until(&[']']);
        if last.is_none() {
            return Err("EOF".to_string());
        }
        raw.parse::<i64>()
            .map_err(|e| format!("parsing {:?}: {}", raw, e))
    }

    fn list_item(&mut self, list: Vec<Value>, index: i64) -> (Vec<Value>, Step<()>) {
        if index < 0 {
            return (list, Err(Halt::error(format!("negative {} index not allowed", index))));
        }
        let (rest, last) = self.until(&['[', '.', '=']);
        if !rest.is_empty() {
            return (
                list,
                Err(Halt::error(format!(
                    "unexpected data at end of array index: {:?}",
                    rest
                ))),
            );
        }
        match last {
            None => (list, Err(Halt::Eof)),
            Some('=') => match self.list_literal() {
                Ok(values) => set_index(list, index, Value::List(values)),
                Err(Halt::Eof) => set_index(list, index, Value::String(String::new())),
                Err(Halt::NotList) => {
                    let raw = self.scalar();
                    match self.read_value(&raw) {
                        Ok(value) => set_index(list, index, value),
                        Err(e) => (list, Err(e)),
                    }
                }
                Err(e) => (list, Err(e)),
            },
            Some('[') => {
                let next = match self.index() {
                    Ok(next) => next,
                    Err(e) => {
                        return (list, Err(Halt::error(format!("error parsing index: {}", e))))
                    }
                };
                let nested = match list.get(index as usize) {
                    Some(Value::List(nested)) => nested.clone(),
                    _ => Vec::new(),
                };
                let (nested, result) = self.list_item(nested, next);
                if let Err(e) = result {
                    return (list, Err(e));
                }
                set_index(list, index, Value::List(nested))
            }
            Some(_) => {
                // '.': a map inside the list element
                let mut inner = match list.get(index as usize) {
                    Some(Value::Map(map)) => map.clone(),
                    _ => BTreeMap::new(),
                };
                if let Err(e) = self.key(&mut inner) {
                    return (list, Err(e));
                }
                set_index(list, index, Value::Map(inner))
            }
        }
    }

    fn scalar(&mut self) -> String {
        self.until(&[',']).0
    }

    /// Parse a `{a,b,c}` literal; `NotList` when the value does not open one
    fn list_literal(&mut self) -> Step<Vec<Value>> {
        match self.next_char() {
            None => return Err(Halt::Eof),
            Some('{') => {}
            Some(_) => {
                self.back();
                return Err(Halt::NotList);
            }
        }

        let mut list = Vec::new();
        loop {
            let (raw, last) = self.until(&[',', '}']);
            match last {
                None => return Err(Halt::error("list must terminate with '}'")),
                Some('}') => {
                    if let Some(c) = self.next_char() {
                        if c != ',' {
                            self.back();
                        }
                    }
                    list.push(self.read_value(&raw)?);
                    return Ok(list);
                }
                Some(_) => list.push(self.read_value(&raw)?),
            }
        }
    }
}

fn set(data: &mut BTreeMap<String, Value>, key: String, value: Value) {
    if key.is_empty() {
        return;
    }
    data.insert(key, value);
}

fn set_index(mut list: Vec<Value>, index: i64, value: Value) -> (Vec<Value>, Step<()>) {
    if index < 0 {
        return (list, Err(Halt::error(format!("negative {} index not allowed", index))));
    }
    if index > MAX_INDEX {
        return (
            list,
            Err(Halt::error(format!(
                "index of {} is greater than maximum supported index of {}",
                index, MAX_INDEX
            ))),
        );
    }
    let index = index as usize;
    if list.len() <= index {
        list.resize(index + 1, Value::Nil);
    }
    list[index] = value;
    (list, Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> BTreeMap<String, Value> {
        match Value::from(serde_yaml::from_str::<serde_yaml::Value>(src).unwrap()) {
            Value::Map(map) => map,
            other => panic!("not a map: {:?}", other),
        }
    }

    #[test]
    fn test_scalars_are_typed() {
        let got = parse("name=web,replicas=3,on=TRUE,off=false,gone=null,zero=0,padded=0123,neg=-2").unwrap();
        assert_eq!(got["name"], Value::from("web"));
        assert_eq!(got["replicas"], Value::Int(3));
        assert_eq!(got["on"], Value::Bool(true));
        assert_eq!(got["off"], Value::Bool(false));
        assert_eq!(got["gone"], Value::Nil);
        assert_eq!(got["zero"], Value::Int(0));
        assert_eq!(got["padded"], Value::from("0123"));
        assert_eq!(got["neg"], Value::Int(-2));
    }

    #[test]
    fn test_nested_keys() {
        assert_eq!(
            parse("image.repo=nginx,image.tag=1.25,a.b.c=x").unwrap(),
            yaml("image: {repo: nginx, tag: \"1.25\"}\na: {b: {c: x}}\n")
        );
    }

    #[test]
    fn test_list_literal_and_indices() {
        assert_eq!(parse("ports={80,443}").unwrap(), yaml("ports: [80, 443]"));
        assert_eq!(
            parse("hosts[1]=b,hosts[0]=a").unwrap(),
            yaml("hosts: [a, b]")
        );
        assert_eq!(
            parse("env[0].name=A,env[0].value=1").unwrap(),
            yaml("env: [{name: A, value: 1}]")
        );
        assert_eq!(parse("m[0][1]=x").unwrap(), yaml("m: [[null, x]]"));
    }

    #[test]
    fn test_escapes() {
        assert_eq!(
            parse(r"msg=a\,b,dotted\.key=v").unwrap(),
            yaml("msg: a,b\ndotted.key: v\n")
        );
    }

    #[test]
    fn test_empty_value() {
        assert_eq!(parse("name=").unwrap(), yaml("name: \"\""));
    }

    #[test]
    fn test_string_reader() {
        let mut dest = BTreeMap::new();
        parse_into_string("replicas=3,on=true", &mut dest).unwrap();
        assert_eq!(dest["replicas"], Value::from("3"));
        assert_eq!(dest["on"], Value::from("true"));
    }

    #[test]
    fn test_custom_reader() {
        let mut dest = BTreeMap::new();
        let reader = |raw: &str| -> Result<Value, String> { Ok(Value::String(format!("<{}>", raw))) };
        parse_into_with("cert=tls.crt", &mut dest, &reader).unwrap();
        assert_eq!(dest["cert"], Value::from("<tls.crt>"));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("name").unwrap_err().to_string(), "key \"name\" has no value");
        assert_eq!(
            parse("name,").unwrap_err().to_string(),
            "key \"name\" has no value (cannot end with ,)"
        );
        assert!(parse("a={x,y").unwrap_err().to_string().contains("list must terminate"));
        assert!(parse("a[x]=1").unwrap_err().to_string().starts_with("error parsing index"));
        assert!(parse("a[-1]=1").unwrap_err().to_string().contains("negative -1 index"));
        assert!(parse("a[0]x=1").unwrap_err().to_string().contains("unexpected data"));
        assert!(parse("a[70000]=1").unwrap_err().to_string().contains("maximum supported index"));
    }

    #[test]
    fn test_merges_into_existing() {
        let mut dest = yaml("image: {repo: nginx, tag: latest}");
        parse_into("image.tag=1.0", &mut dest).unwrap();
        assert_eq!(dest, yaml("image: {repo: nginx, tag: \"1.0\"}"));
    }
}
