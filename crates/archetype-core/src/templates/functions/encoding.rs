//! Encoding, hashing and random-value helpers

use base64::engine::general_purpose::STANDARD;
use base64::{DecodeError, Engine as _};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::templates::functions::{int_arg, to_string, Arity, FunctionRegistry};
use crate::templates::value::Value;

const ALPHA: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const NUMERIC: &[u8] = b"0123456789";
const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register("b64enc", Arity::Exact(1), |a| {
        Ok(STANDARD.encode(to_string(&a[0])).into())
    });
    registry.register("b64dec", Arity::Exact(1), |a| {
        let decoded = match STANDARD.decode(to_string(&a[0])) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => corrupt_input(&e),
        };
        Ok(decoded.into())
    });
    registry.register("toJson", Arity::Exact(1), |a| {
        let json = serde_json::to_string(&a[0]).map_err(|e| e.to_string())?;
        Ok(escape_html_in_json(&json).into())
    });
    registry.register("toPrettyJson", Arity::Exact(1), |a| {
        let json = serde_json::to_string_pretty(&a[0]).map_err(|e| e.to_string())?;
        Ok(escape_html_in_json(&json).into())
    });
    registry.register("sha256sum", Arity::Exact(1), |a| {
        let digest = Sha256::digest(to_string(&a[0]).as_bytes());
        Ok(digest
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>()
            .into())
    });
    registry.register("uuidv4", Arity::Exact(0), |_| {
        Ok(uuid::Uuid::new_v4().to_string().into())
    });
    registry.register("randAlpha", Arity::Exact(1), |a| random_from(a, ALPHA));
    registry.register("randNumeric", Arity::Exact(1), |a| random_from(a, NUMERIC));
    registry.register("randAlphaNum", Arity::Exact(1), |a| random_from(a, ALPHANUMERIC));
    registry.register("randAscii", Arity::Exact(1), |a| {
        let count = random_count(a)?;
        let mut rng = rand::thread_rng();
        Ok((0..count)
            .map(|_| char::from(rng.gen_range(32u8..127)))
            .collect::<String>()
            .into())
    });
}

/// Match Go's encoder, which escapes HTML-significant characters.
fn escape_html_in_json(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

fn random_count(args: &[Value]) -> Result<usize, String> {
    let count = int_arg(args, 0)?;
    usize::try_from(count).map_err(|_| format!("invalid count {}", count))
}

fn random_from(args: &[Value], alphabet: &[u8]) -> Result<Value, String> {
    let count = random_count(args)?;
    let mut rng = rand::thread_rng();
    Ok((0..count)
        .map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())]))
        .collect::<String>()
        .into())
}

/// Describe a decode failure the way Go's base64 package does
fn corrupt_input(err: &DecodeError) -> String {
    let offset = match *err {
        DecodeError::InvalidByte(offset, _) | DecodeError::InvalidLastSymbol(offset, _) => offset,
        // incomplete final quantum
        DecodeError::InvalidLength(len) => len - len % 4,
        DecodeError::InvalidPadding => 0,
    };
    format!("illegal base64 data at input byte {}", offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, String> {
        let mut registry = FunctionRegistry::new();
        register(&mut registry);
        (registry.get(name).unwrap().call)(args)
    }

    #[test]
    fn test_base64() {
        let encoded = call("b64enc", &[Value::from("hello")]).unwrap();
        assert_eq!(encoded, Value::from("aGVsbG8="));
        assert_eq!(call("b64dec", &[encoded]).unwrap(), Value::from("hello"));
    }

    #[test]
    fn test_base64_decode_errors() {
        assert_eq!(
            call("b64dec", &[Value::from("!!!!")]).unwrap(),
            Value::from("illegal base64 data at input byte 0")
        );
        assert_eq!(
            call("b64dec", &[Value::from("aGVs!G8=")]).unwrap(),
            Value::from("illegal base64 data at input byte 4")
        );
        let truncated = call("b64dec", &[Value::from("aGVsb")]).unwrap();
        assert!(to_string(&truncated).starts_with("illegal base64 data at input byte "));
    }

    #[test]
    fn test_to_json() {
        let v = Value::from(serde_json::json!({"b": [1, "<x>"], "a": null}));
        assert_eq!(
            call("toJson", &[v]).unwrap(),
            Value::from(r#"{"a":null,"b":[1,"\u003cx\u003e"]}"#)
        );
    }

    #[test]
    fn test_sha256() {
        assert_eq!(
            call("sha256sum", &[Value::from("abc")]).unwrap(),
            Value::from("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_random_lengths() {
        for name in ["randAlpha", "randNumeric", "randAlphaNum", "randAscii"] {
            let out = call(name, &[Value::Int(12)]).unwrap();
            assert_eq!(out.as_str().map(str::len), Some(12), "{}", name);
        }
        let digits = call("randNumeric", &[Value::Int(20)]).unwrap();
        assert!(digits.as_str().unwrap().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_uuid_shape() {
        let id = call("uuidv4", &[]).unwrap();
        assert_eq!(id.as_str().map(str::len), Some(36));
    }
}
