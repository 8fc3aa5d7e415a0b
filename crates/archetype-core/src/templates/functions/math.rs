//! Arithmetic helpers
//!
//! Integer helpers coerce their operands leniently, so numeric strings and
//! floats from configuration files work without explicit conversion.

use crate::templates::functions::{int_arg, string_arg, to_float64, to_int64, Arity, FunctionRegistry};
use crate::templates::value::Value;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register("add", Arity::AtLeast(0), |a| {
        Ok(Value::Int(a.iter().map(to_int64).fold(0i64, i64::wrapping_add)))
    });
    registry.register("add1", Arity::Exact(1), |a| {
        Ok(Value::Int(to_int64(&a[0]).wrapping_add(1)))
    });
    registry.register("sub", Arity::Exact(2), |a| {
        Ok(Value::Int(to_int64(&a[0]).wrapping_sub(to_int64(&a[1]))))
    });
    registry.register("mul", Arity::AtLeast(1), |a| {
        Ok(Value::Int(a.iter().map(to_int64).fold(1i64, i64::wrapping_mul)))
    });
    registry.register("div", Arity::Exact(2), |a| {
        let divisor = to_int64(&a[1]);
        if divisor == 0 {
            return Err("integer divide by zero".to_string());
        }
        Ok(Value::Int(to_int64(&a[0]).wrapping_div(divisor)))
    });
    registry.register("mod", Arity::Exact(2), |a| {
        let divisor = to_int64(&a[1]);
        if divisor == 0 {
            return Err("integer divide by zero".to_string());
        }
        Ok(Value::Int(to_int64(&a[0]).wrapping_rem(divisor)))
    });
    registry.register("max", Arity::AtLeast(1), |a| {
        Ok(Value::Int(a.iter().map(to_int64).max().unwrap_or(0)))
    });
    registry.register("min", Arity::AtLeast(1), |a| {
        Ok(Value::Int(a.iter().map(to_int64).min().unwrap_or(0)))
    });
    registry.register("floor", Arity::Exact(1), |a| Ok(Value::Float(to_float64(&a[0]).floor())));
    registry.register("ceil", Arity::Exact(1), |a| Ok(Value::Float(to_float64(&a[0]).ceil())));
    registry.register("round", Arity::Between(2, 3), round);
    registry.register("int", Arity::Exact(1), |a| Ok(Value::Int(to_int64(&a[0]))));
    registry.register("int64", Arity::Exact(1), |a| Ok(Value::Int(to_int64(&a[0]))));
    registry.register("float64", Arity::Exact(1), |a| Ok(Value::Float(to_float64(&a[0]))));
    registry.register("atoi", Arity::Exact(1), |a| {
        Ok(Value::Int(string_arg(a, 0)?.parse().unwrap_or(0)))
    });
}

/// Round to `places` decimals; the fractional part rounds up at `round_on`
/// (0.5 unless given).
fn round(args: &[Value]) -> Result<Value, String> {
    let value = to_float64(&args[0]);
    let places = int_arg(args, 1)?;
    let round_on = args.get(2).map(to_float64).unwrap_or(0.5);
    let pow = 10f64.powi(places as i32);
    let digit = pow * value;
    let fraction = digit.fract();
    let rounded = if fraction >= round_on {
        digit.ceil()
    } else {
        digit.floor()
    };
    Ok(Value::Float(rounded / pow))
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
    fn test_integer_arithmetic() {
        assert_eq!(call("add", &[Value::Int(1), Value::from("2"), Value::Float(3.7)]).unwrap(), Value::Int(6));
        assert_eq!(call("sub", &[Value::Int(5), Value::Int(7)]).unwrap(), Value::Int(-2));
        assert_eq!(call("mul", &[Value::Int(2), Value::Int(3), Value::Int(4)]).unwrap(), Value::Int(24));
        assert_eq!(call("div", &[Value::Int(7), Value::Int(2)]).unwrap(), Value::Int(3));
        assert_eq!(call("mod", &[Value::Int(7), Value::Int(2)]).unwrap(), Value::Int(1));
        assert!(call("div", &[Value::Int(1), Value::Int(0)]).is_err());
    }

    #[test]
    fn test_min_max() {
        assert_eq!(call("max", &[Value::Int(1), Value::Int(9), Value::Int(3)]).unwrap(), Value::Int(9));
        assert_eq!(call("min", &[Value::Int(4), Value::Int(-1)]).unwrap(), Value::Int(-1));
    }

    #[test]
    fn test_round() {
        assert_eq!(call("round", &[Value::Float(123.5556), Value::Int(3)]).unwrap(), Value::Float(123.556));
        assert_eq!(call("round", &[Value::Float(2.4), Value::Int(0)]).unwrap(), Value::Float(2.0));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(call("atoi", &[Value::from("42")]).unwrap(), Value::Int(42));
        assert_eq!(call("atoi", &[Value::from("x")]).unwrap(), Value::Int(0));
        assert_eq!(call("float64", &[Value::from("1.5")]).unwrap(), Value::Float(1.5));
    }
}
