//! Owned snapshots of JavaScript values.
//!
//! Completion values cannot outlive the context lock, so the shell hands
//! back an [`EvalValue`] instead of a `rquickjs::Value`.

use std::fmt;

use rquickjs::convert::Coerced;
use rquickjs::{CatchResultExt, Ctx, Type, Value};

use crate::error::ShellError;

/// A completion value copied out of the sandbox.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Arrays and plain objects, as `JSON.stringify` sees them.
    Json(serde_json::Value),
    /// Functions, symbols, big ints and objects JSON cannot represent.
    Opaque { kind: &'static str, display: String },
}

impl EvalValue {
    pub fn from_js<'js>(ctx: &Ctx<'js>, val: Value<'js>) -> Result<Self, ShellError> {
        let value = match val.type_of() {
            Type::Uninitialized | Type::Undefined => EvalValue::Undefined,
            Type::Null => EvalValue::Null,
            Type::Bool => EvalValue::Bool(val.as_bool().unwrap_or_default()),
            Type::Int => EvalValue::Number(f64::from(val.as_int().unwrap_or_default())),
            Type::Float => EvalValue::Number(val.as_float().unwrap_or_default()),
            Type::String => match val.as_string() {
                Some(s) => EvalValue::String(s.to_string()?),
                None => EvalValue::String(String::new()),
            },
            Type::Function | Type::Constructor => opaque(ctx, "function", val)?,
            Type::Symbol => opaque(ctx, "symbol", val)?,
            Type::BigInt => opaque(ctx, "bigint", val)?,
            Type::Promise => opaque(ctx, "promise", val)?,
            Type::Exception => opaque(ctx, "error", val)?,
            _ => match ctx.json_stringify(val.clone()).catch(ctx) {
                Ok(Some(json)) => {
                    let json = json.to_string()?;
                    match serde_json::from_str(&json) {
                        Ok(parsed) => EvalValue::Json(parsed),
                        Err(_) => opaque(ctx, "object", val)?,
                    }
                }
                // Cyclic structures, objects with throwing toJSON, ...
                Ok(None) | Err(_) => opaque(ctx, "object", val)?,
            },
        };
        Ok(value)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, EvalValue::Undefined)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            EvalValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            EvalValue::String(s) => Some(s),
            _ => None,
        }
    }
}

fn opaque<'js>(ctx: &Ctx<'js>, kind: &'static str, val: Value<'js>) -> Result<EvalValue, ShellError> {
    // Symbols refuse implicit string conversion; everything else coerces.
    let display = if kind == "symbol" {
        "Symbol()".to_string()
    } else {
        match val.get::<Coerced<String>>().catch(ctx) {
            Ok(Coerced(s)) => s,
            Err(_) => format!("[{}]", kind),
        }
    };
    Ok(EvalValue::Opaque { kind, display })
}

/// Format a number the way JavaScript's `String(n)` does.
fn js_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return n.to_string();
    }
    // Shortest round-trip digits, with an explicit sign on the exponent.
    let exp = format!("{:e}", n);
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{}e+{}", mantissa, power),
        _ => exp,
    }
}

impl fmt::Display for EvalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalValue::Undefined => f.write_str("undefined"),
            EvalValue::Null => f.write_str("null"),
            EvalValue::Bool(b) => write!(f, "{}", b),
            EvalValue::Number(n) => f.write_str(&js_number(*n)),
            EvalValue::String(s) => f.write_str(s),
            EvalValue::Json(json) => write!(f, "{}", json),
            EvalValue::Opaque { display, .. } => f.write_str(display),
        }
    }
}
