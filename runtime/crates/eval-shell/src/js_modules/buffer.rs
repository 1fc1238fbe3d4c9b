//! Buffer module - Node.js Buffer class.
//!
//! The class itself is a JS shim; the hex/base64/utf8/latin1 codecs are native.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use rquickjs::{Ctx, Exception, Function, Object, Result};

// Embedded JS shim for Buffer
const BUFFER_JS: &str = include_str!("shims/buffer.js");

pub(crate) fn encode(bytes: &[u8], encoding: &str) -> std::result::Result<String, String> {
    match encoding {
        "utf8" => Ok(String::from_utf8_lossy(bytes).into_owned()),
        "hex" => Ok(bytes.iter().map(|b| format!("{:02x}", b)).collect()),
        "base64" => Ok(STANDARD.encode(bytes)),
        "latin1" | "ascii" => Ok(bytes.iter().map(|&b| b as char).collect()),
        other => Err(format!("Unknown encoding: {}", other)),
    }
}

pub(crate) fn decode(text: &str, encoding: &str) -> std::result::Result<Vec<u8>, String> {
    match encoding {
        "utf8" => Ok(text.as_bytes().to_vec()),
        "hex" => {
            // Like Node, stop at the first invalid pair.
            let digits: Vec<u8> = text.bytes().collect();
            let mut out = Vec::with_capacity(digits.len() / 2);
            for pair in digits.chunks_exact(2) {
                match std::str::from_utf8(pair).ok().and_then(|p| u8::from_str_radix(p, 16).ok()) {
                    Some(b) => out.push(b),
                    None => break,
                }
            }
            Ok(out)
        }
        "base64" => {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(&compact)
                .or_else(|_| STANDARD_NO_PAD.decode(compact.trim_end_matches('=')))
                .map_err(|e| format!("Invalid base64: {}", e))
        }
        "latin1" | "ascii" => Ok(text.chars().map(|c| c as u32 as u8).collect()),
        other => Err(format!("Unknown encoding: {}", other)),
    }
}

/// Create the Buffer class.
pub fn create<'js>(ctx: &Ctx<'js>) -> Result<Function<'js>> {
    let codec = Object::new(ctx.clone())?;
    codec.set(
        "encode",
        Function::new(
            ctx.clone(),
            |ctx: Ctx<'js>, bytes: Vec<u8>, encoding: String| -> Result<String> {
                encode(&bytes, &encoding).map_err(|e| Exception::throw_type(&ctx, &e))
            },
        )?,
    )?;
    codec.set(
        "decode",
        Function::new(
            ctx.clone(),
            |ctx: Ctx<'js>, text: String, encoding: String| -> Result<Vec<u8>> {
                decode(&text, &encoding).map_err(|e| Exception::throw_type(&ctx, &e))
            },
        )?,
    )?;

    let factory: Function = ctx.eval(BUFFER_JS)?;
    factory.call((codec,))
}

/// Install Buffer class on the global object.
pub fn install(ctx: &Ctx<'_>) -> Result<()> {
    let buffer = create(ctx)?;
    ctx.globals().set("Buffer", buffer)?;
    Ok(())
}
