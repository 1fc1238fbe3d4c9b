//! Crypto module - createHash and createHmac.
//!
//! Digests are computed natively over the bytes the shim accumulates.

use digest::Digest;
use hmac::{Hmac, Mac};
use md5::Md5;
use rquickjs::{Ctx, Exception, Function, Object, Result};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

const CRYPTO_JS: &str = include_str!("shims/crypto.js");

/// Supported digest algorithms, as accepted by `createHash`.
pub const HASHES: [&str; 4] = ["md5", "sha1", "sha256", "sha512"];

pub(crate) fn hash(algorithm: &str, data: &[u8]) -> Option<Vec<u8>> {
    let out = match algorithm {
        "md5" => Md5::digest(data).to_vec(),
        "sha1" => Sha1::digest(data).to_vec(),
        "sha256" => Sha256::digest(data).to_vec(),
        "sha512" => Sha512::digest(data).to_vec(),
        _ => return None,
    };
    Some(out)
}

macro_rules! mac {
    ($digest:ty, $key:expr, $data:expr) => {{
        let mut mac = Hmac::<$digest>::new_from_slice($key).map_err(|e| e.to_string())?;
        mac.update($data);
        mac.finalize().into_bytes().to_vec()
    }};
}

pub(crate) fn hmac(
    algorithm: &str,
    key: &[u8],
    data: &[u8],
) -> std::result::Result<Vec<u8>, String> {
    let out = match algorithm {
        "md5" => mac!(Md5, key, data),
        "sha1" => mac!(Sha1, key, data),
        "sha256" => mac!(Sha256, key, data),
        "sha512" => mac!(Sha512, key, data),
        other => return Err(format!("Digest method not supported: {}", other)),
    };
    Ok(out)
}

/// Create the `crypto` module object.
pub fn create<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
    let native = Object::new(ctx.clone())?;
    native.set("hashes", HASHES.to_vec())?;
    native.set(
        "hash",
        Function::new(
            ctx.clone(),
            |ctx: Ctx<'js>, algorithm: String, data: Vec<u8>| -> Result<Vec<u8>> {
                hash(&algorithm, &data)
                    .ok_or_else(|| Exception::throw_message(&ctx, "Digest method not supported"))
            },
        )?,
    )?;
    native.set(
        "hmac",
        Function::new(
            ctx.clone(),
            |ctx: Ctx<'js>, algorithm: String, key: Vec<u8>, data: Vec<u8>| -> Result<Vec<u8>> {
                hmac(&algorithm, &key, &data).map_err(|e| Exception::throw_message(&ctx, &e))
            },
        )?,
    )?;

    let buffer: Function = ctx.globals().get("Buffer")?;
    let factory: Function = ctx.eval(CRYPTO_JS)?;
    factory.call((native, buffer))
}
