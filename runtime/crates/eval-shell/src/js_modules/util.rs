//! util module - format, inspect, inherits, promisify.

use rquickjs::{Ctx, Function, Object, Result};

const UTIL_JS: &str = include_str!("shims/util.js");

/// Create the `util` module object.
pub fn create<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
    let factory: Function = ctx.eval(UTIL_JS)?;
    factory.call(())
}
