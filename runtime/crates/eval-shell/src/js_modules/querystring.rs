//! querystring module - parse and stringify URL query strings.

use rquickjs::{Ctx, Function, Object, Result};

const QUERYSTRING_JS: &str = include_str!("shims/querystring.js");

/// Create the `querystring` module object.
pub fn create<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
    let factory: Function = ctx.eval(QUERYSTRING_JS)?;
    factory.call(())
}
