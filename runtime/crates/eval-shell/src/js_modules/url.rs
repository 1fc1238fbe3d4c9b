//! url module - legacy `url.parse` and `url.format`.
//!
//! Query strings go through the `querystring` module.

use rquickjs::{Ctx, Function, Object, Result};

use super::querystring;

const URL_JS: &str = include_str!("shims/url.js");

/// Create the `url` module object.
pub fn create<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
    let factory: Function = ctx.eval(URL_JS)?;
    factory.call((querystring::create(ctx)?,))
}
