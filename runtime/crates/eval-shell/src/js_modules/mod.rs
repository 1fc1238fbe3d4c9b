//! JavaScript module bindings for the QuickJS runtime.
//!
//! Globals (`Buffer`, `console`, timers) are installed once per context.
//! The builtin modules are created on demand by the resolver.
//! JS shims are embedded as separate .js files for IDE linting support.

pub mod buffer;
pub mod console;
pub mod crypto;
pub mod events;
pub mod fs;
pub mod os;
pub mod path;
pub mod querystring;
pub mod timers;
pub mod url;
pub mod util;

pub use console::{ConsoleLog, Level};

use rquickjs::{Ctx, IntoJs, Result, Value};

/// Install the global bindings provided by this module set.
pub fn install_all(ctx: &Ctx<'_>, console_log: &ConsoleLog) -> Result<()> {
    console::install(ctx, console_log)?;
    timers::install(ctx)?; // before fs, whose callbacks use setImmediate
    buffer::install(ctx)?;
    Ok(())
}

/// Create a builtin module's export value by name.
///
/// Returns `None` for names this host does not implement.
pub fn create_builtin<'js>(ctx: &Ctx<'js>, name: &str) -> Option<Result<Value<'js>>> {
    let module = match name {
        "crypto" => crypto::create(ctx).and_then(|m| m.into_js(ctx)),
        "events" => events::create(ctx).and_then(|m| m.into_js(ctx)),
        "fs" => fs::create(ctx).and_then(|m| m.into_js(ctx)),
        "os" => os::create(ctx).and_then(|m| m.into_js(ctx)),
        "path" => path::create(ctx).and_then(|m| m.into_js(ctx)),
        "querystring" => querystring::create(ctx).and_then(|m| m.into_js(ctx)),
        "url" => url::create(ctx).and_then(|m| m.into_js(ctx)),
        "util" => util::create(ctx).and_then(|m| m.into_js(ctx)),
        _ => return None,
    };
    Some(module)
}
