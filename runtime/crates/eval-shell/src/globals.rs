//! The global binding set every evaluation sees.
//!
//! `Buffer`, `console`, `require`, `runAsync`, `global` and the timer
//! functions, installed once when the shell's context is created.

use std::rc::{Rc, Weak};

use rquickjs::{Ctx, Exception, Function, Result, Value};

use crate::bridge;
use crate::js_modules::{self, ConsoleLog};
use crate::resolver::ModuleResolver;

/// Install all globals on `ctx`.
pub fn install<'js>(
    ctx: &Ctx<'js>,
    resolver: &Rc<ModuleResolver>,
    console: &ConsoleLog,
) -> Result<()> {
    js_modules::install_all(ctx, console)?;
    install_require(ctx, Rc::downgrade(resolver))?;
    bridge::install(ctx)?;

    let globals = ctx.globals();
    globals.set("global", globals.clone())?;
    Ok(())
}

/// `require(name)` forwards to the shell's resolver.
///
/// The function only holds a weak reference, so the resolver (and every
/// module it caches) can be dropped before the runtime.
fn install_require<'js>(ctx: &Ctx<'js>, resolver: Weak<ModuleResolver>) -> Result<()> {
    let require = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, name: String| -> Result<Value<'js>> {
            match resolver.upgrade() {
                Some(resolver) => resolver.resolve(&ctx, &name),
                None => Err(Exception::throw_message(
                    &ctx,
                    "require called after its shell was dropped",
                )),
            }
        },
    )?
    .with_name("require")?;
    ctx.globals().set("require", require)?;
    Ok(())
}
