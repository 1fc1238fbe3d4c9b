//! Async bridge: `runAsync(starter)`.
//!
//! `runAsync` creates a fresh handle, calls `starter(handle)` synchronously
//! and returns the handle's promise. The starter arranges for
//! `handle.resolve(value)` or `handle.reject(error)` to be called later.
//!
//! A handle settles exactly once. The first `resolve`/`reject` returns
//! `true`; every later call is a no-op returning `false`. Nothing times a
//! handle out: if the starter never settles it, the promise stays pending.

use std::cell::Cell;
use std::rc::Rc;

use rquickjs::prelude::Opt;
use rquickjs::{Ctx, Function, Object, Promise, Result, Value};

/// Install `runAsync` on the global object.
pub fn install<'js>(ctx: &Ctx<'js>) -> Result<()> {
    let run_async = Function::new(ctx.clone(), |ctx: Ctx<'js>, starter: Function<'js>| {
        run_async(ctx, starter)
    })?
    .with_name("runAsync")?;
    ctx.globals().set("runAsync", run_async)?;
    Ok(())
}

fn run_async<'js>(ctx: Ctx<'js>, starter: Function<'js>) -> Result<Promise<'js>> {
    let (promise, resolve, reject) = Promise::new(&ctx)?;
    let handle = create_handle(&ctx, promise.clone(), resolve, reject)?;
    starter.call::<_, ()>((handle,))?;
    Ok(promise)
}

/// Build the `{ resolve, reject, isPending, promise }` handle object.
pub fn create_handle<'js>(
    ctx: &Ctx<'js>,
    promise: Promise<'js>,
    resolve: Function<'js>,
    reject: Function<'js>,
) -> Result<Object<'js>> {
    let settled = Rc::new(Cell::new(false));
    let handle = Object::new(ctx.clone())?;

    let state = settled.clone();
    let resolve_fn = Function::new(ctx.clone(), move |value: Opt<Value<'js>>| -> Result<bool> {
        if state.replace(true) {
            return Ok(false);
        }
        resolve.call::<_, ()>((value.0,))?;
        Ok(true)
    })?
    .with_name("resolve")?;
    handle.set("resolve", resolve_fn)?;

    let state = settled.clone();
    let reject_fn = Function::new(ctx.clone(), move |error: Opt<Value<'js>>| -> Result<bool> {
        if state.replace(true) {
            return Ok(false);
        }
        reject.call::<_, ()>((error.0,))?;
        Ok(true)
    })?
    .with_name("reject")?;
    handle.set("reject", reject_fn)?;

    let state = settled;
    let is_pending = Function::new(ctx.clone(), move || !state.get())?.with_name("isPending")?;
    handle.set("isPending", is_pending)?;

    handle.set("promise", promise)?;
    Ok(handle)
}
