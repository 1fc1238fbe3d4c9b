//! events module - EventEmitter.
//!
//! `require('events')` is the class itself, with `EventEmitter` as a
//! self-referencing property.

use rquickjs::{Ctx, Function, Result};

const EVENTS_JS: &str = include_str!("shims/events.js");

/// Create the EventEmitter class.
pub fn create<'js>(ctx: &Ctx<'js>) -> Result<Function<'js>> {
    let factory: Function = ctx.eval(EVENTS_JS)?;
    factory.call(())
}
