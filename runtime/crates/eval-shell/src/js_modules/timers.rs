//! Timers - setTimeout, clearTimeout, setImmediate.
//!
//! Each timer is a future spawned on the QuickJS runtime. Zero-delay timers
//! and immediates fire at the end of the evaluation that scheduled them;
//! longer delays fire while the runtime is driven, i.e. while a pending
//! result or `Shell::idle` is awaited. Delays use `tokio::time`, so a Tokio
//! runtime must be current.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use rquickjs::prelude::{Opt, Rest};
use rquickjs::{CatchResultExt, Ctx, Function, Result, Value};

#[derive(Default)]
struct Timers {
    next_id: Cell<u32>,
    active: RefCell<HashSet<u32>>,
}

impl Timers {
    fn register(&self) -> u32 {
        let id = self.next_id.get().wrapping_add(1);
        self.next_id.set(id);
        self.active.borrow_mut().insert(id);
        id
    }

    /// Remove a timer, returning whether it was still armed.
    fn take(&self, id: u32) -> bool {
        self.active.borrow_mut().remove(&id)
    }
}

fn delay_from_ms(ms: Option<f64>) -> Duration {
    match ms {
        Some(ms) if ms.is_finite() && ms > 0.0 => Duration::from_millis(ms as u64),
        _ => Duration::ZERO,
    }
}

fn schedule<'js>(
    ctx: &Ctx<'js>,
    timers: &Rc<Timers>,
    callback: Function<'js>,
    delay: Duration,
    args: Vec<Value<'js>>,
) -> u32 {
    let id = timers.register();
    let timers = timers.clone();
    let cb_ctx = ctx.clone();
    ctx.spawn(async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if !timers.take(id) {
            return;
        }
        if let Err(err) = callback.call::<_, ()>((Rest(args),)).catch(&cb_ctx) {
            tracing::warn!(timer = id, error = %err, "timer callback threw");
        }
    });
    id
}

/// Install timer functions on the global object.
pub fn install<'js>(ctx: &Ctx<'js>) -> Result<()> {
    let globals = ctx.globals();
    let timers = Rc::new(Timers::default());

    let state = timers.clone();
    let set_timeout = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, callback: Function<'js>, ms: Opt<f64>, args: Rest<Value<'js>>| -> u32 {
            schedule(&ctx, &state, callback, delay_from_ms(ms.0), args.0)
        },
    )?
    .with_name("setTimeout")?;
    globals.set("setTimeout", set_timeout)?;

    let state = timers.clone();
    let set_immediate = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, callback: Function<'js>, args: Rest<Value<'js>>| -> u32 {
            schedule(&ctx, &state, callback, Duration::ZERO, args.0)
        },
    )?
    .with_name("setImmediate")?;
    globals.set("setImmediate", set_immediate)?;

    let state = timers;
    let clear_timeout = Function::new(ctx.clone(), move |id: Opt<u32>| {
        if let Some(id) = id.0 {
            state.take(id);
        }
    })?
    .with_name("clearTimeout")?;
    globals.set("clearTimeout", clear_timeout.clone())?;
    globals.set("clearImmediate", clear_timeout)?;

    Ok(())
}
