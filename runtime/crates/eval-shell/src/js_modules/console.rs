//! Console module - captures output for the host.
//!
//! Every line is emitted as a `tracing` event and kept in the shell's
//! [`ConsoleLog`] until the embedder drains it. The log holds at most
//! [`CAPTURE_LIMIT`] lines; older lines are dropped first.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rquickjs::prelude::Rest;
use rquickjs::{Ctx, Function, Object, Result, Value};

use crate::value::EvalValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn method(self) -> &'static str {
        match self {
            Level::Log => "log",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }
}

/// Maximum number of lines a [`ConsoleLog`] keeps.
pub const CAPTURE_LIMIT: usize = 1000;

/// Captured console output of one shell.
#[derive(Debug, Clone, Default)]
pub struct ConsoleLog {
    lines: Rc<RefCell<VecDeque<(Level, String)>>>,
}

impl ConsoleLog {
    fn push(&self, level: Level, line: String) {
        match level {
            Level::Warn => tracing::warn!(target: "eval_shell::console", "{}", line),
            Level::Error => tracing::error!(target: "eval_shell::console", "{}", line),
            Level::Debug => tracing::debug!(target: "eval_shell::console", "{}", line),
            Level::Log | Level::Info => tracing::info!(target: "eval_shell::console", "{}", line),
        }
        let mut lines = self.lines.borrow_mut();
        if lines.len() == CAPTURE_LIMIT {
            lines.pop_front();
        }
        lines.push_back((level, line));
    }

    /// Take all captured lines, oldest first.
    pub fn take(&self) -> Vec<(Level, String)> {
        std::mem::take(&mut *self.lines.borrow_mut()).into()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.borrow().is_empty()
    }
}

/// Format console arguments the way `console.log` joins them.
fn format_args_to_string<'js>(ctx: &Ctx<'js>, args: Vec<Value<'js>>) -> String {
    args.into_iter()
        .map(|v| value_to_string(ctx, v))
        .collect::<Vec<_>>()
        .join(" ")
}

fn value_to_string<'js>(ctx: &Ctx<'js>, val: Value<'js>) -> String {
    match EvalValue::from_js(ctx, val) {
        Ok(EvalValue::Json(json)) => json.to_string(),
        Ok(other) => other.to_string(),
        Err(e) => format!("[unprintable: {}]", e),
    }
}

/// Install console bindings on the global object.
pub fn install<'js>(ctx: &Ctx<'js>, log: &ConsoleLog) -> Result<()> {
    let console = Object::new(ctx.clone())?;

    for level in [Level::Log, Level::Info, Level::Warn, Level::Error, Level::Debug] {
        let log = log.clone();
        let method = Function::new(ctx.clone(), move |ctx: Ctx<'js>, args: Rest<Value<'js>>| {
            let output = format_args_to_string(&ctx, args.0);
            log.push(level, output);
        })?
        .with_name(level.method())?;
        console.set(level.method(), method)?;
    }

    ctx.globals().set("console", console)?;
    Ok(())
}
