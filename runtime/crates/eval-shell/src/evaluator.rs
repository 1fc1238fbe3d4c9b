//! Sandbox evaluator: one QuickJS runtime and one persistent context.
//!
//! Code runs as a non-strict global script, so `var`, function declarations
//! and assignments to undeclared names all land on the shared global object
//! and survive into later evaluations.
//!
//! After each evaluation the microtask queue is drained and spawned tasks
//! that are already ready (zero-delay timers, immediates, fs callbacks) are
//! run once. Timers with a real delay wait until the runtime is driven again
//! by awaiting a pending result or [`Evaluator::idle`].

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_lite::future::BoxedLocal;
use rquickjs::context::EvalOptions;
use rquickjs::{
    async_with, AsyncContext, AsyncRuntime, CatchResultExt, Ctx, Persistent, Promise, Value,
};

use crate::error::ShellError;
use crate::value::EvalValue;

/// Outcome of evaluating one piece of input.
#[derive(Debug)]
pub enum Evaluation {
    /// The input ran to completion and produced this value.
    Complete(EvalValue),
    /// The input produced a promise, or was a command, and settles later.
    /// Commands do nothing until this is awaited.
    Pending(PendingResult),
}

impl Evaluation {
    pub fn is_pending(&self) -> bool {
        matches!(self, Evaluation::Pending(_))
    }

    /// Wait for the final value, awaiting a pending result if necessary.
    pub async fn resolve(self) -> Result<EvalValue, ShellError> {
        match self {
            Evaluation::Complete(value) => Ok(value),
            Evaluation::Pending(pending) => pending.await,
        }
    }
}

/// A deferred result.
///
/// Awaiting a result produced by code drives the runtime's job queue and
/// spawned timers until its promise settles. Dropping it stops waiting; code
/// that already ran keeps its effects.
///
/// Command results are lazy: a `%module` install starts on the first poll,
/// and dropping the result mid-install kills the package manager, which can
/// leave a partially populated modules directory.
pub struct PendingResult {
    future: BoxedLocal<Result<EvalValue, ShellError>>,
}

impl PendingResult {
    pub(crate) fn new(future: impl Future<Output = Result<EvalValue, ShellError>> + 'static) -> Self {
        Self {
            future: Box::pin(future),
        }
    }
}

impl Future for PendingResult {
    type Output = Result<EvalValue, ShellError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for PendingResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingResult").finish_non_exhaustive()
    }
}

/// A promise waiting to be settled. The promise is declared first so it is
/// released while `context` still keeps the runtime alive.
struct Settle {
    promise: Persistent<Promise<'static>>,
    context: AsyncContext,
    label: String,
}

enum Completion {
    Value(EvalValue),
    Promise(Persistent<Promise<'static>>),
}

pub struct Evaluator {
    context: AsyncContext,
    runtime: AsyncRuntime,
}

impl Evaluator {
    pub async fn new() -> Result<Self, ShellError> {
        let runtime = AsyncRuntime::new()?;
        let context = AsyncContext::full(&runtime).await?;
        Ok(Self { context, runtime })
    }

    /// Run `f` with the persistent context locked.
    pub async fn with<F, R>(&self, f: F) -> R
    where
        F: for<'js> FnOnce(Ctx<'js>) -> R,
    {
        self.context.with(f).await
    }

    /// Evaluate `code`, labeling any error with `label`.
    pub async fn evaluate_code(&self, code: &str, label: &str) -> Result<Evaluation, ShellError> {
        tracing::debug!(%label, len = code.len(), "evaluating code");
        let completion = self
            .context
            .with(|ctx| -> Result<Completion, ShellError> {
                let mut options = EvalOptions::default();
                options.strict = false;
                match ctx.eval_with_options::<Value, _>(code, options).catch(&ctx) {
                    Ok(value) => match value.as_promise() {
                        Some(promise) => Ok(Completion::Promise(Persistent::save(&ctx, promise.clone()))),
                        None => Ok(Completion::Value(EvalValue::from_js(&ctx, value)?)),
                    },
                    Err(caught) => Err(ShellError::evaluation(&ctx, label, caught)),
                }
            })
            .await;
        self.run_ready().await;

        match completion? {
            Completion::Value(value) => Ok(Evaluation::Complete(value)),
            Completion::Promise(promise) => {
                tracing::debug!(%label, "evaluation returned a promise");
                Ok(Evaluation::Pending(self.settle(Settle {
                    promise,
                    context: self.context.clone(),
                    label: label.to_string(),
                })))
            }
        }
    }

    /// Run queued promise jobs and spawned tasks that can complete without
    /// waiting.
    async fn run_ready(&self) {
        loop {
            match self.runtime.execute_pending_job().await {
                Ok(true) => continue,
                Ok(false) => break,
                Err(_) => tracing::warn!("pending job raised an exception"),
            }
        }
        // A single poll drives every ready task and job, then yields.
        if futures_lite::future::poll_once(self.runtime.idle()).await.is_none() {
            tracing::trace!("timers still outstanding after evaluation");
        }
    }

    /// Drive the runtime until every spawned task, delayed timers included,
    /// has finished.
    pub async fn idle(&self) {
        self.runtime.idle().await;
    }

    fn settle(&self, settle: Settle) -> PendingResult {
        PendingResult::new(async move {
            let Settle {
                promise,
                context,
                label,
            } = settle;
            async_with!(context => |ctx| {
                let promise = promise.restore(&ctx)?;
                match promise.into_future::<Value>().await.catch(&ctx) {
                    Ok(value) => EvalValue::from_js(&ctx, value),
                    Err(caught) => Err(ShellError::evaluation(&ctx, &label, caught)),
                }
            })
            .await
        })
    }
}
