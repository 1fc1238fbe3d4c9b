//! eval-shell
//!
//! An embeddable JavaScript evaluation shell. Snippets are submitted one at a
//! time, as from a console or a notebook cell, and either run in a persistent
//! QuickJS sandbox or, when they start with `%`, are parsed and dispatched as
//! shell commands (`%module <name>` installs a package).
//!
//! Evaluated code sees a Node-flavoured global set: `Buffer`, `console`,
//! `require`, `runAsync`, `global` and timers. `require` serves a small set of
//! builtin modules and CommonJS packages installed into the shell's modules
//! directory.
//!
//! ```no_run
//! # async fn demo() -> Result<(), eval_shell::ShellError> {
//! use eval_shell::{Shell, ShellConfig};
//!
//! let shell = Shell::with_npm(ShellConfig::new("/tmp/modules")).await?;
//! shell.evaluate("var x = 41;", 1).await?;
//! let value = shell.evaluate("x + 1", 2).await?.resolve().await?;
//! assert_eq!(value.to_string(), "42");
//! # Ok(())
//! # }
//! ```
//!
//! A Tokio runtime must be current while results are awaited; timers and the
//! package manager run on it.

mod bridge;
pub mod commands;
pub mod config;
pub mod error;
pub mod evaluator;
mod globals;
pub mod js_modules;
mod loader;
pub mod package;
pub mod resolver;
pub mod shell;
pub mod value;

pub use commands::{Command, CommandForm};
pub use config::{PackageManagerConfig, ShellConfig};
pub use error::ShellError;
pub use evaluator::{Evaluation, PendingResult};
pub use js_modules::Level;
pub use package::{Npm, PackageError, PackageManager, PackageManagerOptions};
pub use resolver::KnownModule;
pub use shell::{InputKind, Shell};
pub use value::EvalValue;
