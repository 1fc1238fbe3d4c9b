//! `%`-prefixed shell commands.
//!
//! Text that starts with the command sigil is never run as code. It is parsed
//! into a [`Command`] and handed to the [`Dispatcher`], which looks the name
//! up in its handler table.

mod dispatch;
mod parser;

pub use dispatch::{CommandEnv, CommandFn, CommandFuture, Dispatcher, LoadedModules};
pub use parser::{parse, Command, CommandForm, SIGIL};
