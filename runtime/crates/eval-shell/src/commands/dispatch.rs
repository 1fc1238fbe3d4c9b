//! Command handlers.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use futures_lite::future::BoxedLocal;

use super::Command;
use crate::error::ShellError;
use crate::package::PackageManager;

/// Completion of a command's side effect.
pub type CommandFuture = BoxedLocal<Result<(), ShellError>>;

/// Handler function type.
///
/// Validation happens synchronously: a handler either rejects the command
/// up front or returns the future that performs it.
pub type CommandFn = fn(command: &Command, env: &CommandEnv) -> Result<CommandFuture, ShellError>;

/// Module names made available through `%module`.
#[derive(Debug, Default)]
pub struct LoadedModules {
    flags: HashMap<String, bool>,
}

impl LoadedModules {
    pub fn mark_loaded(&mut self, name: &str) {
        self.flags.insert(name.to_string(), true);
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Loaded module names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .flags
            .iter()
            .filter(|(_, loaded)| **loaded)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

/// Shell state a command handler may touch.
#[derive(Clone)]
pub struct CommandEnv {
    pub modules_path: PathBuf,
    pub package_manager: Arc<dyn PackageManager>,
    pub loaded: Rc<RefCell<LoadedModules>>,
}

/// Name-keyed command table.
pub struct Dispatcher;

impl Dispatcher {
    pub fn get_command(name: &str) -> Option<CommandFn> {
        match name {
            "module" => Some(module_command as CommandFn),
            _ => None,
        }
    }

    pub fn list_commands() -> Vec<&'static str> {
        vec!["module"]
    }

    pub fn dispatch(command: &Command, env: &CommandEnv) -> Result<CommandFuture, ShellError> {
        let handler = Self::get_command(&command.name)
            .ok_or_else(|| ShellError::UnknownCommand(command.name.clone()))?;
        tracing::debug!(command = %command.name, args = ?command.args, "dispatching command");
        handler(command, env)
    }
}

/// `%module <name>`: install a package into the modules directory.
fn module_command(command: &Command, env: &CommandEnv) -> Result<CommandFuture, ShellError> {
    let [name] = command.args.as_slice() else {
        return Err(ShellError::Arguments {
            command: command.name.clone(),
            expected: "a single module name argument",
        });
    };

    let name = name.clone();
    let target = env.modules_path.clone();
    let package_manager = env.package_manager.clone();
    let loaded = env.loaded.clone();

    Ok(Box::pin(async move {
        tracing::info!(module = %name, "installing module");
        match package_manager.install(&target, std::slice::from_ref(&name)).await {
            Ok(()) => {
                loaded.borrow_mut().mark_loaded(&name);
                tracing::info!(module = %name, "module installed");
                Ok(())
            }
            Err(source) => {
                tracing::debug!(module = %name, error = %source, "module install failed");
                Err(ShellError::Install {
                    module: name,
                    source,
                })
            }
        }
    }))
}
