//! The shell façade.
//!
//! A [`Shell`] owns one persistent sandbox and routes each piece of input
//! either to the command dispatcher (text starting with `%`) or to the
//! evaluator (everything else).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::commands::{parse, CommandEnv, Dispatcher, LoadedModules, SIGIL};
use crate::config::ShellConfig;
use crate::error::ShellError;
use crate::evaluator::{Evaluation, Evaluator, PendingResult};
use crate::globals;
use crate::js_modules::{ConsoleLog, Level};
use crate::package::{Npm, PackageManager};
use crate::resolver::ModuleResolver;
use crate::value::EvalValue;

/// How a piece of input will be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Command,
    Code,
}

pub struct Shell {
    config: ShellConfig,
    package_manager: Arc<dyn PackageManager>,
    loaded: Rc<RefCell<LoadedModules>>,
    console: ConsoleLog,
    resolver: Rc<ModuleResolver>,
    evaluator: Evaluator,
}

impl Shell {
    /// Bootstrap `package_manager`, then build the sandbox.
    ///
    /// Fails with [`ShellError::Bootstrap`] if the package manager cannot be
    /// loaded; no shell exists in that case.
    pub async fn create(
        config: ShellConfig,
        package_manager: Arc<dyn PackageManager>,
    ) -> Result<Self, ShellError> {
        let options = config.package_manager_options();
        package_manager
            .load(&options)
            .await
            .map_err(ShellError::Bootstrap)?;

        let evaluator = Evaluator::new().await?;
        let resolver = ModuleResolver::new(config.packages_dir());
        let console = ConsoleLog::default();
        evaluator
            .with(|ctx| globals::install(&ctx, &resolver, &console))
            .await?;

        tracing::info!(
            modules_path = %config.modules_path().display(),
            packages = %config.packages_dir().display(),
            "shell created"
        );
        Ok(Self {
            config,
            package_manager,
            loaded: Rc::new(RefCell::new(LoadedModules::default())),
            console,
            resolver,
            evaluator,
        })
    }

    /// Create a shell that installs modules with the configured `npm`.
    pub async fn with_npm(config: ShellConfig) -> Result<Self, ShellError> {
        let npm = Npm::new(config.package_manager.program.clone());
        Self::create(config, Arc::new(npm)).await
    }

    /// Classify input by its first character.
    pub fn classify(text: &str) -> InputKind {
        if text.starts_with(SIGIL) {
            InputKind::Command
        } else {
            InputKind::Code
        }
    }

    /// Evaluate one piece of input.
    ///
    /// Commands always produce [`Evaluation::Pending`] (or fail
    /// synchronously on bad syntax, unknown names and wrong arguments).
    /// Code produces its completion value, or a pending result when that
    /// value is a promise. `evaluation_id` only labels diagnostics.
    pub async fn evaluate(
        &self,
        text: &str,
        evaluation_id: impl fmt::Display,
    ) -> Result<Evaluation, ShellError> {
        match Self::classify(text) {
            InputKind::Command => self.run_command(text),
            InputKind::Code => {
                let label = format!("code[{}]", evaluation_id);
                self.evaluator.evaluate_code(text, &label).await
            }
        }
    }

    fn run_command(&self, text: &str) -> Result<Evaluation, ShellError> {
        let command = parse(text).ok_or(ShellError::InvalidCommandSyntax)?;
        let env = CommandEnv {
            modules_path: self.config.modules_path().to_path_buf(),
            package_manager: self.package_manager.clone(),
            loaded: self.loaded.clone(),
        };
        let future = Dispatcher::dispatch(&command, &env)?;
        Ok(Evaluation::Pending(PendingResult::new(async move {
            future.await.map(|()| EvalValue::Undefined)
        })))
    }

    /// Wait until every timer and callback started by earlier evaluations
    /// has run.
    pub async fn idle(&self) {
        self.evaluator.idle().await;
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Whether `%module name` has completed successfully in this shell.
    pub fn is_module_loaded(&self, name: &str) -> bool {
        self.loaded.borrow().is_loaded(name)
    }

    pub fn loaded_modules(&self) -> Vec<String> {
        self.loaded.borrow().names()
    }

    /// Number of module names resolved (not served from cache) so far.
    pub fn resolution_count(&self) -> usize {
        self.resolver.resolution_count()
    }

    /// Drain console output captured since the last call.
    pub fn take_console_output(&self) -> Vec<(Level, String)> {
        self.console.take()
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        // Cached module handles must be released before the runtime.
        self.resolver.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{MockPackageManager, PackageError};
    use proptest::prelude::*;

    fn loaded_mock() -> MockPackageManager {
        let mut pm = MockPackageManager::new();
        pm.expect_load().times(1).returning(|_| Ok(()));
        pm
    }

    #[tokio::test]
    async fn test_create_passes_options_to_load() {
        let mut pm = MockPackageManager::new();
        pm.expect_load()
            .withf(|options| {
                options.prefix == std::path::Path::new("/mods")
                    && options.log_level == "silent"
                    && !options.progress
                    && !options.color
            })
            .times(1)
            .returning(|_| Ok(()));
        let shell = Shell::create(ShellConfig::new("/mods"), Arc::new(pm))
            .await
            .unwrap();
        assert_eq!(shell.config().modules_path(), std::path::Path::new("/mods"));
        assert!(shell.loaded_modules().is_empty());
        assert_eq!(shell.resolution_count(), 0);
    }

    #[tokio::test]
    async fn test_bootstrap_failure() {
        let mut pm = MockPackageManager::new();
        pm.expect_load().times(1).returning(|_| {
            Err(PackageError::Unavailable {
                program: "npm".into(),
                reason: "not found".into(),
            })
        });
        pm.expect_install().never();
        let err = Shell::create(ShellConfig::new("/mods"), Arc::new(pm))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ShellError::Bootstrap(PackageError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_invalid_command_never_evaluates_as_code() {
        let mut pm = loaded_mock();
        pm.expect_install().never();
        let shell = Shell::create(ShellConfig::new("/mods"), Arc::new(pm))
            .await
            .unwrap();
        let err = shell.evaluate("%", 1).await.err().unwrap();
        assert!(matches!(err, ShellError::InvalidCommandSyntax));
        let err = shell.evaluate("% 1 + 1", 2).await.err().unwrap();
        assert!(matches!(err, ShellError::InvalidCommandSyntax));
    }

    #[tokio::test]
    async fn test_console_output_is_drained() {
        let shell = Shell::create(ShellConfig::new("/mods"), Arc::new(loaded_mock()))
            .await
            .unwrap();
        shell.evaluate("console.warn('careful')", 1).await.unwrap();
        assert_eq!(
            shell.take_console_output(),
            vec![(Level::Warn, "careful".to_string())]
        );
        assert!(shell.take_console_output().is_empty());
    }

    #[tokio::test]
    async fn test_command_result_is_lazy() {
        let mut pm = loaded_mock();
        pm.expect_install().never();
        let shell = Shell::create(ShellConfig::new("/mods"), Arc::new(pm))
            .await
            .unwrap();
        let evaluation = shell.evaluate("%module lodash", 1).await.unwrap();
        assert!(evaluation.is_pending());
        drop(evaluation);
        assert!(!shell.is_module_loaded("lodash"));
    }

    proptest! {
        #[test]
        fn prop_classification_uses_first_character(rest in ".*") {
            prop_assert_eq!(Shell::classify(&format!("%{}", rest)), InputKind::Command);
            let first = rest.chars().next();
            let expected = if first == Some('%') { InputKind::Command } else { InputKind::Code };
            prop_assert_eq!(Shell::classify(&rest), expected);
        }
    }
}
