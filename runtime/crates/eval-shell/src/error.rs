//! Error types surfaced to the embedder.

use rquickjs::{CaughtError, Ctx};

use crate::package::PackageError;

/// Everything `Shell` can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// Text starts with the command sigil but does not match the command grammar.
    #[error("Invalid command syntax.")]
    InvalidCommandSyntax,

    #[error("Unknown command \"{0}\"")]
    UnknownCommand(String),

    /// A known command was given the wrong arguments. Nothing was executed.
    #[error("{command}: expected {expected}")]
    Arguments {
        command: String,
        expected: &'static str,
    },

    /// Evaluated code threw, failed to parse, or its pending result rejected.
    #[error("{label}: {name}: {message}")]
    Evaluation {
        label: String,
        name: String,
        message: String,
        stack: Option<String>,
    },

    #[error("failed to install module \"{module}\": {source}")]
    Install {
        module: String,
        #[source]
        source: PackageError,
    },

    #[error("package manager bootstrap failed: {0}")]
    Bootstrap(#[source] PackageError),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The embedded engine failed outside of user code.
    #[error("engine error: {0}")]
    Engine(#[from] rquickjs::Error),
}

/// Name of the script QuickJS reports for code passed to `eval`.
const EVAL_SCRIPT_NAME: &str = "eval_script";

impl ShellError {
    /// Build an evaluation error from a caught JS exception, labeling the
    /// eval frames with `label`.
    pub(crate) fn evaluation<'js>(ctx: &Ctx<'js>, label: &str, caught: CaughtError<'js>) -> Self {
        match caught {
            CaughtError::Exception(exception) => {
                let name = exception
                    .as_object()
                    .get::<_, Option<String>>("name")
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| "Error".to_string());
                ShellError::Evaluation {
                    label: label.to_string(),
                    name,
                    message: exception.message().unwrap_or_default(),
                    stack: exception.stack().map(|stack| relabel_stack(&stack, label)),
                }
            }
            CaughtError::Value(value) => ShellError::Evaluation {
                label: label.to_string(),
                name: "Uncaught".to_string(),
                message: crate::value::EvalValue::from_js(ctx, value)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|e| e.to_string()),
                stack: None,
            },
            CaughtError::Error(error) => ShellError::Engine(error),
        }
    }

    /// Stack trace lines, if the thrown value carried one.
    pub fn trace(&self) -> Vec<&str> {
        match self {
            ShellError::Evaluation {
                stack: Some(stack), ..
            } => stack.lines().filter(|l| !l.trim().is_empty()).collect(),
            _ => Vec::new(),
        }
    }
}

fn relabel_stack(stack: &str, label: &str) -> String {
    stack.replace(EVAL_SCRIPT_NAME, label)
}
