//! Command syntax.
//!
//! ```text
//! %name args on one line
//! optional payload
//! spanning the remaining lines
//! ```

use std::sync::LazyLock;

use regex::Regex;

/// Leading character that marks a command.
pub const SIGIL: char = '%';

static COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A(%%?)([A-Za-z0-9_.]+)(?:[ \t]+([^\n]*))?(?:\n(.*))?\z")
        .expect("command pattern is valid")
});

/// Whether the command used one sigil or two.
///
/// `%%` is accepted and recorded but currently dispatched exactly like `%`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandForm {
    Line,
    Cell,
}

/// A parsed command. Transient: produced by [`parse`], consumed by dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
    pub payload: Option<String>,
    pub form: CommandForm,
}

/// Parse command text. Returns `None` when `text` does not match the grammar.
pub fn parse(text: &str) -> Option<Command> {
    let caps = COMMAND_RE.captures(text)?;

    let form = if caps[1].len() == 2 {
        CommandForm::Cell
    } else {
        CommandForm::Line
    };
    let args = caps
        .get(3)
        .map(|m| m.as_str().trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.split(' ').map(str::to_string).collect())
        .unwrap_or_default();
    let payload = caps
        .get(4)
        .map(|m| m.as_str())
        .filter(|body| !body.is_empty())
        .map(str::to_string);

    Some(Command {
        name: caps[2].to_string(),
        args,
        payload,
        form,
    })
}
