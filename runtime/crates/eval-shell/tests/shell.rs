//! End-to-end behaviour of the shell façade.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eval_shell::{
    EvalValue, Evaluation, PackageError, PackageManager, PackageManagerOptions, Shell, ShellConfig,
    ShellError,
};

/// Writes a tiny CommonJS package instead of talking to a registry.
struct FakePackageManager {
    fail: bool,
}

#[async_trait]
impl PackageManager for FakePackageManager {
    async fn load(&self, options: &PackageManagerOptions) -> Result<(), PackageError> {
        tokio::fs::create_dir_all(&options.prefix).await?;
        Ok(())
    }

    async fn install(&self, target: &Path, names: &[String]) -> Result<(), PackageError> {
        if self.fail {
            return Err(PackageError::Failed {
                status: Some(1),
                stderr: "npm ERR! 404 Not Found".into(),
            });
        }
        for name in names {
            let dir = target.join("node_modules").join(name);
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(
                dir.join("package.json"),
                format!(r#"{{"name": "{}", "main": "lib/main.js"}}"#, name),
            )
            .await?;
            tokio::fs::create_dir_all(dir.join("lib")).await?;
            tokio::fs::write(
                dir.join("lib/main.js"),
                "const path = require('path');\n\
                 module.exports = function greet(who) { return 'hello ' + path.basename(who); };",
            )
            .await?;
        }
        Ok(())
    }
}

async fn shell_in(dir: &Path, fail: bool) -> Shell {
    Shell::create(ShellConfig::new(dir), Arc::new(FakePackageManager { fail }))
        .await
        .unwrap()
}

async fn eval(shell: &Shell, text: &str) -> Result<EvalValue, ShellError> {
    shell.evaluate(text, 0).await?.resolve().await
}

#[tokio::test]
async fn test_bindings_persist_across_evaluations() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;

    assert_eq!(eval(&shell, "var x = 41;").await.unwrap(), EvalValue::Undefined);
    assert_eq!(eval(&shell, "x + 1").await.unwrap(), EvalValue::Number(42.0));
    eval(&shell, "global.shared = 'g'").await.unwrap();
    assert_eq!(eval(&shell, "shared").await.unwrap(), EvalValue::String("g".into()));
}

#[tokio::test]
async fn test_require_is_cached_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;

    let same = eval(&shell, "require('path') === require('path')").await.unwrap();
    assert_eq!(same, EvalValue::Bool(true));
    eval(&shell, "require('path').join('a', 'b')").await.unwrap();
    assert_eq!(shell.resolution_count(), 1);
}

#[tokio::test]
async fn test_unavailable_builtin_is_an_evaluation_error() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;

    match eval(&shell, "require('http')").await.unwrap_err() {
        ShellError::Evaluation { message, .. } => {
            assert_eq!(message, "module 'http' is not available in this host")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(shell.resolution_count(), 0);
}

#[tokio::test]
async fn test_error_does_not_poison_the_context() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;

    let err = shell.evaluate("throw new Error('boom')", 3).await.unwrap_err();
    match &err {
        ShellError::Evaluation { label, name, message, .. } => {
            assert_eq!(label, "code[3]");
            assert_eq!(name, "Error");
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.to_string(), "code[3]: Error: boom");
    assert_eq!(eval(&shell, "1 + 1").await.unwrap(), EvalValue::Number(2.0));
}

#[tokio::test]
async fn test_run_async_resolves_after_timer() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;

    let evaluation = shell
        .evaluate("runAsync(h => setTimeout(() => h.resolve(7), 10))", 1)
        .await
        .unwrap();
    assert!(evaluation.is_pending());
    let value = tokio::time::timeout(Duration::from_secs(5), evaluation.resolve())
        .await
        .expect("pending result settles")
        .unwrap();
    assert_eq!(value, EvalValue::Number(7.0));
}

#[tokio::test]
async fn test_run_async_rejection() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;

    let err = eval(&shell, "runAsync(h => setImmediate(() => h.reject(new TypeError('late'))))")
        .await
        .unwrap_err();
    assert!(matches!(err, ShellError::Evaluation { ref name, .. } if name == "TypeError"), "{err:?}");
}

#[tokio::test]
async fn test_unsettled_handle_stays_pending() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;

    let evaluation = shell.evaluate("runAsync(h => {})", 1).await.unwrap();
    let Evaluation::Pending(pending) = evaluation else {
        panic!("expected a pending result");
    };
    let waited = tokio::time::timeout(Duration::from_millis(50), pending).await;
    assert!(waited.is_err());

    // The shell stays usable after abandoning the pending result.
    assert_eq!(eval(&shell, "'still here'").await.unwrap(), EvalValue::String("still here".into()));
}

#[tokio::test]
async fn test_module_command_installs_and_loads() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;

    assert!(!shell.is_module_loaded("greet"));
    let evaluation = shell.evaluate("%module greet", 1).await.unwrap();
    assert!(evaluation.is_pending());
    assert_eq!(evaluation.resolve().await.unwrap(), EvalValue::Undefined);
    assert!(shell.is_module_loaded("greet"));
    assert_eq!(shell.loaded_modules(), vec!["greet"]);

    let value = eval(&shell, "require('greet')('/home/world')").await.unwrap();
    assert_eq!(value, EvalValue::String("hello world".into()));
}

#[tokio::test]
async fn test_module_command_failure() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), true).await;

    let err = eval(&shell, "%module greet").await.unwrap_err();
    match err {
        ShellError::Install { module, source } => {
            assert_eq!(module, "greet");
            assert!(matches!(source, PackageError::Failed { status: Some(1), .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!shell.is_module_loaded("greet"));
}

#[tokio::test]
async fn test_command_errors_are_synchronous() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;

    let err = shell.evaluate("%module a b", 1).await.err().unwrap();
    assert!(matches!(err, ShellError::Arguments { .. }));

    let err = shell.evaluate("%frobnicate x", 2).await.err().unwrap();
    assert_eq!(err.to_string(), "Unknown command \"frobnicate\"");

    let err = shell.evaluate("%not-a-command", 3).await.err().unwrap();
    assert!(matches!(err, ShellError::InvalidCommandSyntax));
}

#[tokio::test]
async fn test_missing_installed_module() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;

    match eval(&shell, "require('left-pad')").await.unwrap_err() {
        ShellError::Evaluation { message, .. } => {
            assert_eq!(message, "Cannot find module 'left-pad'")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_console_capture_and_values() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;

    eval(&shell, "console.log('n =', 3)").await.unwrap();
    let lines: Vec<String> = shell
        .take_console_output()
        .into_iter()
        .map(|(_, line)| line)
        .collect();
    assert_eq!(lines, vec!["n = 3"]);

    let json = eval(&shell, "({a: [1, 2], b: null})").await.unwrap();
    assert_eq!(json, EvalValue::Json(serde_json::json!({"a": [1, 2], "b": null})));

    match eval(&shell, "(function named() {})").await.unwrap() {
        EvalValue::Opaque { kind, .. } => assert_eq!(kind, "function"),
        other => panic!("unexpected value: {other:?}"),
    }
}

#[tokio::test]
async fn test_zero_delay_timer_fires_before_next_evaluation() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;

    let value = eval(&shell, "setTimeout(() => { global.done = true; }, 0); 1").await.unwrap();
    assert_eq!(value, EvalValue::Number(1.0));
    assert_eq!(eval(&shell, "done").await.unwrap(), EvalValue::Bool(true));
}

#[tokio::test]
async fn test_idle_runs_delayed_timers() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;

    eval(&shell, "var ticks = 0; setTimeout(() => { ticks += 1; }, 15); 0").await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), shell.idle())
        .await
        .expect("timers finish");
    assert_eq!(eval(&shell, "ticks").await.unwrap(), EvalValue::Number(1.0));
}

#[tokio::test]
async fn test_cleared_timers_never_fire() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;

    let value = eval(
        &shell,
        "runAsync(h => { const t = setTimeout(() => h.resolve(1), 5); clearTimeout(t); setTimeout(() => h.resolve(2), 20); })",
    )
    .await
    .unwrap();
    assert_eq!(value, EvalValue::Number(2.0));

    eval(&shell, "var hit = false; clearImmediate(setImmediate(() => { hit = true; })); 0")
        .await
        .unwrap();
    shell.idle().await;
    assert_eq!(eval(&shell, "hit").await.unwrap(), EvalValue::Bool(false));
}

#[tokio::test]
async fn test_fs_callback_forms() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;
    let file = serde_json::to_string(&dir.path().join("note.txt")).unwrap();
    let missing = serde_json::to_string(&dir.path().join("missing.txt")).unwrap();

    eval(
        &shell,
        &format!("var fs = require('fs'); fs.writeFile({file}, 'saved', err => {{ global.writeErr = err; }}); 0"),
    )
    .await
    .unwrap();
    assert_eq!(eval(&shell, "writeErr").await.unwrap(), EvalValue::Null);

    eval(
        &shell,
        &format!("fs.readFile({file}, 'utf8', (err, data) => {{ global.read = [err, data]; }}); 0"),
    )
    .await
    .unwrap();
    assert_eq!(
        eval(&shell, "read").await.unwrap(),
        EvalValue::Json(serde_json::json!([null, "saved"]))
    );

    eval(
        &shell,
        &format!("fs.readFile({missing}, (err, data) => {{ global.failure = [err.code, data]; }}); 0"),
    )
    .await
    .unwrap();
    assert_eq!(
        eval(&shell, "failure[0] + ':' + typeof failure[1]").await.unwrap(),
        EvalValue::String("ENOENT:undefined".into())
    );
}

#[tokio::test]
async fn test_throwing_timer_callback_is_contained() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;

    let value = eval(&shell, "setTimeout(() => { throw new Error('in timer'); }, 0); 'scheduled'")
        .await
        .unwrap();
    assert_eq!(value, EvalValue::String("scheduled".into()));
    assert_eq!(eval(&shell, "2 * 21").await.unwrap(), EvalValue::Number(42.0));

    let value = eval(
        &shell,
        "runAsync(h => { setTimeout(() => { throw new Error('again'); }, 1); setTimeout(() => h.resolve('ok'), 10); })",
    )
    .await
    .unwrap();
    assert_eq!(value, EvalValue::String("ok".into()));
}

#[tokio::test]
async fn test_package_frames_keep_their_own_name() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell_in(dir.path(), false).await;
    let package = dir.path().join("node_modules/thrower");
    std::fs::create_dir_all(&package).unwrap();
    std::fs::write(
        package.join("index.js"),
        "function explode() { throw new Error('inside package'); }\nexplode();\n",
    )
    .unwrap();

    let err = shell
        .evaluate("require('thrower')", 5)
        .await
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "code[5]: Error: inside package");
    let trace = err.trace();
    let top = trace.first().expect("stack trace");
    assert!(top.contains("explode"), "{trace:?}");
    assert!(!top.contains("code[5]"), "{trace:?}");
}
