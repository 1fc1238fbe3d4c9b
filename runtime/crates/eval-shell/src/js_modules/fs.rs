//! fs module - Node.js filesystem API.
//!
//! Synchronous operations run on `std::fs` directly. The JS shim adds
//! encoding handling, `statSync` objects and the callback forms.

use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

use rquickjs::{Ctx, Exception, Function, Object, Result};

const FS_JS: &str = include_str!("shims/fs.js");

fn error_code(err: &io::Error) -> &'static str {
    match err.kind() {
        io::ErrorKind::NotFound => "ENOENT",
        io::ErrorKind::PermissionDenied => "EACCES",
        io::ErrorKind::AlreadyExists => "EEXIST",
        io::ErrorKind::InvalidInput => "EINVAL",
        io::ErrorKind::IsADirectory => "EISDIR",
        io::ErrorKind::NotADirectory => "ENOTDIR",
        io::ErrorKind::DirectoryNotEmpty => "ENOTEMPTY",
        _ => "EIO",
    }
}

/// Throw a Node-style error (`code`, `syscall`, `path`) for a failed call.
fn throw_io<'js>(ctx: &Ctx<'js>, err: io::Error, syscall: &str, path: &str) -> rquickjs::Error {
    let code = error_code(&err);
    let message = format!("{}: {}, {} '{}'", code, err, syscall, path);
    let exception = match Exception::from_message(ctx.clone(), &message) {
        Ok(exception) => exception,
        Err(e) => return e,
    };
    let object = exception.into_object();
    let annotated = object
        .set("code", code)
        .and_then(|_| object.set("syscall", syscall))
        .and_then(|_| object.set("path", path));
    if let Err(e) = annotated {
        return e;
    }
    ctx.throw(object.into_value())
}

/// `[size, isFile, isDirectory, mtimeMs]`
fn stat_raw(path: &str) -> io::Result<Vec<f64>> {
    let meta = std::fs::metadata(path)?;
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0);
    Ok(vec![
        meta.len() as f64,
        if meta.is_file() { 1.0 } else { 0.0 },
        if meta.is_dir() { 1.0 } else { 0.0 },
        mtime,
    ])
}

fn write_bytes(path: &str, data: &[u8], append: bool) -> io::Result<()> {
    if append {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        file.write_all(data)
    } else {
        std::fs::write(path, data)
    }
}

fn read_dir_names(path: &str) -> io::Result<Vec<String>> {
    let mut names = std::fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().to_string()))
        .collect::<io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

fn native<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
    let native = Object::new(ctx.clone())?;

    native.set(
        "readFile",
        Function::new(ctx.clone(), |ctx: Ctx<'js>, path: String| -> Result<Vec<u8>> {
            std::fs::read(&path).map_err(|e| throw_io(&ctx, e, "open", &path))
        })?,
    )?;
    native.set(
        "writeFile",
        Function::new(
            ctx.clone(),
            |ctx: Ctx<'js>, path: String, data: Vec<u8>, append: bool| -> Result<()> {
                write_bytes(&path, &data, append).map_err(|e| throw_io(&ctx, e, "open", &path))
            },
        )?,
    )?;
    native.set(
        "exists",
        Function::new(ctx.clone(), |path: String| Path::new(&path).exists())?,
    )?;
    native.set(
        "readdir",
        Function::new(ctx.clone(), |ctx: Ctx<'js>, path: String| -> Result<Vec<String>> {
            read_dir_names(&path).map_err(|e| throw_io(&ctx, e, "scandir", &path))
        })?,
    )?;
    native.set(
        "mkdir",
        Function::new(
            ctx.clone(),
            |ctx: Ctx<'js>, path: String, recursive: bool| -> Result<()> {
                let result = if recursive {
                    std::fs::create_dir_all(&path)
                } else {
                    std::fs::create_dir(&path)
                };
                result.map_err(|e| throw_io(&ctx, e, "mkdir", &path))
            },
        )?,
    )?;
    native.set(
        "unlink",
        Function::new(ctx.clone(), |ctx: Ctx<'js>, path: String| -> Result<()> {
            std::fs::remove_file(&path).map_err(|e| throw_io(&ctx, e, "unlink", &path))
        })?,
    )?;
    native.set(
        "stat",
        Function::new(ctx.clone(), |ctx: Ctx<'js>, path: String| -> Result<Vec<f64>> {
            stat_raw(&path).map_err(|e| throw_io(&ctx, e, "stat", &path))
        })?,
    )?;

    Ok(native)
}

/// Create the `fs` module object.
pub fn create<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
    let buffer: Function = ctx.globals().get("Buffer")?;
    let factory: Function = ctx.eval(FS_JS)?;
    factory.call((native(ctx)?, buffer))
}
