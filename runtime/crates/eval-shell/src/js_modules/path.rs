//! Path module - Node.js path API.
//!
//! POSIX path manipulation, implemented natively.

use rquickjs::prelude::{Opt, Rest};
use rquickjs::{Ctx, Function, Object, Result};

/// Collapse `.` and `..` segments and duplicate separators.
pub fn normalize(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            s => parts.push(s),
        }
    }

    let mut out = parts.join("/");
    if absolute {
        out.insert(0, '/');
    }
    if out.is_empty() {
        return if absolute { "/".to_string() } else { ".".to_string() };
    }
    if trailing && !out.ends_with('/') {
        out.push('/');
    }
    out
}

pub fn join(parts: &[String]) -> String {
    let joined = parts
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("/");
    normalize(&joined)
}

/// Resolve right-to-left until an absolute path is formed, falling back to `cwd`.
pub fn resolve(cwd: &str, parts: &[String]) -> String {
    let mut resolved = String::new();
    for part in parts.iter().rev().filter(|p| !p.is_empty()) {
        resolved = if resolved.is_empty() {
            part.clone()
        } else {
            format!("{}/{}", part, resolved)
        };
        if part.starts_with('/') {
            break;
        }
    }
    if !resolved.starts_with('/') {
        resolved = if resolved.is_empty() {
            cwd.to_string()
        } else {
            format!("{}/{}", cwd, resolved)
        };
    }
    let normalized = normalize(&resolved);
    match normalized.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => normalized,
    }
}

pub fn dirname(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(i) => trimmed[..i].trim_end_matches('/').to_string(),
        None => ".".to_string(),
    }
}

pub fn basename(path: &str, ext: Option<&str>) -> String {
    let trimmed = path.trim_end_matches('/');
    let base = match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    };
    match ext {
        Some(ext) if !ext.is_empty() && base != ext => {
            base.strip_suffix(ext).unwrap_or(base).to_string()
        }
        _ => base.to_string(),
    }
}

pub fn extname(path: &str) -> String {
    let base = basename(path, None);
    match base.rfind('.') {
        Some(0) | None => String::new(),
        Some(i) => base[i..].to_string(),
    }
}

pub fn relative(cwd: &str, from: &str, to: &str) -> String {
    let from = resolve(cwd, &[from.to_string()]);
    let to = resolve(cwd, &[to.to_string()]);
    let from_parts: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let to_parts: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();
    let mut out: Vec<&str> = vec![".."; from_parts.len() - common];
    out.extend(&to_parts[common..]);
    out.join("/")
}

fn current_dir() -> String {
    std::env::current_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "/".to_string())
}

/// Create the `path` module object.
pub fn create<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
    let path = Object::new(ctx.clone())?;
    path.set("sep", "/")?;
    path.set("delimiter", ":")?;

    path.set(
        "normalize",
        Function::new(ctx.clone(), |p: String| normalize(&p))?.with_name("normalize")?,
    )?;
    path.set(
        "join",
        Function::new(ctx.clone(), |parts: Rest<String>| join(&parts.0))?.with_name("join")?,
    )?;
    path.set(
        "resolve",
        Function::new(ctx.clone(), |parts: Rest<String>| {
            resolve(&current_dir(), &parts.0)
        })?
        .with_name("resolve")?,
    )?;
    path.set(
        "dirname",
        Function::new(ctx.clone(), |p: String| dirname(&p))?.with_name("dirname")?,
    )?;
    path.set(
        "basename",
        Function::new(ctx.clone(), |p: String, ext: Opt<String>| {
            basename(&p, ext.0.as_deref())
        })?
        .with_name("basename")?,
    )?;
    path.set(
        "extname",
        Function::new(ctx.clone(), |p: String| extname(&p))?.with_name("extname")?,
    )?;
    path.set(
        "isAbsolute",
        Function::new(ctx.clone(), |p: String| p.starts_with('/'))?.with_name("isAbsolute")?,
    )?;
    path.set(
        "relative",
        Function::new(ctx.clone(), |from: String, to: String| {
            relative(&current_dir(), &from, &to)
        })?
        .with_name("relative")?,
    )?;

    // path.posix === path
    path.set("posix", path.clone())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/a//b/../c/./d"), "/a/c/d");
        assert_eq!(normalize("a/../../b"), "../b");
        assert_eq!(normalize("/.."), "/");
        assert_eq!(normalize("foo/"), "foo/");
        assert_eq!(normalize(""), ".");
    }

    #[test]
    fn test_join() {
        assert_eq!(join(&s(&["/foo", "bar", "baz/asdf", "quux", ".."])), "/foo/bar/baz/asdf");
        assert_eq!(join(&s(&["a", "", "b"])), "a/b");
        assert_eq!(join(&[]), ".");
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve("/cwd", &s(&["/foo/bar", "./baz"])), "/foo/bar/baz");
        assert_eq!(resolve("/cwd", &s(&["/foo/bar", "/tmp/file/"])), "/tmp/file");
        assert_eq!(resolve("/cwd", &s(&["www", "../img"])), "/cwd/img");
        assert_eq!(resolve("/cwd", &[]), "/cwd");
    }

    #[test]
    fn test_dirname_basename_extname() {
        assert_eq!(dirname("/foo/bar/baz/asdf/quux"), "/foo/bar/baz/asdf");
        assert_eq!(dirname("/foo"), "/");
        assert_eq!(dirname("foo"), ".");
        assert_eq!(basename("/foo/bar/quux.html", None), "quux.html");
        assert_eq!(basename("/foo/bar/quux.html", Some(".html")), "quux");
        assert_eq!(extname("index.coffee.md"), ".md");
        assert_eq!(extname(".index"), "");
        assert_eq!(extname("index"), "");
    }

    #[test]
    fn test_relative() {
        assert_eq!(
            relative("/", "/data/orandea/test/aaa", "/data/orandea/impl/bbb"),
            "../../impl/bbb"
        );
        assert_eq!(relative("/", "/a/b", "/a/b"), "");
    }
}
