//! OS module - host information.

use rquickjs::{Ctx, Function, Object, Result};

fn platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

fn arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        other => other,
    }
}

fn os_type() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows_NT",
        other => other,
    }
}

fn tmpdir() -> String {
    let dir = std::env::temp_dir().to_string_lossy().to_string();
    match dir.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => dir,
    }
}

fn homedir() -> String {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_default()
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Create the `os` module object.
pub fn create<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
    let os = Object::new(ctx.clone())?;
    os.set("EOL", if cfg!(windows) { "\r\n" } else { "\n" })?;
    os.set("platform", Function::new(ctx.clone(), platform)?.with_name("platform")?)?;
    os.set("arch", Function::new(ctx.clone(), arch)?.with_name("arch")?)?;
    os.set("type", Function::new(ctx.clone(), os_type)?.with_name("type")?)?;
    os.set("tmpdir", Function::new(ctx.clone(), tmpdir)?.with_name("tmpdir")?)?;
    os.set("homedir", Function::new(ctx.clone(), homedir)?.with_name("homedir")?)?;
    os.set("hostname", Function::new(ctx.clone(), hostname)?.with_name("hostname")?)?;

    // Only the length is meaningful; entries carry placeholder model/speed.
    let cpus = Function::new(ctx.clone(), |ctx: Ctx<'js>| -> Result<Vec<Object<'js>>> {
        (0..cpu_count())
            .map(|_| {
                let cpu = Object::new(ctx.clone())?;
                cpu.set("model", "unknown")?;
                cpu.set("speed", 0)?;
                Ok(cpu)
            })
            .collect()
    })?
    .with_name("cpus")?;
    os.set("cpus", cpus)?;
    Ok(os)
}
