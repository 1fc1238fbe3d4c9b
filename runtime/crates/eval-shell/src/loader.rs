//! CommonJS loader for installed packages.
//!
//! Files run inside the usual wrapper
//! `(function (exports, require, module, __filename, __dirname) { ... })`.
//! Module records are cached by normalized path and inserted before the file
//! runs, so circular requires observe partially populated exports. A file
//! that throws is evicted and retried on the next require.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use rquickjs::function::Constructor;
use rquickjs::{Ctx, Exception, Function, Object, Persistent, Result, Value};

use crate::js_modules::path::normalize;
use crate::resolver::ModuleResolver;

/// Loads packages from one packages directory (`.../node_modules`).
pub struct CommonJsLoader {
    root: PathBuf,
    files: RefCell<HashMap<PathBuf, Persistent<Object<'static>>>>,
}

/// Whether `specifier` names a file rather than a package.
fn is_path_specifier(specifier: &str) -> bool {
    matches!(specifier, "." | "..")
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
}

/// Lexically normalize a path: `a/./b/../c` becomes `a/c`.
fn normalize_path(path: &Path) -> PathBuf {
    PathBuf::from(normalize(&path.to_string_lossy()))
}

/// Find the file a module path refers to.
///
/// Tries the path itself, then `.js` and `.json` extensions, then for a
/// directory its `package.json` `main` and finally `index.js`/`index.json`.
pub fn resolve_entry(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    for ext in ["js", "json"] {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    if path.is_dir() {
        if let Some(main) = package_main(path) {
            let main_path = normalize_path(&path.join(main));
            if main_path != path {
                if let Some(entry) = resolve_entry(&main_path) {
                    return Some(entry);
                }
            }
        }
        for index in ["index.js", "index.json"] {
            let candidate = path.join(index);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

/// `main` field of `<dir>/package.json`, if present and non-empty.
fn package_main(dir: &Path) -> Option<String> {
    let manifest = std::fs::read_to_string(dir.join("package.json")).ok()?;
    let manifest: serde_json::Value = match serde_json::from_str(&manifest) {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "ignoring unreadable package.json");
            return None;
        }
    };
    manifest
        .get("main")
        .and_then(|main| main.as_str())
        .filter(|main| !main.is_empty())
        .map(str::to_string)
}

fn not_found<'js>(ctx: &Ctx<'js>, specifier: &str) -> rquickjs::Error {
    Exception::throw_message(ctx, &format!("Cannot find module '{}'", specifier))
}

impl CommonJsLoader {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            files: RefCell::new(HashMap::new()),
        }
    }

    /// Load the package `name` from the packages directory.
    pub fn load_package<'js>(
        &self,
        ctx: &Ctx<'js>,
        resolver: &Rc<ModuleResolver>,
        name: &str,
    ) -> Result<Value<'js>> {
        let entry = resolve_entry(&self.root.join(name)).ok_or_else(|| not_found(ctx, name))?;
        tracing::debug!(module = %name, entry = %entry.display(), "loading package");
        self.load_file(ctx, resolver, &entry)
    }

    /// Load a file, returning its `module.exports`.
    pub fn load_file<'js>(
        &self,
        ctx: &Ctx<'js>,
        resolver: &Rc<ModuleResolver>,
        path: &Path,
    ) -> Result<Value<'js>> {
        let path = normalize_path(path);
        let cached = self.files.borrow().get(&path).cloned();
        if let Some(record) = cached {
            return record.restore(ctx)?.get("exports");
        }

        let source = std::fs::read_to_string(&path).map_err(|e| {
            Exception::throw_message(ctx, &format!("Cannot read module '{}': {}", path.display(), e))
        })?;

        let module = Object::new(ctx.clone())?;
        let filename = path.to_string_lossy().to_string();
        module.set("id", filename.as_str())?;
        module.set("filename", filename.as_str())?;
        module.set("loaded", false)?;

        if path.extension().is_some_and(|ext| ext == "json") {
            let exports = ctx.json_parse(source)?;
            module.set("exports", exports.clone())?;
            module.set("loaded", true)?;
            self.files
                .borrow_mut()
                .insert(path, Persistent::save(ctx, module));
            return Ok(exports);
        }

        let exports = Object::new(ctx.clone())?;
        module.set("exports", exports.clone())?;
        self.files
            .borrow_mut()
            .insert(path.clone(), Persistent::save(ctx, module.clone()));

        match self.run_wrapped(ctx, resolver, &path, &source, exports, module.clone()) {
            Ok(()) => {
                module.set("loaded", true)?;
                module.get("exports")
            }
            Err(e) => {
                self.files.borrow_mut().remove(&path);
                Err(e)
            }
        }
    }

    fn run_wrapped<'js>(
        &self,
        ctx: &Ctx<'js>,
        resolver: &Rc<ModuleResolver>,
        path: &Path,
        source: &str,
        exports: Object<'js>,
        module: Object<'js>,
    ) -> Result<()> {
        let dirname = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        // Function-constructor code gets its own script name, never `eval_script`.
        let constructor: Constructor = ctx.globals().get("Function")?;
        let func: Function = constructor.construct((
            "exports",
            "require",
            "module",
            "__filename",
            "__dirname",
            source,
        ))?;

        let require = local_require(ctx, Rc::downgrade(resolver), dirname.clone())?;
        func.call::<_, ()>((
            exports,
            require,
            module,
            path.to_string_lossy().to_string(),
            dirname.to_string_lossy().to_string(),
        ))
    }

    /// Drop every cached module record.
    pub fn clear(&self) {
        self.files.borrow_mut().clear();
    }
}

/// Build the `require` a module file sees.
///
/// Path specifiers resolve against the file's directory; bare names go back
/// through the shell resolver. Holds only a weak reference to the resolver.
fn local_require<'js>(
    ctx: &Ctx<'js>,
    resolver: Weak<ModuleResolver>,
    dirname: PathBuf,
) -> Result<Function<'js>> {
    Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, specifier: String| -> Result<Value<'js>> {
            let resolver = resolver.upgrade().ok_or_else(|| {
                Exception::throw_message(&ctx, "require called after its shell was dropped")
            })?;
            if !is_path_specifier(&specifier) {
                return resolver.resolve(&ctx, &specifier);
            }
            let target = normalize_path(&dirname.join(&specifier));
            let entry = resolve_entry(&target).ok_or_else(|| not_found(&ctx, &specifier))?;
            resolver.loader().load_file(&ctx, &resolver, &entry)
        },
    )?
    .with_name("require")
}
