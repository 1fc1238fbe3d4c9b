//! Module resolver backing the sandbox's `require`.
//!
//! Resolution order:
//! 1. Names already resolved come from the per-shell cache.
//! 2. Names in the [`KnownModule`] table use the builtin strategy.
//! 3. Every other name is an installed CommonJS package under the
//!    packages directory.
//!
//! Successful resolutions are cached for the lifetime of the resolver.
//! Failures are neither cached nor retried.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use rquickjs::{Ctx, Exception, Persistent, Result, Value};

use crate::js_modules;
use crate::loader::CommonJsLoader;

/// Module names the host answers itself, whether or not it implements them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownModule {
    Async,
    Crypto,
    Events,
    Fs,
    Http,
    Https,
    Net,
    Os,
    Path,
    Stream,
    Querystring,
    Url,
    Util,
    Zlib,
}

impl KnownModule {
    pub const ALL: [KnownModule; 14] = [
        KnownModule::Async,
        KnownModule::Crypto,
        KnownModule::Events,
        KnownModule::Fs,
        KnownModule::Http,
        KnownModule::Https,
        KnownModule::Net,
        KnownModule::Os,
        KnownModule::Path,
        KnownModule::Stream,
        KnownModule::Querystring,
        KnownModule::Url,
        KnownModule::Util,
        KnownModule::Zlib,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KnownModule::Async => "async",
            KnownModule::Crypto => "crypto",
            KnownModule::Events => "events",
            KnownModule::Fs => "fs",
            KnownModule::Http => "http",
            KnownModule::Https => "https",
            KnownModule::Net => "net",
            KnownModule::Os => "os",
            KnownModule::Path => "path",
            KnownModule::Stream => "stream",
            KnownModule::Querystring => "querystring",
            KnownModule::Url => "url",
            KnownModule::Util => "util",
            KnownModule::Zlib => "zlib",
        }
    }
}

/// A strategy for turning a module name into its exports.
pub trait ModuleSource {
    fn load<'js>(
        &self,
        ctx: &Ctx<'js>,
        resolver: &Rc<ModuleResolver>,
        name: &str,
    ) -> Result<Value<'js>>;
}

/// Host-provided implementations of [`KnownModule`]s.
pub struct BuiltinModules;

impl ModuleSource for BuiltinModules {
    fn load<'js>(
        &self,
        ctx: &Ctx<'js>,
        _resolver: &Rc<ModuleResolver>,
        name: &str,
    ) -> Result<Value<'js>> {
        match js_modules::create_builtin(ctx, name) {
            Some(module) => module,
            None => Err(Exception::throw_message(
                ctx,
                &format!("module '{}' is not available in this host", name),
            )),
        }
    }
}

/// Packages installed into the packages directory.
pub struct InstalledModules {
    loader: CommonJsLoader,
}

impl InstalledModules {
    pub fn new(packages_dir: PathBuf) -> Self {
        Self {
            loader: CommonJsLoader::new(packages_dir),
        }
    }
}

impl ModuleSource for InstalledModules {
    fn load<'js>(
        &self,
        ctx: &Ctx<'js>,
        resolver: &Rc<ModuleResolver>,
        name: &str,
    ) -> Result<Value<'js>> {
        self.loader.load_package(ctx, resolver, name)
    }
}

/// Per-shell resolver and resolved-module cache.
pub struct ModuleResolver {
    cache: RefCell<HashMap<String, Persistent<Value<'static>>>>,
    resolutions: Cell<usize>,
    builtin: BuiltinModules,
    installed: InstalledModules,
}

impl ModuleResolver {
    pub fn new(packages_dir: PathBuf) -> Rc<Self> {
        Rc::new(Self {
            cache: RefCell::new(HashMap::new()),
            resolutions: Cell::new(0),
            builtin: BuiltinModules,
            installed: InstalledModules::new(packages_dir),
        })
    }

    /// Resolve `name` to its module exports.
    pub fn resolve<'js>(self: &Rc<Self>, ctx: &Ctx<'js>, name: &str) -> Result<Value<'js>> {
        if let Some(cached) = self.cached(name) {
            tracing::debug!(module = %name, "module cache hit");
            return cached.restore(ctx);
        }

        let module = match KnownModule::from_name(name) {
            Some(known) => {
                tracing::debug!(module = %known.as_str(), "resolving builtin module");
                self.builtin.load(ctx, self, name)?
            }
            None => {
                tracing::debug!(module = %name, "resolving installed module");
                self.installed.load(ctx, self, name)?
            }
        };

        self.cache
            .borrow_mut()
            .insert(name.to_string(), Persistent::save(ctx, module.clone()));
        self.resolutions.set(self.resolutions.get() + 1);
        Ok(module)
    }

    fn cached(&self, name: &str) -> Option<Persistent<Value<'static>>> {
        self.cache.borrow().get(name).cloned()
    }

    /// Loader for installed packages, shared with module-local `require`s.
    pub(crate) fn loader(&self) -> &CommonJsLoader {
        &self.installed.loader
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.borrow().contains_key(name)
    }

    /// Number of successful uncached resolutions.
    pub fn resolution_count(&self) -> usize {
        self.resolutions.get()
    }

    /// Drop every cached module handle.
    ///
    /// Must run while the owning runtime is still alive.
    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
        self.installed.loader.clear();
    }
}
