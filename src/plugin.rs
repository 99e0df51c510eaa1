//! Loading of the modules that provide streams.
//!
//! The configured module list (`ERS_STREAM_LIBS`, colon separated) is loaded
//! when a [`StreamFactory`] is created. Each loaded module registers its
//! stream constructors with the factory. [`BASE_MODULE`], which provides the
//! built-in streams, is always appended to the list.
//!
//! Modules are resolved through a [`ModuleLoader`]. The default loader,
//! [`StaticModules::global`], knows the modules linked into the process and
//! registered with [`StaticModules::register_module`].
//!
//! A module that fails to load is recorded as [`ModuleState::Failed`] and
//! reported with a `tracing` debug event; loading continues with the next
//! module.

use core::fmt;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use spin::{Mutex, Once, RwLock};

use crate::{StreamFactory, streams};

/// Name of the module providing the built-in streams.
pub const BASE_MODULE: &str = "ers_base_streams";

const SEPARATOR: char = ':';

/// Failure to load a module.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// No module of that name is known to the loader.
    #[error("module \"{name}\" is not found")]
    NotFound {
        /// Name of the module.
        name: String,
    },
    /// The module was found but could not initialize.
    #[error("module \"{name}\" can not be initialized because {reason}")]
    Init {
        /// Name of the module.
        name: String,
        /// Description of the failure.
        reason: String,
    },
}

/// Load state of one module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModuleState {
    /// Loading was never attempted.
    NotAttempted,
    /// The module is loaded.
    Loaded,
    /// Loading failed.
    Failed(LoadError),
}

/// Resolves module names and lets the modules register with a factory.
pub trait ModuleLoader: Send + Sync {
    /// Loads the module `name` into `factory`.
    fn load(&self, name: &str, factory: &StreamFactory) -> Result<(), LoadError>;
}

impl<L: ModuleLoader + ?Sized> ModuleLoader for &L {
    fn load(&self, name: &str, factory: &StreamFactory) -> Result<(), LoadError> {
        (**self).load(name, factory)
    }
}

/// Initialization function of a module linked into the process.
pub type ModuleInit = fn(&StreamFactory);

/// Loader of modules linked into the process.
pub struct StaticModules {
    modules: RwLock<IndexMap<String, ModuleInit, FxBuildHasher>>,
}

static GLOBAL_MODULES: Once<StaticModules> = Once::new();

impl StaticModules {
    /// Creates a loader that knows no module.
    pub fn new() -> Self {
        Self {
            modules: RwLock::new(IndexMap::default()),
        }
    }

    /// Creates a loader that knows [`BASE_MODULE`].
    pub fn with_base() -> Self {
        let modules = Self::new();
        modules.register_module(BASE_MODULE, streams::register);
        modules
    }

    /// The process-wide loader used by [`StreamFactory::new`].
    ///
    /// Modules must be registered here before the factory that should load
    /// them is created.
    pub fn global() -> &'static StaticModules {
        GLOBAL_MODULES.call_once(Self::with_base)
    }

    /// Makes the module `name` loadable.
    pub fn register_module(&self, name: impl Into<String>, init: ModuleInit) {
        self.modules.write().insert(name.into(), init);
    }

    /// Names of the known modules, in registration order.
    pub fn module_names(&self) -> Vec<String> {
        self.modules.read().keys().cloned().collect()
    }
}

impl Default for StaticModules {
    fn default() -> Self {
        Self::with_base()
    }
}

impl ModuleLoader for StaticModules {
    fn load(&self, name: &str, factory: &StreamFactory) -> Result<(), LoadError> {
        let init = self.modules.read().get(name).copied();
        let init = init.ok_or_else(|| LoadError::NotFound {
            name: name.to_owned(),
        })?;
        init(factory);
        Ok(())
    }
}

impl fmt::Debug for StaticModules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticModules")
            .field("modules", &self.module_names())
            .finish()
    }
}

/// Tracks which modules a [`StreamFactory`] attempted to load.
pub struct PluginManager {
    loader: Box<dyn ModuleLoader>,
    states: Mutex<IndexMap<String, ModuleState, FxBuildHasher>>,
    loading: Mutex<()>,
}

impl PluginManager {
    /// Creates a manager resolving modules with `loader`.
    pub fn new(loader: impl ModuleLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            states: Mutex::new(IndexMap::default()),
            loading: Mutex::new(()),
        }
    }

    /// Parses a colon separated module list.
    ///
    /// Names keep their order, duplicates and blanks are dropped and
    /// [`BASE_MODULE`] is appended unless already listed.
    ///
    /// ```
    /// use ers::plugin::PluginManager;
    ///
    /// assert_eq!(
    ///     PluginManager::module_list(Some("a:b::a")),
    ///     ["a", "b", "ers_base_streams"]
    /// );
    /// assert_eq!(PluginManager::module_list(None), ["ers_base_streams"]);
    /// ```
    pub fn module_list(configured: Option<&str>) -> Vec<String> {
        let mut list: Vec<String> = Vec::new();
        let names = configured
            .unwrap_or_default()
            .split(SEPARATOR)
            .chain([BASE_MODULE])
            .map(str::trim)
            .filter(|name| !name.is_empty());
        for name in names {
            if !list.iter().any(|known| known == name) {
                list.push(name.to_owned());
            }
        }
        list
    }

    /// Loads every module configured for `factory` that was not attempted
    /// yet.
    ///
    /// Concurrent calls are serialized, so each module is attempted once.
    /// A module init function must not call back into this manager.
    pub fn load_configured(&self, factory: &StreamFactory) {
        let _loading = self.loading.lock();
        for name in Self::module_list(factory.configuration().stream_libs()) {
            if self.states.lock().contains_key(&name) {
                continue;
            }
            let state = match self.loader.load(&name, factory) {
                Ok(()) => ModuleState::Loaded,
                Err(error) => {
                    tracing::debug!(module = %name, %error, "stream module can not be loaded");
                    ModuleState::Failed(error)
                }
            };
            self.states.lock().insert(name, state);
        }
    }

    /// Load state of the module `name`.
    pub fn state(&self, name: &str) -> ModuleState {
        self.states
            .lock()
            .get(name)
            .cloned()
            .unwrap_or(ModuleState::NotAttempted)
    }

    /// Names of the loaded modules, in load order.
    pub fn loaded_modules(&self) -> Vec<String> {
        self.states
            .lock()
            .iter()
            .filter(|(_, state)| **state == ModuleState::Loaded)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("states", &*self.states.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Chain, Configuration, Issue, OutputStream, streams::NullStream};

    struct Stub;

    impl ModuleLoader for Stub {
        fn load(&self, name: &str, factory: &StreamFactory) -> Result<(), LoadError> {
            match name {
                "A" => Err(LoadError::Init {
                    name: name.to_owned(),
                    reason: "stub failure".to_owned(),
                }),
                "B" => {
                    factory.register_out_stream("b", |_: &str| {
                        Ok(Box::new(NullStream) as Box<dyn OutputStream>)
                    });
                    Ok(())
                }
                BASE_MODULE => {
                    streams::register(factory);
                    Ok(())
                }
                _ => Err(LoadError::NotFound {
                    name: name.to_owned(),
                }),
            }
        }
    }

    #[test]
    fn test_failing_module_does_not_stop_loading() {
        let config = Configuration::default().with_stream_libs("A:B");
        let factory = StreamFactory::with_loader(config, Stub);
        let plugins = factory.plugins();

        assert!(matches!(plugins.state("A"), ModuleState::Failed(LoadError::Init { .. })));
        assert_eq!(plugins.state("B"), ModuleState::Loaded);
        assert_eq!(plugins.state(BASE_MODULE), ModuleState::Loaded);
        assert_eq!(plugins.state("C"), ModuleState::NotAttempted);
        assert_eq!(plugins.loaded_modules(), ["B", BASE_MODULE]);
        assert!(factory.create_out_stream("b").is_some());
        assert!(factory.create_out_stream("stderr").is_some());
    }

    #[test]
    fn test_modules_are_attempted_once() {
        struct Counting(std::sync::atomic::AtomicUsize);

        impl ModuleLoader for Counting {
            fn load(&self, _: &str, _: &StreamFactory) -> Result<(), LoadError> {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            }
        }

        static LOADS: Counting = Counting(std::sync::atomic::AtomicUsize::new(0));
        let factory = StreamFactory::with_loader(Configuration::default(), &LOADS);
        factory.plugins().load_configured(&factory);
        assert_eq!(LOADS.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_loads_attempt_each_module_once() {
        struct Slow(std::sync::atomic::AtomicUsize);

        impl ModuleLoader for Slow {
            fn load(&self, name: &str, _: &StreamFactory) -> Result<(), LoadError> {
                if name == "slow" {
                    self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(50));
                }
                Ok(())
            }
        }

        static SLOW: Slow = Slow(std::sync::atomic::AtomicUsize::new(0));
        let config = Configuration::default().with_stream_libs("slow");
        let factory = StreamFactory::new(config);
        let plugins = PluginManager::new(&SLOW);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| plugins.load_configured(&factory));
            }
        });
        assert_eq!(SLOW.0.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(plugins.state("slow"), ModuleState::Loaded);
        assert_eq!(plugins.loaded_modules(), ["slow", BASE_MODULE]);
    }

    #[test]
    fn test_static_modules() {
        fn init(factory: &StreamFactory) {
            factory.register_out_stream("custom", |_: &str| {
                Ok(Box::new(Custom) as Box<dyn OutputStream>)
            });
        }

        struct Custom;

        impl OutputStream for Custom {
            fn write(&self, issue: &Issue, next: Chain<'_>) -> Result<(), Issue> {
                next.forward(issue)
            }
        }

        let modules = StaticModules::with_base();
        modules.register_module("custom_module", init);
        assert_eq!(modules.module_names(), [BASE_MODULE, "custom_module"]);

        let config = Configuration::default().with_stream_libs("custom_module:missing");
        let factory = StreamFactory::with_loader(config, modules);
        assert!(factory.create_out_stream("custom").is_some());
        assert_eq!(
            factory.plugins().state("missing"),
            ModuleState::Failed(LoadError::NotFound {
                name: "missing".to_owned()
            })
        );
    }
}
