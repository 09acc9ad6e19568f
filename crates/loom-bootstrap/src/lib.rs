//! Boot hooks run from the static initializer of every compiled class, and insertion of that
//! static initializer into synthesized classes.

mod insert;

use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;

pub use insert::{insert_bootstrap, BootstrapOptions, BOOTSTRAP_CALL, NO_BOOTSTRAP_ANNOTATION};

/// A boot hook. It is invoked many times and must short-circuit once initialized.
pub trait Bootstrap: Send + Sync {
    /// Returns `true` when initialization succeeded.
    fn boot(&self) -> bool;
}

/// Runs its initializer on the first `boot()` and returns the cached result afterwards.
pub struct OnceBootstrap {
    name: String,
    init: Box<dyn Fn() -> bool + Send + Sync>,
    result: OnceCell<bool>,
}

impl OnceBootstrap {
    pub fn new(name: impl Into<String>, init: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            init: Box::new(init),
            result: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_booted(&self) -> bool {
        self.result.get().is_some()
    }
}

impl Bootstrap for OnceBootstrap {
    fn boot(&self) -> bool {
        *self.result.get_or_init(|| {
            let ok = (self.init)();
            if ok {
                tracing::debug!(target: "loom.bootstrap", name = %self.name, "booted");
            } else {
                tracing::warn!(target: "loom.bootstrap", name = %self.name, "boot failed");
            }
            ok
        })
    }
}

impl std::fmt::Debug for OnceBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnceBootstrap")
            .field("name", &self.name)
            .field("result", &self.result.get())
            .finish()
    }
}

/// The set of registered boot hooks.
#[derive(Default)]
pub struct Bootstraps {
    hooks: RwLock<Vec<Arc<dyn Bootstrap>>>,
}

static GLOBAL: Lazy<Bootstraps> = Lazy::new(Bootstraps::new);

impl Bootstraps {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry `IBootstrap.dasBoot()` consults.
    pub fn global() -> &'static Bootstraps {
        &GLOBAL
    }

    /// Registers `hook`; registering the same hook twice is a no-op. Returns whether it was added.
    pub fn register(&self, hook: Arc<dyn Bootstrap>) -> bool {
        let mut hooks = self.hooks.write();
        let ptr = Arc::as_ptr(&hook) as *const ();
        if hooks.iter().any(|h| Arc::as_ptr(h) as *const () == ptr) {
            return false;
        }
        hooks.push(hook);
        true
    }

    pub fn len(&self) -> usize {
        self.hooks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.read().is_empty()
    }

    /// Boots every hook, even after one fails, and returns whether all succeeded.
    pub fn das_boot(&self) -> bool {
        let hooks = self.hooks.read().clone();
        hooks.iter().fold(true, |ok, hook| hook.boot() & ok)
    }
}
