use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::backend::Backend;
use crate::backends::{ByteBackend, NativeBackend};
use crate::error::MbError;
use crate::validate::Strictness;

#[derive(Debug, Clone, Deserialize)]
pub struct MbConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
}

fn default_backend() -> String {
    "native".to_string()
}

impl Default for MbConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
        }
    }
}

/// Named backends available to [`MbString`].
#[derive(Clone, Default)]
pub struct Registry {
    backends: HashMap<String, Arc<dyn Backend>>,
}

impl Registry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in `native` and `bytes` backends.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(NativeBackend));
        registry.register(Arc::new(ByteBackend));
        registry
    }

    /// Register `backend` under its own name, replacing any previous one.
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        self.backends.insert(backend.name().to_string(), backend);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Backend>, MbError> {
        self.backends
            .get(name)
            .cloned()
            .ok_or_else(|| MbError::UnknownBackend(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Facade over the configured backend.
///
/// The backend is resolved on every call, so changing it with
/// [`MbString::set_backend`] affects the next operation and an unknown name
/// only surfaces once something is asked of it.
#[derive(Clone)]
pub struct MbString {
    registry: Registry,
    backend: String,
}

impl MbString {
    pub fn new(registry: Registry, backend: impl Into<String>) -> Self {
        Self {
            registry,
            backend: backend.into(),
        }
    }

    pub fn from_config(config: &MbConfig) -> Self {
        Self::new(Registry::with_builtin(), config.backend.clone())
    }

    pub fn backend_name(&self) -> &str {
        &self.backend
    }

    pub fn set_backend(&mut self, name: impl Into<String>) {
        self.backend = name.into();
    }

    /// A copy of this facade bound to another backend.
    pub fn using(&self, name: impl Into<String>) -> Self {
        Self::new(self.registry.clone(), name)
    }

    fn resolve(&self) -> Result<Arc<dyn Backend>, MbError> {
        let backend = self.registry.get(&self.backend);
        if backend.is_err() {
            tracing::warn!(backend = %self.backend, "Unknown multibyte backend requested");
        }
        backend
    }

    pub fn is_utf8(&self, input: impl AsRef<[u8]>, strictness: Strictness) -> Result<bool, MbError> {
        Ok(self.resolve()?.is_utf8(input.as_ref(), strictness))
    }

    pub fn strlen(&self, input: impl AsRef<[u8]>) -> Result<usize, MbError> {
        Ok(self.resolve()?.strlen(input.as_ref()))
    }

    pub fn strpos(
        &self,
        haystack: impl AsRef<[u8]>,
        needle: impl AsRef<[u8]>,
        offset: isize,
    ) -> Result<Option<usize>, MbError> {
        Ok(self
            .resolve()?
            .strpos(haystack.as_ref(), needle.as_ref(), offset))
    }

    pub fn strrpos(
        &self,
        haystack: impl AsRef<[u8]>,
        needle: impl AsRef<[u8]>,
        offset: isize,
    ) -> Result<Option<usize>, MbError> {
        Ok(self
            .resolve()?
            .strrpos(haystack.as_ref(), needle.as_ref(), offset))
    }

    pub fn substr(
        &self,
        input: impl AsRef<[u8]>,
        start: isize,
        length: Option<isize>,
    ) -> Result<Vec<u8>, MbError> {
        Ok(self.resolve()?.substr(input.as_ref(), start, length))
    }
}

impl Default for MbString {
    fn default() -> Self {
        Self::from_config(&MbConfig::default())
    }
}
