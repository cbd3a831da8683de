//! Named lookup over the registered backends.

use log::warn;

use crate::{BackendCapability, BackendError, CpuBackend};

/// Registry of available backends with priority-ordered selection.
///
/// The first registered backend is the default and the fallback target.
pub struct BackendRegistry {
    backends: Vec<Box<dyn BackendCapability>>,
}

impl BackendRegistry {
    /// Create a registry with the given backends (first = highest priority).
    #[must_use]
    pub fn new(backends: Vec<Box<dyn BackendCapability>>) -> Self {
        Self { backends }
    }

    /// Registry holding only the reference host backend.
    #[must_use]
    pub fn with_cpu() -> Self {
        Self::new(vec![Box::new(CpuBackend::default())])
    }

    /// Append a backend at the lowest priority.
    pub fn register(&mut self, backend: Box<dyn BackendCapability>) {
        self.backends.push(backend);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn BackendCapability> {
        self.backends
            .iter()
            .find(|b| b.name() == name)
            .map(|b| b.as_ref())
    }

    #[must_use]
    pub fn default_backend(&self) -> Option<&dyn BackendCapability> {
        self.backends.first().map(|b| b.as_ref())
    }

    #[must_use]
    pub fn available_backends(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Resolve a requested backend name, or the default when none is given.
    pub fn resolve(&self, requested: Option<&str>) -> Result<&dyn BackendCapability, BackendError> {
        match requested {
            Some(name) => self.get(name).ok_or_else(|| BackendError::Unavailable {
                backend: name.to_owned(),
            }),
            None => self
                .default_backend()
                .ok_or_else(|| BackendError::Unavailable {
                    backend: "(none)".to_owned(),
                }),
        }
    }

    /// Like [`resolve`](Self::resolve), but an unknown name falls back to the
    /// default backend. The flag reports whether a fallback occurred.
    pub fn resolve_with_fallback(
        &self,
        requested: Option<&str>,
    ) -> Result<(&dyn BackendCapability, bool), BackendError> {
        match self.resolve(requested) {
            Ok(backend) => Ok((backend, false)),
            Err(BackendError::Unavailable { backend: missing }) => {
                let fallback = self
                    .default_backend()
                    .ok_or_else(|| BackendError::Unavailable {
                        backend: "(no fallback)".to_owned(),
                    })?;
                warn!(
                    "backend {missing} unavailable, falling back to {}",
                    fallback.name()
                );
                Ok((fallback, true))
            }
            Err(other) => Err(other),
        }
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_cpu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CpuBackendConfig;

    #[test]
    fn default_registry_has_cpu() {
        let registry = BackendRegistry::default();
        assert_eq!(registry.available_backends(), vec!["cpu"]);
        assert_eq!(
            registry.default_backend().map(|b| b.name()),
            Some("cpu")
        );
        assert!(registry.get("gpu").is_none());
    }

    #[test]
    fn resolve_unknown_backend_fails() {
        let registry = BackendRegistry::default();
        let err = registry.resolve(Some("tpu")).err().expect("unknown backend");
        assert_eq!(
            err,
            BackendError::Unavailable {
                backend: "tpu".to_owned()
            }
        );
    }

    #[test]
    fn resolve_with_fallback_reports_fallback() {
        let registry = BackendRegistry::default();
        let (backend, fell_back) = registry
            .resolve_with_fallback(Some("tpu"))
            .expect("fallback to cpu");
        assert_eq!(backend.name(), "cpu");
        assert!(fell_back);

        let (_, fell_back) = registry
            .resolve_with_fallback(Some("cpu"))
            .expect("direct hit");
        assert!(!fell_back);
    }

    #[test]
    fn empty_registry_has_no_fallback() {
        let registry = BackendRegistry::new(Vec::new());
        assert!(registry.resolve(None).is_err());
        assert!(registry.resolve_with_fallback(Some("cpu")).is_err());
    }

    #[test]
    fn registered_backends_keep_priority_order() {
        let mut registry = BackendRegistry::new(Vec::new());
        registry.register(Box::new(CpuBackend::new(CpuBackendConfig::default())));
        registry.register(Box::new(CpuBackend::permissive()));
        assert_eq!(registry.available_backends().len(), 2);
        let first = registry.resolve(None).expect("default");
        assert!(!first.supports_multi_axis(crate::ReduceOp::Prod));
    }
}
