//! Per-service constants: which config key names the host, which path prefix
//! the service lives under, and an optional built-in host.

/// Constants a calling service declares.
///
/// Every accessor returns `None` when the constant is not declared; an empty
/// string counts as not declared.
pub trait RestService {
    /// Suffix of the `api.<KEY>` host lookup. Uppercased before lookup.
    fn config_key(&self) -> Option<&str>;

    /// Path segment the service's routes live under, e.g. `users`.
    fn path_prefix(&self) -> Option<&str>;

    /// Host used when configuration has no `api.<KEY>` entry.
    fn default_host(&self) -> Option<&str> {
        None
    }
}

/// Plain-data `RestService` built at construction time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDescriptor {
    config_key: Option<String>,
    path_prefix: Option<String>,
    default_host: Option<String>,
}

impl ServiceDescriptor {
    pub fn new(config_key: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            config_key: Some(config_key.into()),
            path_prefix: Some(path_prefix.into()),
            default_host: None,
        }
    }

    pub fn with_default_host(mut self, host: impl Into<String>) -> Self {
        self.default_host = Some(host.into());
        self
    }

    pub fn with_config_key(mut self, key: impl Into<String>) -> Self {
        self.config_key = Some(key.into());
        self
    }

    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }
}

fn declared(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl RestService for ServiceDescriptor {
    fn config_key(&self) -> Option<&str> {
        declared(&self.config_key)
    }

    fn path_prefix(&self) -> Option<&str> {
        declared(&self.path_prefix)
    }

    fn default_host(&self) -> Option<&str> {
        declared(&self.default_host)
    }
}

impl<S: RestService + ?Sized> RestService for &S {
    fn config_key(&self) -> Option<&str> {
        (**self).config_key()
    }

    fn path_prefix(&self) -> Option<&str> {
        (**self).path_prefix()
    }

    fn default_host(&self) -> Option<&str> {
        (**self).default_host()
    }
}
