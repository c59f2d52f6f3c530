//! Absolute URL resolution: `host/prefix/version/path_prefix[/uri]`.

use std::sync::Arc;

use crate::config::ConfigSource;
use crate::error::{RestError, Result};
use crate::service::RestService;

/// Computes target URLs from injected configuration and service constants.
#[derive(Clone)]
pub struct UrlResolver {
    config: Arc<dyn ConfigSource + Send + Sync>,
}

impl std::fmt::Debug for UrlResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlResolver").finish_non_exhaustive()
    }
}

impl UrlResolver {
    pub fn new(config: impl ConfigSource + Send + Sync + 'static) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// `api.<CONFIG_KEY>` from configuration, else the service's default host.
    pub fn resolve_host(&self, service: &dyn RestService) -> Result<String> {
        let key = service
            .config_key()
            .ok_or_else(|| RestError::ConfigurationMissing("config_key".to_string()))?;
        let config_key = format!("api.{}", key.to_ascii_uppercase());

        if let Some(host) = self.config.get(&config_key) {
            return Ok(host);
        }
        if let Some(host) = service.default_host() {
            return Ok(host.to_string());
        }
        Err(RestError::ConfigurationMissing(config_key))
    }

    /// `<api.prefix>/<api.version>`.
    pub fn resolve_version_segment(&self) -> Result<String> {
        let prefix = self.required("api.prefix")?;
        let version = self.required("api.version")?;
        Ok(format!("{prefix}/{version}"))
    }

    pub fn resolve_path_prefix(&self, service: &dyn RestService) -> Result<String> {
        service
            .path_prefix()
            .map(str::to_string)
            .ok_or_else(|| RestError::ConfigurationMissing("path_prefix".to_string()))
    }

    /// Full URL for `uri` on `service`. Fails before any I/O when a piece is
    /// missing.
    pub fn url_for(&self, service: &dyn RestService, uri: &str) -> Result<String> {
        let host = self.resolve_host(service)?;
        let version = self.resolve_version_segment()?;
        let prefix = self.resolve_path_prefix(service)?;
        Ok(build_url(&host, &version, &prefix, uri))
    }

    fn required(&self, key: &str) -> Result<String> {
        self.config
            .get(key)
            .ok_or_else(|| RestError::ConfigurationMissing(key.to_string()))
    }
}

/// Joins the URL components with single `/` separators.
///
/// One leading `/` is stripped from `uri`; an empty `uri` adds no trailing
/// segment.
pub fn build_url(host: &str, version_segment: &str, path_prefix: &str, uri: &str) -> String {
    let uri = uri.strip_prefix('/').unwrap_or(uri);
    let mut url = host.trim_end_matches('/').to_string();
    for segment in [version_segment.trim_matches('/'), path_prefix.trim_matches('/'), uri] {
        if segment.is_empty() {
            continue;
        }
        url.push('/');
        url.push_str(segment);
    }
    url
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::ApiConfig;
    use crate::service::ServiceDescriptor;

    fn resolver() -> UrlResolver {
        UrlResolver::new(
            ApiConfig::new()
                .with_prefix("api")
                .with_version("v1")
                .with_host("users", "http://users.internal"),
        )
    }

    #[test]
    fn empty_uri_has_no_trailing_slash() {
        assert_eq!(build_url("http://h", "v1/2", "users", ""), "http://h/v1/2/users");
    }

    #[test]
    fn leading_slash_is_stripped_once() {
        assert_eq!(build_url("http://h", "v1/2", "users", "/42"), "http://h/v1/2/users/42");
        assert_eq!(build_url("http://h", "v1/2", "users", "//42"), "http://h/v1/2/users//42");
    }

    #[test]
    fn stray_component_slashes_are_not_duplicated() {
        assert_eq!(build_url("http://h/", "/api/v1/", "/users/", "42"), "http://h/api/v1/users/42");
    }

    #[test]
    fn host_comes_from_uppercased_config_key() {
        let service = ServiceDescriptor::new("users", "users").with_default_host("http://fallback");
        assert_eq!(resolver().resolve_host(&service).unwrap(), "http://users.internal");
    }

    #[test]
    fn host_falls_back_to_service_default() {
        let service = ServiceDescriptor::new("billing", "invoices").with_default_host("http://billing");
        assert_eq!(resolver().resolve_host(&service).unwrap(), "http://billing");
    }

    #[test]
    fn missing_host_names_the_config_key() {
        let service = ServiceDescriptor::new("billing", "invoices");
        let err = resolver().resolve_host(&service).unwrap_err();
        assert!(matches!(err, RestError::ConfigurationMissing(ref k) if k == "api.BILLING"));
    }

    #[test]
    fn missing_config_key_is_reported() {
        let service = ServiceDescriptor::default().with_path_prefix("users");
        let err = resolver().resolve_host(&service).unwrap_err();
        assert!(matches!(err, RestError::ConfigurationMissing(ref k) if k == "config_key"));
    }

    #[test]
    fn version_segment_joins_prefix_and_version() {
        assert_eq!(resolver().resolve_version_segment().unwrap(), "api/v1");
    }

    #[test]
    fn missing_prefix_or_version_is_configuration_missing() {
        let no_version = UrlResolver::new(ApiConfig::new().with_prefix("api"));
        let err = no_version.resolve_version_segment().unwrap_err();
        assert!(matches!(err, RestError::ConfigurationMissing(ref k) if k == "api.version"));

        let no_prefix = UrlResolver::new(ApiConfig::new().with_version("v1"));
        let err = no_prefix.resolve_version_segment().unwrap_err();
        assert!(matches!(err, RestError::ConfigurationMissing(ref k) if k == "api.prefix"));
    }

    #[test]
    fn missing_path_prefix_is_configuration_missing() {
        let service = ServiceDescriptor::default().with_config_key("users");
        let err = resolver().resolve_path_prefix(&service).unwrap_err();
        assert!(matches!(err, RestError::ConfigurationMissing(ref k) if k == "path_prefix"));
    }

    #[test]
    fn url_for_resolves_every_component() {
        let service = ServiceDescriptor::new("users", "users");
        assert_eq!(
            resolver().url_for(&service, "/42/avatar").unwrap(),
            "http://users.internal/api/v1/users/42/avatar"
        );
    }

    #[test]
    fn plain_maps_are_config_sources() {
        let mut map = HashMap::new();
        map.insert("api.prefix".to_string(), "svc".to_string());
        map.insert("api.version".to_string(), "2".to_string());
        map.insert("api.ORDERS".to_string(), "http://orders".to_string());
        let resolver = UrlResolver::new(map);
        let service = ServiceDescriptor::new("orders", "orders");
        assert_eq!(resolver.url_for(&service, "").unwrap(), "http://orders/svc/2/orders");
    }
}
