//! Registry of named hosting services.
//!
//! Configurations are registered up front; adapters are constructed on the
//! first [`HostingRegistry::get`] for a name and reused afterwards.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use strum::{Display, EnumString};

use super::azure::AzureDevOpsService;
use super::github::GithubService;
use super::{HostingError, HostingService, ServiceOptions};

/// Connection settings for one hosting service.
#[derive(Clone, Default)]
pub struct HostingConfig {
    pub access_token: String,
    pub organization_url: Option<String>,
}

impl fmt::Debug for HostingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostingConfig")
            .field(
                "access_token",
                &if self.access_token.is_empty() { "<empty>" } else { "[REDACTED]" },
            )
            .field("organization_url", &self.organization_url)
            .finish()
    }
}

/// The adapter family a registered name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ProviderFamily {
    #[strum(to_string = "azure", serialize = "azuredevops")]
    Azure,
    #[strum(to_string = "github")]
    GitHub,
}

/// Guess the provider family from an organization URL.
///
/// URLs mentioning GitHub map to [`ProviderFamily::GitHub`]; anything else,
/// including no URL at all, maps to Azure DevOps.
pub fn detect_provider(organization_url: Option<&str>) -> ProviderFamily {
    match organization_url {
        Some(url) if url.to_ascii_lowercase().contains("github") => ProviderFamily::GitHub,
        _ => ProviderFamily::Azure,
    }
}

struct RegistryEntry {
    config: HostingConfig,
    instance: Option<Arc<dyn HostingService>>,
}

/// Name → lazily constructed hosting service.
#[derive(Default)]
pub struct HostingRegistry {
    entries: HashMap<String, RegistryEntry>,
    options: ServiceOptions,
}

impl HostingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose adapters are built with the given options.
    pub fn with_options(options: ServiceOptions) -> Self {
        Self {
            entries: HashMap::new(),
            options,
        }
    }

    /// Store `config` under `name`. Nothing is constructed yet.
    ///
    /// Re-registering a name replaces its configuration and drops any
    /// instance built from the previous one.
    pub fn register_service(
        &mut self,
        name: &str,
        config: HostingConfig,
    ) -> Result<(), HostingError> {
        if config.access_token.trim().is_empty() {
            return Err(HostingError::Configuration(format!(
                "an access token is required to register '{name}'"
            )));
        }
        let key = normalize(name);
        tracing::debug!(service = %key, ?config, "registered hosting service");
        self.entries.insert(
            key,
            RegistryEntry {
                config,
                instance: None,
            },
        );
        Ok(())
    }

    /// Return the service for `name`, constructing it on first use.
    pub fn get(&mut self, name: &str) -> Result<Arc<dyn HostingService>, HostingError> {
        let key = normalize(name);
        let entry = self
            .entries
            .get_mut(&key)
            .ok_or_else(|| HostingError::NotRegistered(key.clone()))?;

        if let Some(instance) = &entry.instance {
            return Ok(Arc::clone(instance));
        }

        let family = ProviderFamily::from_str(&key)
            .map_err(|_| HostingError::UnsupportedProvider(key.clone()))?;
        let url = entry.config.organization_url.as_deref();
        let token = entry.config.access_token.as_str();
        let options = self.options.clone();

        let instance: Arc<dyn HostingService> = match family {
            ProviderFamily::Azure => Arc::new(AzureDevOpsService::new(token, url, options)?),
            ProviderFamily::GitHub => Arc::new(GithubService::new(token, url, options)?),
        };
        tracing::debug!(
            service = %key,
            provider = instance.provider_name(),
            "constructed hosting service"
        );

        entry.instance = Some(Arc::clone(&instance));
        Ok(instance)
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize(name))
    }

    /// Forget a service and its cached instance. Returns whether it existed.
    pub fn remove_service(&mut self, name: &str) -> bool {
        self.entries.remove(&normalize(name)).is_some()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
