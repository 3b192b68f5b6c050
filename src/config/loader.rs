//! Config struct and loading logic.
//!
//! Priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (`PULLSCOPE_*`, then CI predefined variables)
//! 3. `.pullscope.toml` in the working directory
//! 4. `~/.config/pullscope/config.toml` (global defaults)
//! 5. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::constants;
use crate::diff::DiffRenderer;
use crate::env::Env;
use crate::filter::FilterConfig;
use crate::hosting::{HostingConfig, RetryPolicy, ServiceOptions, detect_provider};
use crate::models::PullRequestCoordinates;

/// Errors during config loading and resolution.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("missing {field}: set {hint}")]
    Missing {
        field: &'static str,
        hint: &'static str,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hosting: HostingSettings,
    pub review: ReviewSettings,
    pub pull_request: PullRequestSettings,
}

/// Connection and transport settings for the hosting provider.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostingSettings {
    /// Registry name (`azure`, `azuredevops`, `github`). Detected from the URL when unset.
    pub provider: Option<String>,
    pub organization_url: Option<String>,
    pub access_token: Option<String>,
    pub max_concurrent: Option<usize>,
    pub request_timeout_secs: u64,
    pub retries: u32,
    pub diff_timeout_secs: u64,
    pub git_program: String,
}

impl std::fmt::Debug for HostingSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostingSettings")
            .field("provider", &self.provider)
            .field("organization_url", &self.organization_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("max_concurrent", &self.max_concurrent)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("retries", &self.retries)
            .field("diff_timeout_secs", &self.diff_timeout_secs)
            .field("git_program", &self.git_program)
            .finish()
    }
}

impl Default for HostingSettings {
    fn default() -> Self {
        Self {
            provider: None,
            organization_url: None,
            access_token: None,
            max_concurrent: None,
            request_timeout_secs: 60,
            retries: crate::hosting::retry::DEFAULT_MAX_RETRIES,
            diff_timeout_secs: 30,
            git_program: "git".to_string(),
        }
    }
}

/// What to extract from the pull request and how to label the comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSettings {
    pub file_extensions: Vec<String>,
    pub binary_extensions: Vec<String>,
    pub throttle_mode: bool,
    pub comment_header: String,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            file_extensions: Vec::new(),
            binary_extensions: Vec::new(),
            throttle_mode: true,
            comment_header: constants::DEFAULT_COMMENT_HEADER.to_string(),
        }
    }
}

/// Coordinates of the pull request under review.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequestSettings {
    pub project: Option<String>,
    pub repository: Option<String>,
    pub id: Option<u64>,
}

/// One config file as written. Keys absent from the file stay `None` so
/// they never override a lower layer.
#[derive(Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    hosting: HostingLayer,
    review: ReviewLayer,
    pull_request: PullRequestSettings,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct HostingLayer {
    provider: Option<String>,
    organization_url: Option<String>,
    access_token: Option<String>,
    max_concurrent: Option<usize>,
    request_timeout_secs: Option<u64>,
    retries: Option<u32>,
    diff_timeout_secs: Option<u64>,
    git_program: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct ReviewLayer {
    file_extensions: Option<Vec<String>>,
    binary_extensions: Option<Vec<String>>,
    throttle_mode: Option<bool>,
    comment_header: Option<String>,
}

impl Config {
    /// Load configuration with proper layering.
    ///
    /// Reads from global config, then `dir`'s local config, then applies
    /// environment variable overrides.
    pub fn load(dir: Option<&Path>, env: &Env) -> Result<Self, ConfigError> {
        Self::load_layers(Self::global_config_path().as_deref(), dir, env)
    }

    fn load_layers(
        global: Option<&Path>,
        dir: Option<&Path>,
        env: &Env,
    ) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Layer 4: global config
        if let Some(global_path) = global {
            if global_path.exists() {
                let global = Self::load_file(global_path)?;
                config.merge(global);
            }
        }

        // Layer 3: local config
        if let Some(dir) = dir {
            let local_path = dir.join(constants::CONFIG_FILENAME);
            if local_path.exists() {
                let local = Self::load_file(&local_path)?;
                config.merge(local);
            }
        }

        // Layer 2: environment variables
        config.apply_env_vars(env);

        Ok(config)
    }

    /// Load one config file as a layer of explicitly set keys.
    fn load_file(path: &Path) -> Result<ConfigLayer, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        toml::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the global config file path.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(constants::CONFIG_DIR).join("config.toml"))
    }

    /// Merge a file layer into this config. Every key the layer sets wins,
    /// including values equal to the built-in defaults.
    fn merge(&mut self, layer: ConfigLayer) {
        let ConfigLayer {
            hosting,
            review,
            pull_request,
        } = layer;

        set_if_some(&mut self.hosting.provider, hosting.provider);
        set_if_some(&mut self.hosting.organization_url, hosting.organization_url);
        set_if_some(&mut self.hosting.access_token, hosting.access_token);
        set_if_some(&mut self.hosting.max_concurrent, hosting.max_concurrent);
        if let Some(secs) = hosting.request_timeout_secs {
            self.hosting.request_timeout_secs = secs;
        }
        if let Some(retries) = hosting.retries {
            self.hosting.retries = retries;
        }
        if let Some(secs) = hosting.diff_timeout_secs {
            self.hosting.diff_timeout_secs = secs;
        }
        if let Some(program) = hosting.git_program {
            self.hosting.git_program = program;
        }

        if let Some(exts) = review.file_extensions {
            self.review.file_extensions = exts;
        }
        if let Some(exts) = review.binary_extensions {
            self.review.binary_extensions = exts;
        }
        if let Some(throttle_mode) = review.throttle_mode {
            self.review.throttle_mode = throttle_mode;
        }
        if let Some(header) = review.comment_header {
            self.review.comment_header = header;
        }

        set_if_some(&mut self.pull_request.project, pull_request.project);
        set_if_some(&mut self.pull_request.repository, pull_request.repository);
        set_if_some(&mut self.pull_request.id, pull_request.id);
    }

    /// Apply environment variable overrides.
    ///
    /// `PULLSCOPE_*` variables always win. CI predefined variables only fill
    /// values that are still unset after the file layers.
    fn apply_env_vars(&mut self, env: &Env) {
        if let Some(val) = env.first_of(&[constants::ENV_PROVIDER]) {
            self.hosting.provider = Some(val);
        }

        override_or_fill(
            &mut self.hosting.access_token,
            env.first_of(&[constants::ENV_TOKEN]),
            || env.first_of(&[constants::ENV_AZURE_ACCESS_TOKEN, constants::ENV_GITHUB_TOKEN]),
        );
        override_or_fill(
            &mut self.hosting.organization_url,
            env.first_of(&[constants::ENV_ORG_URL]),
            || env.first_of(&[constants::ENV_AZURE_COLLECTION_URI, constants::ENV_GITHUB_API_URL]),
        );
        override_or_fill(
            &mut self.pull_request.project,
            env.first_of(&[constants::ENV_PROJECT]),
            || env.first_of(&[constants::ENV_AZURE_PROJECT]),
        );
        override_or_fill(
            &mut self.pull_request.repository,
            env.first_of(&[constants::ENV_REPOSITORY]),
            || {
                env.first_of(&[
                    constants::ENV_AZURE_REPOSITORY_ID,
                    constants::ENV_GITHUB_REPOSITORY,
                ])
            },
        );

        let explicit_id = env
            .first_of(&[constants::ENV_PR_ID])
            .and_then(|v| parse_pr_id(constants::ENV_PR_ID, &v));
        override_or_fill(&mut self.pull_request.id, explicit_id, || {
            env.first_of(&[constants::ENV_AZURE_PR_ID])
                .and_then(|v| parse_pr_id(constants::ENV_AZURE_PR_ID, &v))
                .or_else(|| {
                    env.first_of(&[constants::ENV_GITHUB_REF])
                        .and_then(|r| pr_number_from_ref(&r))
                })
        });

        if let Some(exts) = env.list(constants::ENV_FILE_EXTENSIONS) {
            self.review.file_extensions = exts;
        }
        if let Some(exts) = env.list(constants::ENV_BINARY_EXTENSIONS) {
            self.review.binary_extensions = exts;
        }
        if let Ok(raw) = env.var(constants::ENV_THROTTLE_MODE) {
            match crate::env::parse_flag(&raw) {
                Some(flag) => self.review.throttle_mode = flag,
                None => tracing::warn!(
                    "ignoring invalid {} value: {raw}",
                    constants::ENV_THROTTLE_MODE
                ),
            }
        }
    }

    /// Registry name of the hosting provider: configured, or detected from the URL.
    pub fn provider_name(&self) -> String {
        match self.hosting.provider.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_lowercase(),
            _ => detect_provider(self.hosting.organization_url.as_deref()).to_string(),
        }
    }

    /// Connection settings for registering the hosting service.
    pub fn hosting_config(&self) -> Result<HostingConfig, ConfigError> {
        let access_token = self
            .hosting
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing {
                field: "access token",
                hint: "--token, PULLSCOPE_TOKEN, or [hosting].access_token",
            })?;
        Ok(HostingConfig {
            access_token,
            organization_url: self.hosting.organization_url.clone(),
        })
    }

    /// Pull request coordinates. The project may be empty; the adapter decides.
    pub fn coordinates(&self) -> Result<PullRequestCoordinates, ConfigError> {
        let repository = self
            .pull_request
            .repository
            .clone()
            .filter(|r| !r.trim().is_empty())
            .ok_or(ConfigError::Missing {
                field: "repository",
                hint: "--repository, PULLSCOPE_REPOSITORY, or [pull_request].repository",
            })?;
        let id = self.pull_request.id.ok_or(ConfigError::Missing {
            field: "pull request id",
            hint: "--pr, PULLSCOPE_PR_ID, or [pull_request].id",
        })?;
        Ok(PullRequestCoordinates::new(
            self.pull_request.project.clone().unwrap_or_default(),
            repository,
            id,
        ))
    }

    pub fn filter(&self) -> FilterConfig {
        FilterConfig::new(&self.review.file_extensions, &self.review.binary_extensions)
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            max_concurrent: self.hosting.max_concurrent.filter(|n| *n > 0),
            retry: RetryPolicy::with_max_retries(self.hosting.retries),
            request_timeout: Duration::from_secs(self.hosting.request_timeout_secs.max(1)),
            diff: DiffRenderer::new(
                &self.hosting.git_program,
                Duration::from_secs(self.hosting.diff_timeout_secs.max(1)),
            ),
        }
    }
}

fn set_if_some<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Set `slot` to `explicit` if present; otherwise fill it from `fallback` when empty.
fn override_or_fill<T>(
    slot: &mut Option<T>,
    explicit: Option<T>,
    fallback: impl FnOnce() -> Option<T>,
) {
    if explicit.is_some() {
        *slot = explicit;
    } else if slot.is_none() {
        *slot = fallback();
    }
}

fn parse_pr_id(var: &str, raw: &str) -> Option<u64> {
    match raw.trim().parse() {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::warn!("ignoring invalid {var} value: {raw}");
            None
        }
    }
}

/// PR number from a GitHub Actions ref such as `refs/pull/42/merge`.
fn pr_number_from_ref(git_ref: &str) -> Option<u64> {
    git_ref
        .strip_prefix("refs/pull/")?
        .split('/')
        .next()?
        .parse()
        .ok()
}
