//! App-wide constants.
//!
//! Centralises the tool name, config paths, environment variable names,
//! and fixed strings so a rename only requires changing this file.

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "pullscope";

/// Crate version as declared in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compilation target triple, injected by `build.rs`.
pub const TARGET: &str = env!("TARGET");

/// Local config filename (e.g. `.pullscope.toml` in the working directory).
pub const CONFIG_FILENAME: &str = ".pullscope.toml";

/// Directory name under `~/.config/` for global config.
pub const CONFIG_DIR: &str = "pullscope";

/// Content placed in a descriptor when a single file could not be fetched or diffed.
pub const CONTENT_UNAVAILABLE: &str = "Unable to get PR change content";

/// Placeholder replaced with the rendered file changes in a prompt template.
pub const CODE_CHANGES_PLACEHOLDER: &str = "{code_changes}";

/// Default header for posted review comments.
pub const DEFAULT_COMMENT_HEADER: &str = "AI Code Review";

/// `User-Agent` sent with every hosting-provider request.
pub const USER_AGENT: &str = concat!("pullscope/", env!("CARGO_PKG_VERSION"));

// ── Environment variable names ──────────────────────────────────────

pub const ENV_PROVIDER: &str = "PULLSCOPE_PROVIDER";
pub const ENV_TOKEN: &str = "PULLSCOPE_TOKEN";
pub const ENV_ORG_URL: &str = "PULLSCOPE_ORG_URL";
pub const ENV_PROJECT: &str = "PULLSCOPE_PROJECT";
pub const ENV_REPOSITORY: &str = "PULLSCOPE_REPOSITORY";
pub const ENV_PR_ID: &str = "PULLSCOPE_PR_ID";
pub const ENV_FILE_EXTENSIONS: &str = "PULLSCOPE_FILE_EXTENSIONS";
pub const ENV_BINARY_EXTENSIONS: &str = "PULLSCOPE_BINARY_EXTENSIONS";
pub const ENV_THROTTLE_MODE: &str = "PULLSCOPE_THROTTLE_MODE";

// Azure Pipelines predefined variables.
pub const ENV_AZURE_ACCESS_TOKEN: &str = "SYSTEM_ACCESSTOKEN";
pub const ENV_AZURE_COLLECTION_URI: &str = "SYSTEM_COLLECTIONURI";
pub const ENV_AZURE_PROJECT: &str = "SYSTEM_TEAMPROJECT";
pub const ENV_AZURE_REPOSITORY_ID: &str = "BUILD_REPOSITORY_ID";
pub const ENV_AZURE_PR_ID: &str = "SYSTEM_PULLREQUEST_PULLREQUESTID";

// GitHub Actions predefined variables.
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_GITHUB_API_URL: &str = "GITHUB_API_URL";
pub const ENV_GITHUB_REPOSITORY: &str = "GITHUB_REPOSITORY";
pub const ENV_GITHUB_REF: &str = "GITHUB_REF";
