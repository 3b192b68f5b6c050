//! Clap argument types and their mapping onto [`Config`].

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use pullscope::config::Config;
use pullscope::models::FileChangeDescriptor;
use pullscope::prompt;

/// Pull request change extraction and review comment delivery.
#[derive(Parser, Debug)]
#[command(name = "pullscope", version = pullscope::constants::VERSION)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(long, short = 'q', global = true, default_value_t = false)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Print the reviewable changes of a pull request.
    Changes(Box<ChangesArgs>),

    /// Post a review comment on a pull request.
    Comment(CommentArgs),

    /// Print version and build information.
    Version,
}

/// Where the pull request lives. Every flag falls back to config and environment.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// Hosting provider: azure, azuredevops, or github (detected from the URL if omitted).
    #[arg(long)]
    pub provider: Option<String>,

    /// Organization or collection URL (GitHub Enterprise: the API root).
    #[arg(long)]
    pub org_url: Option<String>,

    /// Access token (Azure DevOps PAT or GitHub token).
    #[arg(long)]
    pub token: Option<String>,

    /// Azure DevOps project name.
    #[arg(long)]
    pub project: Option<String>,

    /// Repository id or name (Azure DevOps) or `owner/repo` (GitHub).
    #[arg(long)]
    pub repository: Option<String>,

    /// Pull request id or number.
    #[arg(long)]
    pub pr: Option<u64>,
}

impl ConnectionArgs {
    /// Layer 1: explicit flags override everything loaded so far.
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref provider) = self.provider {
            config.hosting.provider = Some(provider.clone());
        }
        if let Some(ref url) = self.org_url {
            config.hosting.organization_url = Some(url.clone());
        }
        if let Some(ref token) = self.token {
            config.hosting.access_token = Some(token.clone());
        }
        if let Some(ref project) = self.project {
            config.pull_request.project = Some(project.clone());
        }
        if let Some(ref repository) = self.repository {
            config.pull_request.repository = Some(repository.clone());
        }
        if let Some(pr) = self.pr {
            config.pull_request.id = Some(pr);
        }
    }
}

/// Arguments for the `changes` subcommand.
#[derive(Parser, Debug)]
pub struct ChangesArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Comma-separated extensions to include (default: every non-binary file).
    #[arg(long, value_delimiter = ',')]
    pub file_extensions: Vec<String>,

    /// Comma-separated extensions to exclude (default: built-in binary list).
    #[arg(long, value_delimiter = ',')]
    pub binary_extensions: Vec<String>,

    /// Return full file contents instead of reduced diffs.
    #[arg(long, default_value_t = false)]
    pub full_content: bool,

    /// Maximum number of files fetched concurrently (default: unbounded).
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Output format.
    #[arg(long, default_value = "json")]
    pub format: OutputFormat,

    /// Prompt template file containing a `{code_changes}` placeholder (for `--format prompt`).
    #[arg(long)]
    pub template: Option<PathBuf>,
}

impl ChangesArgs {
    pub fn apply(&self, config: &mut Config) {
        self.connection.apply(config);
        if !self.file_extensions.is_empty() {
            config.review.file_extensions = self.file_extensions.clone();
        }
        if !self.binary_extensions.is_empty() {
            config.review.binary_extensions = self.binary_extensions.clone();
        }
        if self.full_content {
            config.review.throttle_mode = false;
        }
        if self.max_concurrent.is_some() {
            config.hosting.max_concurrent = self.max_concurrent;
        }
    }
}

/// Arguments for the `comment` subcommand.
#[derive(Parser, Debug)]
pub struct CommentArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Read the comment body from this file instead of stdin.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Heading placed above the comment (default: `[review].comment_header`).
    #[arg(long)]
    pub header: Option<String>,

    /// Post the content without any heading.
    #[arg(long, default_value_t = false, conflicts_with = "header")]
    pub no_header: bool,
}

impl CommentArgs {
    /// The header to post with, or `None` for a bare comment.
    pub fn resolve_header(&self, config: &Config) -> Option<String> {
        if self.no_header {
            return None;
        }
        self.header
            .clone()
            .or_else(|| Some(config.review.comment_header.clone()))
            .filter(|h| !h.trim().is_empty())
    }
}

/// Output format options for `changes`.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
    Prompt,
}

impl OutputFormat {
    /// Render descriptors in this format. `template` is only used by `Prompt`.
    pub fn render(
        &self,
        changes: &[FileChangeDescriptor],
        template: Option<&str>,
    ) -> Result<String, serde_json::Error> {
        Ok(match self {
            OutputFormat::Json => serde_json::to_string_pretty(changes)?,
            OutputFormat::Markdown => prompt::render_code_changes(changes),
            OutputFormat::Prompt => prompt::apply_template(
                template.unwrap_or(pullscope::constants::CODE_CHANGES_PLACEHOLDER),
                changes,
            ),
        })
    }
}
