//! pullscope: pull request change extraction and review comment CLI.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

mod cli;

use pullscope::config::Config;
use pullscope::constants;
use pullscope::env::Env;
use pullscope::hosting::{HostingRegistry, HostingService};
use pullscope::logging;
use pullscope::models::PullRequestCoordinates;

use std::process;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::io::AsyncReadExt;

use cli::args::{ChangesArgs, Cli, Command, CommentArgs, ConnectionArgs};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match cli.command {
        Command::Changes(args) => run_changes(*args).await,
        Command::Comment(args) => run_comment(args).await,
        Command::Version => run_version(),
    }
}

/// Print version and build information.
fn run_version() -> Result<()> {
    use colored::Colorize;

    println!(
        "{} {}",
        constants::APP_NAME.bold(),
        constants::VERSION.green().bold()
    );
    println!("{}     {}", "target:".dimmed(), constants::TARGET);
    Ok(())
}

/// Load layered config from the working directory and environment, then apply flags.
fn load_config(connection: &ConnectionArgs) -> Result<Config> {
    let cwd = std::env::current_dir().context("failed to determine working directory")?;
    let mut config =
        Config::load(Some(&cwd), &Env::real()).context("failed to load configuration")?;
    connection.apply(&mut config);
    tracing::debug!(?config, "resolved configuration");
    Ok(config)
}

/// Register the configured provider and resolve the pull request coordinates.
fn connect(config: &Config) -> Result<(Arc<dyn HostingService>, PullRequestCoordinates)> {
    let name = config.provider_name();
    let pr = config.coordinates()?;

    let mut registry = HostingRegistry::with_options(config.service_options());
    registry.register_service(&name, config.hosting_config()?)?;
    let service = registry
        .get(&name)
        .with_context(|| format!("failed to set up hosting provider '{name}'"))?;
    Ok((service, pr))
}

/// Resolve and print the reviewable changes of a pull request.
async fn run_changes(args: ChangesArgs) -> Result<()> {
    let mut config = load_config(&args.connection)?;
    args.apply(&mut config);
    let (service, pr) = connect(&config)?;

    let changes = service
        .get_changes(&pr, &config.filter(), config.review.throttle_mode)
        .await
        .with_context(|| {
            format!(
                "failed to retrieve changes for pull request {} from {}",
                pr.pull_request_id,
                service.provider_name()
            )
        })?;

    let Some(changes) = changes else {
        println!("No changes to review.");
        return Ok(());
    };

    let template = match &args.template {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read template {}", path.display()))?,
        ),
        None => None,
    };

    let output = args
        .format
        .render(&changes, template.as_deref())
        .context("failed to render changes")?;
    println!("{output}");

    let unavailable = changes.iter().filter(|c| c.is_unavailable()).count();
    if unavailable > 0 {
        cli::notice(
            "warning",
            &format!("{unavailable} of {} file(s) could not be retrieved", changes.len()),
        );
    }
    Ok(())
}

/// Post a review comment read from a file or stdin.
async fn run_comment(args: CommentArgs) -> Result<()> {
    let config = load_config(&args.connection)?;

    let content = match &args.file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("failed to read comment from stdin")?;
            buf
        }
    };
    if content.trim().is_empty() {
        bail!("comment content is empty");
    }

    let (service, pr) = connect(&config)?;
    let header = args.resolve_header(&config);
    let id = service
        .add_comment(&pr, &content, header.as_deref())
        .await
        .context("failed to post review comment")?;

    println!("{id}");
    Ok(())
}
