//! Config command - configuration management.

use anyhow::Result;
use clap::{Args, Subcommand};

use tubelens_config::{self, PROJECT_CONFIG_FILE, Service, resolve_api_key};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the merged configuration and API key status
    Show,

    /// Show configuration file paths
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    println!("# tubelens configuration\n");

    if ctx.sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &ctx.sources {
            println!("  {}", source.display());
        }
        println!();
    }

    println!("API keys:");
    let keys = [
        (Service::Gemini, config.llm.as_ref().and_then(|c| c.api_key.as_deref())),
        (
            Service::Youtube,
            config.youtube.as_ref().and_then(|c| c.api_key.as_deref()),
        ),
        (
            Service::Supadata,
            config.transcript.as_ref().and_then(|c| c.api_key.as_deref()),
        ),
    ];
    for (service, value) in keys {
        let status = match resolve_api_key(service, value) {
            Some(secret) => format!("set ({})", secret.source),
            None => format!("missing (set {})", service.env_var()),
        };
        println!("  {:<10} {}", service.display_name(), status);
    }
    println!();

    let mut shown = config.clone();
    for key in [
        shown.llm.as_mut().map(|c| &mut c.api_key),
        shown.youtube.as_mut().map(|c| &mut c.api_key),
        shown.transcript.as_mut().map(|c| &mut c.api_key),
    ]
    .into_iter()
    .flatten()
    {
        if key.is_some() {
            *key = Some("[REDACTED]".to_string());
        }
    }

    let toml = shown.to_toml()?;
    if toml.trim().is_empty() {
        println!("(all defaults)");
    } else {
        println!("{}", toml);
    }
    Ok(())
}

fn cmd_path() -> Result<()> {
    match tubelens_config::user_config_path() {
        Some(path) => {
            let marker = if path.exists() { "" } else { " (not found)" };
            println!("user:    {}{}", path.display(), marker);
        }
        None => println!("user:    (no config directory)"),
    }

    let project = std::env::current_dir()?.join(PROJECT_CONFIG_FILE);
    let marker = if project.exists() { "" } else { " (not found)" };
    println!("project: {}{}", project.display(), marker);
    Ok(())
}
