//! llm-adapter binary entry point

use std::path::Path;

use agent_llm_adapter::{
    cli::{options_from_flags, Cli, Commands},
    config::Config,
    normalize::normalize,
    services::adapters::{Capabilities, ChatAdapter},
};
use color_eyre::Result;

/// Load the config for commands that need a backend
fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    // --verbose already set up logging
    if config.settings.verbose && !verbose {
        init_logging();
    }
    Ok(config)
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter("agent_llm_adapter=debug,llm_adapter=debug")
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install error handler
    color_eyre::install()?;

    // API keys may live in a local .env file
    dotenv::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Set up logging
    if cli.verbose {
        init_logging();
    }

    match cli.command {
        Commands::Invoke {
            input,
            backend,
            temperature,
            max_tokens,
        } => {
            let config = load_config(cli.config.as_deref(), cli.verbose)?;
            let profile = config.select_backend(backend.as_deref())?;
            let adapter = ChatAdapter::from_profile(profile, &config.settings)?;
            let options = options_from_flags(temperature, max_tokens)
                .or_else(|| config.settings.default_options.clone());
            let response = adapter.invoke(input.read()?, options.as_ref()).await?;
            println!("{response}");
        }
        Commands::Normalize { input } => {
            let conversation = normalize(input.read()?);
            println!("{}", serde_json::to_string_pretty(&conversation)?);
        }
        Commands::Probe { name, backend } => {
            let config = load_config(cli.config.as_deref(), cli.verbose)?;
            let profile = config.select_backend(backend.as_deref())?;
            let adapter = ChatAdapter::from_profile(profile, &config.settings)?;
            match adapter.capability(&name)? {
                serde_json::Value::String(value) => println!("{value}"),
                value => println!("{value}"),
            }
        }
        Commands::Version => {
            println!("llm-adapter version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
