pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod identity;
pub mod search;
pub mod security;
pub mod services;
pub mod store;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub use config::Config;
use db::Store;
use identity::IdentityContext;
use security::Argon2Security;
use services::SeaOrmAccountService;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    init_tracing(&config);

    let cli = Cli::parse();

    match cli.command {
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            Ok(())
        }

        Some(Commands::Init) => {
            if Config::create_default_if_missing()? {
                println!("✓ Config file created. Edit config.toml and run again.");
            } else {
                println!("config.toml already exists.");
            }
            Ok(())
        }

        Some(Commands::Register {
            username,
            email,
            first_name,
            last_name,
            password,
        }) => {
            cli::cmd_register(&config, &username, &email, first_name, last_name, password).await
        }

        Some(Commands::Login { username, password }) => {
            cli::cmd_login(&config, &username, password).await
        }

        Some(Commands::Users(args)) => cli::cmd_users(&config, &args).await,

        Some(Commands::Toggle { id, status }) => cli::cmd_toggle_status(&config, id, status).await,

        Some(Commands::ActivationKey { username }) => {
            cli::cmd_activation_key(&config, &username).await
        }

        Some(Commands::VerifyEmail { username, key }) => {
            cli::cmd_verify_email(&config, &username, &key).await
        }

        Some(Commands::Passwd {
            username,
            current,
            new,
        }) => cli::cmd_passwd(&config, &username, current, new).await,
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.general.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Opens the store, runs migrations and wires the identity services.
pub async fn identity_context(config: &Config) -> anyhow::Result<IdentityContext> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await
    .context("Failed to open user database")?;

    let security =
        Argon2Security::from_config(&config.security).context("Invalid security config")?;

    info!("Identity services ready");

    Ok(IdentityContext::new(
        Arc::new(store),
        Arc::new(security),
        config.identity.clone(),
    ))
}

pub async fn account_service(config: &Config) -> anyhow::Result<SeaOrmAccountService> {
    let ctx = identity_context(config).await?;
    Ok(SeaOrmAccountService::new(ctx, config.search.clone()))
}
