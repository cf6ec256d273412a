//! synapse-reader - token-authenticated query client for Azure Synapse.

mod cli;

use std::io::BufRead;
use std::time::SystemTime;

use anyhow::{bail, Context};
use cli::{Cli, Command, SecretAction};
use synapse_reader::auth::{
    decode_claims, ClientCredentialsConfig, ClientCredentialsProvider, SecretStorage,
    TokenProvider,
};
use synapse_reader::config::{AuthConfig, Config};
use synapse_reader::error::ReaderError;
use synapse_reader::logging;
use synapse_reader::wire::{build_connection_string, encode_token, raw_connection_string};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();

    if cli.log_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<ReaderError>() {
            Some(reader_err) => error!("{}: {}", reader_err.category(), reader_err),
            None => error!("{e:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.auth.apply_env_defaults();

    match &cli.command {
        Command::ConnString { encoded } => {
            let warehouse = config.resolve_warehouse(cli.warehouse_name())?;
            if !encoded {
                println!("{}", raw_connection_string(&warehouse));
            }
            println!("{}", build_connection_string(&warehouse));
        }
        Command::Token { claims } => show_token(&config.auth, *claims).await?,
        Command::Secret { action } => manage_secret(&config.auth, action)?,
        Command::Check => check(&config, cli.warehouse_name())?,
    }

    Ok(())
}

async fn show_token(auth: &AuthConfig, with_claims: bool) -> anyhow::Result<()> {
    let secrets = SecretStorage::new();
    let provider = ClientCredentialsProvider::new(ClientCredentialsConfig::from_auth(
        auth,
        Some(&secrets),
    )?)?;

    let token = provider.get_token().await?;
    let encoded = encode_token(token.secret())?;

    println!("Token length:   {} chars", token.secret().len());
    println!(
        "Encoded length: {} bytes ({} payload)",
        encoded.as_bytes().len(),
        encoded.payload_len()
    );
    match token.expires_at() {
        Some(at) => match at.duration_since(SystemTime::now()) {
            Ok(left) => println!("Expires in:     {}s", left.as_secs()),
            Err(_) => println!("Expires in:     expired"),
        },
        None => println!("Expires in:     unknown"),
    }

    if with_claims {
        let claims = decode_claims(token.secret())?;
        println!("{}", serde_json::to_string_pretty(&claims)?);
    }

    Ok(())
}

fn manage_secret(auth: &AuthConfig, action: &SecretAction) -> anyhow::Result<()> {
    let client_id = auth.require_client_id()?;
    let key = SecretStorage::client_secret_key(client_id);
    let secrets = SecretStorage::new();

    match action {
        SecretAction::Set => {
            let secret = match std::env::var("AZURE_CLIENT_SECRET") {
                Ok(s) if !s.is_empty() => s,
                _ => {
                    eprintln!("Enter client secret for {client_id}:");
                    let mut line = String::new();
                    std::io::stdin()
                        .lock()
                        .read_line(&mut line)
                        .context("Failed to read secret from stdin")?;
                    line.trim().to_string()
                }
            };
            if secret.is_empty() {
                bail!("No secret provided");
            }
            secrets.store(&key, &secret)?;
            println!(
                "Stored client secret {} for {client_id}",
                SecretStorage::mask_secret(&secret)
            );
        }
        SecretAction::Delete => {
            secrets.delete(&key)?;
            println!("Removed client secret for {client_id}");
        }
    }

    Ok(())
}

fn check(config: &Config, warehouse: Option<&str>) -> anyhow::Result<()> {
    let conn = config.resolve_warehouse(warehouse)?;
    let policy = config.retry.to_policy()?;

    println!("Warehouse:      {}", conn.display_string());
    println!("Driver:         {}", conn.driver);
    println!("Token attr:     {}", conn.access_token_attr);
    println!("Timeout:        {}s", conn.timeout);
    println!(
        "Retry:          {} attempts, {:?} apart, retry on zero rows: {}",
        policy.max_attempts(),
        policy.sleep(),
        policy.retry_on_zero()
    );

    match (auth_summary(&config.auth), config.auth.client_secret.is_some()) {
        (Ok(summary), true) => println!("Auth:           {summary} (secret from config/env)"),
        (Ok(summary), false) => println!("Auth:           {summary} (secret from keyring)"),
        (Err(e), _) => println!("Auth:           not configured ({e})"),
    }

    Ok(())
}

fn auth_summary(auth: &AuthConfig) -> synapse_reader::Result<String> {
    Ok(format!(
        "client {} via {}",
        auth.require_client_id()?,
        auth.authority_url()?
    ))
}
