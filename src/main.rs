use std::fs;
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use stocktake::auth::TokenGenerator;
use stocktake::config::ServerConfig;
use stocktake::server::{AppState, create_router, staging::ImportStaging};
use stocktake::store::{SqliteStore, Store};
use stocktake::types::{Role, Token, UserAccount, UserProfile};

fn create_token(generator: &TokenGenerator, user_id: String) -> anyhow::Result<(Token, String)> {
    let (raw_token, lookup, hash) = generator.generate()?;
    let token = Token {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        user_id,
        created_at: Utc::now(),
        expires_at: None,
        last_used_at: None,
    };
    Ok((token, raw_token))
}

#[cfg(unix)]
fn set_restrictive_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "stocktake")]
#[command(about = "An IT asset register server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database, seed reference data, create admin account)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,

        /// Admin username (used with --non-interactive)
        #[arg(long, default_value = "admin")]
        username: String,

        /// Admin password (required with --non-interactive)
        #[arg(long)]
        password: Option<String>,
    },
}

fn run_init(
    data_dir: String,
    non_interactive: bool,
    username: String,
    password: Option<String>,
) -> anyhow::Result<()> {
    let data_path: std::path::PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let db_path = data_path.join("stocktake.db");
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;
    store.seed_reference_data()?;

    if store.has_admin_user()? {
        bail!("Server already initialized: an admin account exists in {}", db_path.display());
    }

    let (username, password) = if non_interactive {
        let Some(password) = password else {
            bail!("--password is required with --non-interactive");
        };
        (username, password)
    } else {
        let username = inquire::Text::new("Admin username:")
            .with_default(&username)
            .with_validator(|input: &str| {
                if input.trim().is_empty() {
                    Err("Username cannot be empty".into())
                } else if input.contains(char::is_whitespace) {
                    Err("Username cannot contain whitespace".into())
                } else {
                    Ok(inquire::validator::Validation::Valid)
                }
            })
            .prompt()?;
        let password = inquire::Password::new("Admin password:")
            .with_validator(|input: &str| {
                if input.len() < 8 {
                    Err("Password must be at least 8 characters".into())
                } else {
                    Ok(inquire::validator::Validation::Valid)
                }
            })
            .prompt()?;
        (username, password)
    };

    if password.len() < 8 {
        bail!("Password must be at least 8 characters");
    }

    let generator = TokenGenerator::new();
    let now = Utc::now();
    let user = UserAccount {
        id: Uuid::new_v4().to_string(),
        username: username.clone(),
        email: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        password_hash: generator.hash(&password)?,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let profile = UserProfile {
        user_id: user.id.clone(),
        role: Role::Admin,
        phone: None,
        department_id: None,
        created_at: now,
        updated_at: now,
    };
    store.create_user_with_profile(&user, &profile)?;

    let (token, raw_token) = create_token(&generator, user.id)?;
    store.create_token(&token)?;

    let token_file = data_path.join(".admin_token");
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Created admin user '{username}' with API token:");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("stocktake=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
                username,
                password,
            } => {
                run_init(data_dir, non_interactive, username, password)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
            };

            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;
            if !store.has_admin_user()? {
                bail!(
                    "Server not initialized. Run 'stocktake admin init' first to create the database and admin account."
                );
            }

            let state = Arc::new(AppState {
                store: Arc::new(store),
                staging: ImportStaging::new(),
            });

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
