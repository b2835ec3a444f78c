//! secours-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, starts the dispatch engine and its notification fan-out
//! worker, and serves the JSON API under `/api`.
//!
//! # First run
//!
//! ```text
//! secours-server --hash-password            # paste into auth_password_hash
//! secours-server --bootstrap-admin "Régulation"   # prints the admin's id
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::Router;
use clap::Parser;
use rand_core::OsRng;
use secours_api::{AppState, AuthConfig};
use secours_core::{
  Engine, EngineConfig,
  store::EntityStore,
  user::{NewUser, Role},
};
use secours_server::{Gateway, ServerConfig, config::expand_tilde};
use secours_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Secours alert dispatch server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Create an administrator account with this display name, print its id
  /// and exit.
  #[arg(long, value_name = "NAME")]
  bootstrap_admin: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let server_cfg =
    ServerConfig::load(&cli.config).context("failed to load server configuration")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(name) = cli.bootstrap_admin {
    let input = NewUser { display_name: name, role: Role::Admin };
    input.validate()?;
    let admin = store
      .add_user(input)
      .await
      .context("failed to create administrator")?;
    tracing::info!(user_id = %admin.user_id, "administrator created");
    println!("{}", admin.user_id);
    return Ok(());
  }

  let gateway =
    Gateway::from_config(&server_cfg.push).context("failed to build push gateway")?;
  if matches!(gateway, Gateway::Disabled(_)) {
    tracing::warn!("push delivery disabled; notifications are recorded only");
  }

  let (engine, worker) = Engine::start(
    Arc::new(store),
    Arc::new(gateway),
    EngineConfig { push_timeout: server_cfg.push.timeout(), ..EngineConfig::default() },
  );

  let state = AppState {
    engine: Arc::new(engine),
    auth:   Arc::new(AuthConfig {
      username:      server_cfg.auth_username.clone(),
      password_hash: server_cfg.auth_password_hash.clone(),
    }),
  };

  let app = Router::new()
    .nest("/api", secours_api::api_router(state))
    .layer(TraceLayer::new_for_http());

  let address = server_cfg.address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
      }
    })
    .await
    .context("server error")?;

  // The router owned the last engine handle; the worker now drains and exits.
  tracing::info!("shutting down; draining notification fan-out");
  worker.join().await;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}
