//! `secours` — operator command line for the Secours dispatch API.
//!
//! # Usage
//!
//! ```text
//! secours --url http://localhost:8080 --user gateway --password secret \
//!   --actor <admin-uuid> candidates <alert-uuid>
//! secours --config ~/.config/secours/config.toml dispatch <alert> <member>
//! secours transition <intervention> SUR_PLACE
//! ```

mod client;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use secours_core::{
  alert::{AlertCategory, Location},
  intervention::InterventionStatus,
  notification::MassTarget,
  user::Role,
};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "secours", about = "Command line for the Secours dispatch API")]
struct Args {
  /// Path to a TOML config file (url, username, password, actor).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the secours server (default: http://localhost:8080).
  #[arg(long, env = "SECOURS_URL")]
  url: Option<String>,

  /// Service username.
  #[arg(long, env = "SECOURS_USER")]
  user: Option<String>,

  /// Service password (plaintext).
  #[arg(long, env = "SECOURS_PASSWORD")]
  password: Option<String>,

  /// Id of the user to act as.
  #[arg(long, env = "SECOURS_ACTOR")]
  actor: Option<Uuid>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Assign a rescuer to an alert.
  Dispatch { alert: Uuid, member: Uuid },

  /// Move an intervention to a new status (SUR_PLACE, TERMINEE, ANNULEE).
  Transition {
    intervention: Uuid,
    status:       InterventionStatus,
    #[arg(long)]
    notes:        Option<String>,
  },

  /// Show one intervention.
  Intervention { id: Uuid },

  /// List the rescuers who could take an alert.
  Candidates { alert: Uuid },

  #[command(subcommand)]
  Alert(AlertCommand),

  #[command(subcommand)]
  Notify(NotifyCommand),

  /// List the acting user's unread notifications.
  Inbox,

  /// Mark a notification read.
  Read { id: Uuid },

  #[command(subcommand)]
  User(UserCommand),

  #[command(subcommand)]
  Service(ServiceCommand),

  #[command(subcommand)]
  Member(MemberCommand),
}

/// Alert intake and administration.
#[derive(Subcommand, Debug)]
enum AlertCommand {
  /// Report an alert as the acting user.
  Submit {
    #[arg(long, allow_hyphen_values = true)]
    lat:         f64,
    #[arg(long, allow_hyphen_values = true)]
    lng:         f64,
    #[arg(long)]
    category:    AlertCategory,
    #[arg(long)]
    description: String,
    #[arg(long)]
    address:     Option<String>,
  },
  Show { id: Uuid },
  Cancel { id: Uuid },
  /// Every intervention dispatched for the alert, oldest first.
  History { id: Uuid },
}

/// Direct administrative notifications.
#[derive(Subcommand, Debug)]
enum NotifyCommand {
  User {
    recipient: Uuid,
    message:   String,
    #[arg(long)]
    title:     Option<String>,
  },
  Broadcast {
    target:  MassTarget,
    message: String,
    #[arg(long)]
    title:   Option<String>,
  },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
  Create {
    name: String,
    role: Role,
  },
  Activate { id: Uuid },
  Deactivate { id: Uuid },
  /// Register a push identifier for a user's device.
  PushId { id: Uuid, external_id: String },
}

#[derive(Subcommand, Debug)]
enum ServiceCommand {
  Create { name: String },
  Activate { id: Uuid },
  Deactivate { id: Uuid },
}

#[derive(Subcommand, Debug)]
enum MemberCommand {
  Create {
    #[arg(long)]
    user:     Uuid,
    #[arg(long)]
    service:  Uuid,
    #[arg(long)]
    position: String,
    #[arg(long)]
    badge:    String,
  },
  OnDuty { id: Uuid },
  OffDuty { id: Uuid },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
  #[serde(default)]
  actor:    Option<Uuid>,
}

/// CLI flags override the config file, which overrides defaults.
fn resolve(args: &Args, file_cfg: ConfigFile) -> Result<ApiConfig> {
  let pick = |flag: &Option<String>, file: String| {
    flag
      .clone()
      .or_else(|| (!file.is_empty()).then_some(file))
  };
  Ok(ApiConfig {
    base_url: pick(&args.url, file_cfg.url)
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
    username: pick(&args.user, file_cfg.username).unwrap_or_default(),
    password: pick(&args.password, file_cfg.password).unwrap_or_default(),
    actor:    args
      .actor
      .or(file_cfg.actor)
      .ok_or_else(|| anyhow!("no acting user: pass --actor or set SECOURS_ACTOR"))?,
  })
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let config = resolve(&args, file_cfg)?;
  tracing::debug!(url = %config.base_url, actor = %config.actor, "using server");
  let client = ApiClient::new(config)?;

  run(&client, args.command).await
}

async fn run(client: &ApiClient, command: Command) -> Result<()> {
  match command {
    Command::Dispatch { alert, member } => print(&client.dispatch(alert, member).await?),
    Command::Transition { intervention, status, notes } => {
      print(&client.transition(intervention, status, notes).await?)
    }
    Command::Intervention { id } => print(&client.intervention(id).await?),
    Command::Candidates { alert } => {
      let candidates = client.candidates(alert).await?;
      if candidates.is_empty() {
        println!("no eligible rescuers");
      }
      for m in candidates {
        println!("{}  {:<12} {}", m.rescue_member_id, m.badge_number, m.position);
      }
      Ok(())
    }
    Command::Alert(cmd) => match cmd {
      AlertCommand::Submit { lat, lng, category, description, address } => {
        let location = Location::new(lat, lng)?;
        print(&client.submit_alert(location, category, description, address).await?)
      }
      AlertCommand::Show { id } => print(&client.alert(id).await?),
      AlertCommand::Cancel { id } => print(&client.cancel_alert(id).await?),
      AlertCommand::History { id } => print(&client.alert_history(id).await?),
    },
    Command::Notify(cmd) => match cmd {
      NotifyCommand::User { recipient, message, title } => {
        print(&client.notify_user(recipient, message, title).await?)
      }
      NotifyCommand::Broadcast { target, message, title } => {
        print(&client.broadcast(target, message, title).await?)
      }
    },
    Command::Inbox => print(&client.unread().await?),
    Command::Read { id } => print(&client.mark_read(id).await?),
    Command::User(cmd) => match cmd {
      UserCommand::Create { name, role } => print(&client.create_user(name, role).await?),
      UserCommand::Activate { id } => print(&client.set_user_active(id, true).await?),
      UserCommand::Deactivate { id } => print(&client.set_user_active(id, false).await?),
      UserCommand::PushId { id, external_id } => {
        client.register_push_id(id, external_id).await?;
        println!("registered");
        Ok(())
      }
    },
    Command::Service(cmd) => match cmd {
      ServiceCommand::Create { name } => print(&client.create_service(name).await?),
      ServiceCommand::Activate { id } => print(&client.set_service_active(id, true).await?),
      ServiceCommand::Deactivate { id } => {
        print(&client.set_service_active(id, false).await?)
      }
    },
    Command::Member(cmd) => match cmd {
      MemberCommand::Create { user, service, position, badge } => {
        print(&client.create_member(user, service, position, badge).await?)
      }
      MemberCommand::OnDuty { id } => print(&client.set_duty(id, true).await?),
      MemberCommand::OffDuty { id } => print(&client.set_duty(id, false).await?),
    },
  }
}

fn print<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value).context("rendering reply")?);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(argv: &[&str]) -> Args {
    Args::try_parse_from(std::iter::once("secours").chain(argv.iter().copied())).unwrap()
  }

  #[test]
  fn flags_override_the_config_file() {
    let actor = Uuid::new_v4();
    let parsed = args(&["--url", "http://flag:1", "--actor", &actor.to_string(), "inbox"]);
    let file = ConfigFile {
      url:      "http://file:2".into(),
      username: "gateway".into(),
      password: "secret".into(),
      actor:    Some(Uuid::new_v4()),
    };
    let config = resolve(&parsed, file).unwrap();
    assert_eq!(config.base_url, "http://flag:1");
    assert_eq!(config.username, "gateway");
    assert_eq!(config.actor, actor);
  }

  #[test]
  fn an_actor_is_required() {
    let parsed = Args {
      config:   None,
      url:      None,
      user:     None,
      password: None,
      actor:    None,
      command:  Command::Inbox,
    };
    assert!(resolve(&parsed, ConfigFile::default()).is_err());
  }

  #[test]
  fn statuses_parse_in_wire_form() {
    let id = Uuid::new_v4().to_string();
    match args(&["transition", &id, "SUR_PLACE", "--notes", "on site"]).command {
      Command::Transition { status, notes, .. } => {
        assert_eq!(status, InterventionStatus::SurPlace);
        assert_eq!(notes.as_deref(), Some("on site"));
      }
      other => panic!("unexpected command {other:?}"),
    }
  }

  #[test]
  fn negative_coordinates_are_accepted() {
    match args(&[
      "alert", "submit", "--lat", "14.69", "--lng", "-17.44", "--category", "FIRE",
      "--description", "smoke",
    ])
    .command
    {
      Command::Alert(AlertCommand::Submit { lng, category, .. }) => {
        assert_eq!(lng, -17.44);
        assert_eq!(category, AlertCategory::Fire);
      }
      other => panic!("unexpected command {other:?}"),
    }
  }
}
