// ABOUTME: Terminal driver for the consultation chat client
// Login, consultation listing and an interactive chat room on stdin/stdout

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use consult_chat::api::{ConsultationApi, ConsultationQuery, HttpConsultationApi};
use consult_chat::app::{ChatInput, InPersonFilter};
use consult_chat::chat::{ChatSession, DisplayItem, SessionDeps, SessionParams, SystemClock};
use consult_chat::config::AppConfig;
use consult_chat::credentials::{self, CredentialStore, FileCredentialStore};
use consult_chat::models::ConsultationMode;
use consult_chat::transport::WsConnector;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "consult-chat", version, about = "Architect consultation chat client")]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget stored credentials
    Logout,
    /// Show the signed-in architect's profile
    Profile,
    /// List consultations
    Consultations {
        #[arg(long, conflicts_with = "offline")]
        online: bool,
        #[arg(long)]
        offline: bool,
        /// Filter in-person sessions by client name or city
        #[arg(long, requires = "offline")]
        search: Option<String>,
    },
    /// Open a consultation chat room
    Chat {
        #[arg(long)]
        consultation: String,
        #[arg(long)]
        room: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging()?;
    setup_panic_handler();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    let credentials: Arc<dyn CredentialStore> =
        Arc::new(FileCredentialStore::new().context("Failed to open credential store")?);
    let api = Arc::new(HttpConsultationApi::new(config.api.base_url.clone(), credentials.clone()));

    match cli.command {
        Command::Login { email, password } => {
            let data = api.login(&email, &password).await.context("Login failed")?;
            credentials::store_login(credentials.as_ref(), &data)
                .await
                .context("Failed to save credentials")?;
            println!("Logged in as {}", data.username);
        }
        Command::Logout => {
            credentials::clear_login(credentials.as_ref())
                .await
                .context("Failed to clear credentials")?;
            println!("Logged out");
        }
        Command::Profile => {
            let profile = api.get_profile().await.context("Failed to load profile")?;
            println!("{} <{}>", profile.username, profile.email);
            if let Some(city) = profile.city {
                println!("City: {}", city);
            }
            if let Some(years) = profile.experience {
                println!("Experience: {} years", years);
            }
        }
        Command::Consultations {
            online,
            offline,
            search,
        } => {
            let query = ConsultationQuery {
                mode: match (online, offline) {
                    (true, _) => Some(ConsultationMode::Remote),
                    (_, true) => Some(ConsultationMode::InPerson),
                    _ => None,
                },
                ..Default::default()
            };
            let consultations = api
                .list_consultations(&query)
                .await
                .context("Failed to load consultations")?;

            let shown: Vec<_> = if offline {
                InPersonFilter::new(search.unwrap_or_default()).apply(&consultations)
            } else {
                consultations.iter().collect()
            };
            for c in shown {
                println!(
                    "{}  {:<22} {:<10} {:<20} {}  room={}",
                    c.id,
                    c.status.label(),
                    c.mode.label(),
                    c.counterpart_name,
                    c.start,
                    c.room_id.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Chat { consultation, room } => {
            let deps = SessionDeps {
                api,
                credentials,
                connector: Arc::new(WsConnector::new()),
                clock: Arc::new(SystemClock),
                config,
            };
            run_chat(deps, SessionParams::new(consultation, room)).await?;
        }
    }

    Ok(())
}

async fn run_chat(deps: SessionDeps, params: SessionParams) -> Result<()> {
    let mut session = ChatSession::open(deps, params)
        .await
        .context("Could not open chat")?;
    render(&mut session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_secs(30));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match ChatInput::parse(&line) {
                    ChatInput::Quit => break,
                    ChatInput::Empty => continue,
                    ChatInput::Refresh => {
                        session.refresh().await;
                    }
                    ChatInput::Text(text) => {
                        if let Err(e) = session.send(Some(&text), &[]).await {
                            println!("! {}", e);
                        }
                    }
                    ChatInput::Images(paths) => {
                        if let Err(e) = session.send(None, &paths).await {
                            println!("! {}", e);
                        }
                    }
                    ChatInput::Unknown(command) => {
                        println!("! Unknown command: {}", command);
                        continue;
                    }
                }
                render(&mut session);
            }

            update = session.next_update() => {
                if update.is_none() {
                    break;
                }
                render(&mut session);
            }

            _ = ticker.tick() => {
                let before = session.state();
                if session.reevaluate() != before {
                    render(&mut session);
                }
            }
        }
    }

    session.close();
    info!("Chat closed");
    Ok(())
}

fn render(session: &mut ChatSession) {
    println!();
    println!(
        "=== {} | {} | {:?} ===",
        session.consultation().counterpart_name,
        session.state(),
        session.connection_state()
    );

    // Newest first for an inverted list; a terminal reads top-down.
    for item in session.display_items().iter().rev() {
        match item {
            DisplayItem::DateSeparator { label, .. } => println!("--- {} ---", label),
            DisplayItem::Message {
                message,
                time_label,
                first_from_sender,
            } => {
                let name = if *first_from_sender { message.sender_name.as_str() } else { "" };
                let marker = if message.is_pending() { " (sending)" } else { "" };
                let body = if message.is_image() {
                    format!("[image] {}", message.content)
                } else {
                    message.content.clone()
                };
                println!("{:>5} {:<12} {}{}", time_label, name, body, marker);
            }
        }
    }

    for notice in session.take_notifications() {
        println!("! {}", notice);
    }
}

fn setup_logging() -> Result<()> {
    use std::fs::OpenOptions;
    use tracing_subscriber::prelude::*;

    let log_dir = dirs::home_dir()
        .map(|home| home.join(".consult-chat").join("logs"))
        .unwrap_or_else(|| PathBuf::from(".consult-chat/logs"));
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let log_file = log_dir.join(format!(
        "consult-chat-{}.log",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("Failed to create log file {}", log_file.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(file)
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "consult_chat=info".into()),
        )
        .init();
    Ok(())
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Application panicked: {}", panic_info);
        eprintln!("Application panicked: {}", panic_info);
        eprintln!("Please check the logs for more details.");
    }));
}
