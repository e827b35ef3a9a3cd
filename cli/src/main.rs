use std::rc::Rc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use mix_client::config::ClientConfig;
use mix_client::net::error::{CommandError, IdentityError};
use mix_client::net::service::MessagingService;
use mix_client::net::types::{ConnectionState, DomainEvent, Event};
use mix_client::state::identity::IdentityStore;
use mix_client::util::route;
use mix_client::util::storage::MemoryStore;
use tokio::sync::mpsc;


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("command rejected: {0}")]
    Command(#[from] CommandError),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health check failed: HTTP {0}")]
    Unhealthy(u16),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "mix-cli", about = "Join a recipe mix from the terminal")]
struct Cli {
    #[arg(long, env = "MIX_BASE_URL", default_value = "http://127.0.0.1:8080")]
    base_url: String,

    /// Display name announced to the session.
    #[arg(long, env = "MIX_USER_NAME", default_value = "mix-cli")]
    name: String,

    /// Seconds to wait for the socket to open.
    #[arg(long, default_value_t = 10)]
    connect_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the backend health endpoint.
    Ping,
    /// Print session events as JSON lines.
    Listen(ListenArgs),
    /// Send one chat message.
    Chat(ChatArgs),
    /// Submit a recipe URL and wait for the result.
    Submit(SubmitArgs),
}

#[derive(Args, Debug)]
struct ListenArgs {
    session: String,
    /// Stop after this many seconds; runs until the connection fails if omitted.
    #[arg(long)]
    duration: Option<u64>,
}

#[derive(Args, Debug)]
struct ChatArgs {
    session: String,
    text: String,
    /// Seconds to keep printing events after sending.
    #[arg(long, default_value_t = 1)]
    linger: u64,
}

#[derive(Args, Debug)]
struct SubmitArgs {
    session: String,
    url: String,
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

/// A connected session plus the channels its listeners feed.
struct Session {
    service: MessagingService,
    events: mpsc::UnboundedReceiver<DomainEvent>,
    states: mpsc::UnboundedReceiver<ConnectionState>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let local = tokio::task::LocalSet::new();
    local.run_until(run(cli)).await
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Ping => run_ping(&cli.base_url).await,
        Command::Listen(ref args) => {
            let mut session = open_session(&cli, &args.session).await?;
            let deadline = args.duration.map(Duration::from_secs);
            pump_until(&mut session, deadline, |_| false).await?;
            session.service.disconnect();
            Ok(())
        }
        Command::Chat(ref args) => {
            let mut session = open_session(&cli, &args.session).await?;
            let sent = session.service.send_chat_text(&args.text)?;
            tracing::info!(id = %sent.id, "chat message sent");
            pump_until(&mut session, Some(Duration::from_secs(args.linger)), |_| false).await?;
            session.service.disconnect();
            Ok(())
        }
        Command::Submit(ref args) => {
            let mut session = open_session(&cli, &args.session).await?;
            let submission = session.service.submit_recipe_url(&args.url)?;
            tracing::info!(id = %submission.request.id, url = %submission.request.url, "recipe submitted");
            let finished = pump_until(&mut session, Some(Duration::from_secs(args.timeout)), |event| {
                matches!(event.event, Event::RecipeResult(_))
            })
            .await?;
            session.service.disconnect();
            if finished { Ok(()) } else { Err(CliError::Timeout("recipe result")) }
        }
    }
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let client = reqwest::Client::new();
    let url = format!("{}/health", http_origin(base_url));
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Unhealthy(status.as_u16()));
    }
    let body: serde_json::Value = response.json().await?;
    print_json(&body)
}

/// Connect, identify, and wait until the socket is open.
async fn open_session(cli: &Cli, session_id: &str) -> Result<Session, CliError> {
    let config = ClientConfig { base_url: cli.base_url.clone(), ..ClientConfig::from_env() };
    let identity = IdentityStore::new(Rc::new(MemoryStore::new())).create_identity(&cli.name)?;
    let service = MessagingService::native(config);

    let (event_tx, events) = mpsc::unbounded_channel();
    let (state_tx, mut states) = mpsc::unbounded_channel();
    // Listeners live as long as the service.
    let _events = service.on_message(move |event| {
        let _ = event_tx.send(event.clone());
        Ok(())
    });
    let _states = service.on_state_change(move |state| {
        let _ = state_tx.send(state);
        Ok(())
    });

    service.set_identity(identity)?;
    service.connect(session_id);

    let opened = tokio::time::timeout(Duration::from_secs(cli.connect_timeout), async {
        while let Some(state) = states.recv().await {
            match state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Error => return Err(connection_error(&service)),
                ConnectionState::Connecting | ConnectionState::Disconnected => {}
            }
        }
        Err(CliError::Connection("state channel closed".to_owned()))
    })
    .await;

    match opened {
        Ok(Ok(())) => {
            tracing::info!(session = session_id, path = %route::mix_path(session_id), "connected");
            Ok(Session { service, events, states })
        }
        Ok(Err(e)) => Err(e),
        Err(_) => {
            service.disconnect();
            Err(CliError::Timeout("connection"))
        }
    }
}

/// Print events until `done` matches one, the deadline passes, or the
/// connection settles in `error`. Returns whether `done` matched.
async fn pump_until<F>(session: &mut Session, deadline: Option<Duration>, done: F) -> Result<bool, CliError>
where
    F: Fn(&DomainEvent) -> bool,
{
    let sleep = tokio::time::sleep(deadline.unwrap_or(Duration::MAX));
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            () = &mut sleep, if deadline.is_some() => return Ok(false),
            Some(event) = session.events.recv() => {
                print_json(&serde_json::to_value(&event)?)?;
                if done(&event) {
                    return Ok(true);
                }
            }
            Some(state) = session.states.recv() => {
                tracing::info!(%state, "connection state changed");
                if state == ConnectionState::Error {
                    return Err(connection_error(&session.service));
                }
            }
            else => return Ok(false),
        }
    }
}

fn connection_error(service: &MessagingService) -> CliError {
    CliError::Connection(
        service
            .last_error()
            .map_or_else(|| "unknown error".to_owned(), |e| e.to_string()),
    )
}

fn http_origin(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("ws://") {
        return format!("http://{rest}");
    }
    if let Some(rest) = base.strip_prefix("wss://") {
        return format!("https://{rest}");
    }
    base.to_owned()
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string(value)?;
    println!("{rendered}");
    Ok(())
}
