//! Terminal host for the conversation client.
//!
//! Reads lines from stdin. Lines starting with `/` are commands, anything
//! else is submitted as a question.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use ragchat_client::ClientState;
use ragchat_client::config::{ClientConfig, LoggingConfig};
use ragchat_client::conversation::{ControllerEvent, ConversationController, Speaker, ViewAccess};

const HELP: &str = "\
Commands:
  /login <username> <password>
  /signup <username> <email> <password>
  /history
  /whoami
  /logout
  /quit
Anything else is sent as a question.";

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let json = logging.json;

    // Logs go to stderr so they don't interleave with the transcript.
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| {
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
        }))
        .init();
}

/// Print transcript updates as they arrive.
async fn render_events(controller: Arc<ConversationController>) {
    let mut rx = controller.subscribe();
    loop {
        match rx.recv().await {
            Ok(ControllerEvent::TurnAppended(turn)) if turn.speaker == Speaker::Bot => {
                println!("bot> {}", turn.text);
            }
            Ok(ControllerEvent::SubmissionFailed { turn, error }) => {
                println!("!! no answer for question #{turn}: {error}");
            }
            Ok(ControllerEvent::LoggedOut { redirect_to }) => {
                println!("Logged out. Returning to {redirect_to}");
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(name: "ui.events.lagged", skipped, "Dropped controller events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_header(controller: &ConversationController) {
    println!(
        "[{}] {}",
        controller.avatar_label(),
        controller.greeting()
    );
}

async fn handle_command(state: &ClientState, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match (command, args.as_slice()) {
        ("/quit", _) => return false,
        ("/login", [username, password]) => match state.auth.login(username, password).await {
            Ok(_) => print_header(&state.controller),
            Err(e) => println!("Login failed: {e}"),
        },
        ("/signup", [username, email, password]) => {
            match state.auth.signup(username, email, password).await {
                Ok(msg) => println!("{msg}. You can /login now."),
                Err(e) => println!("Signup failed: {e}"),
            }
        }
        ("/history", _) => {
            println!("Last {} queries:", state.config.history.capacity);
            for question in state.controller.history() {
                println!("  - {question}");
            }
        }
        ("/whoami", _) => print_header(&state.controller),
        ("/logout", _) => {
            state.controller.logout();
        }
        _ => println!("{HELP}"),
    }
    true
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let config = ClientConfig::load().context("loading configuration")?;
    init_tracing(&config.logging);

    info!(
        name: "client.config.loaded",
        base_url = %config.gateway.base_url,
        attach_credential = config.gateway.attach_credential,
        "Client configuration loaded"
    );

    let state = ClientState::from_config(config).context("initializing client")?;
    let controller = Arc::clone(&state.controller);

    if let ViewAccess::Redirect(route) = controller.view_access() {
        println!("No session found (entry route {route}). Use /login first.");
    }
    print_header(&controller);
    println!("{HELP}");

    let renderer = tokio::spawn(render_events(Arc::clone(&controller)));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.starts_with('/') {
            if !handle_command(&state, line).await {
                break;
            }
            continue;
        }

        if let ViewAccess::Redirect(route) = controller.view_access() {
            println!("Please /login first (redirect to {route}).");
            continue;
        }

        // Submissions run concurrently; answers print as they arrive.
        let c = Arc::clone(&controller);
        let question = line.to_string();
        tokio::spawn(async move { c.submit(&question).await });
    }

    controller.shutdown();
    drop(state);
    drop(controller);
    renderer.abort();
    info!(name: "client.stopped", "Client stopped");
    Ok(())
}
