//! agentroute binary
//!
//! Runs the HTTP API (default), a terminal chat session, a one-shot
//! personality analysis, or writes a config template.

use agentroute::cli::{Cli, Command, generate_config_template, run_chat};
use agentroute::handlers::{self, AppState};
use agentroute::{config::Config, metrics::Metrics, telemetry};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;

type MainResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Load config, start logging, and build shared state
fn load_state(config_path: &str) -> MainResult<AppState> {
    let config = Config::from_file(config_path)?;
    telemetry::init(&config.observability.log_level);

    let metrics = Arc::new(Metrics::new()?);
    Ok(AppState::from_config(config, metrics)?)
}

async fn serve(state: AppState) -> MainResult<()> {
    let server = &state.config().server;
    let addr = SocketAddr::from((
        server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([127, 0, 0, 1])),
        server.port,
    ));

    tracing::info!("Starting agentroute server on {}", addr);
    tracing::info!("Chat endpoint available at http://{}/chat", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, handlers::app(state)).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> MainResult<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Config { output } => match output {
            Some(path) => {
                std::fs::write(&path, generate_config_template())?;
                eprintln!("Wrote configuration template to {}", path);
            }
            None => print!("{}", generate_config_template()),
        },
        Command::Serve => serve(load_state(&cli.config)?).await?,
        Command::Chat => {
            let state = load_state(&cli.config)?;
            let mut session = state.new_session();
            tracing::info!(session_id = %session.id(), "Starting terminal chat session");

            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            run_chat(stdin, &mut stdout, &mut session, state.router()).await?;
        }
        Command::Personality { birthdate } => {
            let state = load_state(&cli.config)?;
            let today = chrono::Local::now().date_naive();
            let prediction = state.personality().generate(birthdate, today).await?;
            println!("Age: {}\n\n{}", prediction.age, prediction.prediction);
        }
    }

    Ok(())
}
