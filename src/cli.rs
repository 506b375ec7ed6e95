//! Command-line interface for agentroute
//!
//! Provides argument parsing, the config template, and the terminal chat loop.

use crate::router::IntentRouter;
use crate::session::{ChatSession, Role};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Intent-classifying chat router and personality generator
#[derive(Parser)]
#[command(name = "agentroute")]
#[command(version)]
#[command(about = "Intent-classifying chat router and personality generator")]
#[command(
    long_about = "agentroute asks an OpenAI-compatible model which agent should answer a chat \
    message, overrides the choice when a catalog product is named, and replies with that \
    agent's canned response. It can also generate a personality analysis from a birthdate."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP API server (default)
    Serve,
    /// Chat with the agent router in this terminal
    Chat,
    /// Generate a personality analysis for a birthdate
    Personality {
        /// Birthdate as YYYY-MM-DD
        #[arg(short, long)]
        birthdate: NaiveDate,
    },
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# agentroute Configuration
# =========================

# ─────────────────────────────────────────────────────────────────────────────
# SERVER
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "127.0.0.1"
port = 3000
# Live chat sessions kept in memory; the least recently used is evicted
# when a new session would exceed this
max_sessions = 1000

# ─────────────────────────────────────────────────────────────────────────────
# COMPLETION API
# ─────────────────────────────────────────────────────────────────────────────
#
# Any OpenAI-compatible Chat Completions endpoint. The API key is read from
# the environment variable named by api_key_env, never from this file.

[llm]
base_url = "https://api.openai.com/v1"
model = "gpt-3.5-turbo"
api_key_env = "OPENAI_API_KEY"
# Client-side timeout per call, 1-300 seconds
timeout_seconds = 30

# ─────────────────────────────────────────────────────────────────────────────
# ROUTING
# ─────────────────────────────────────────────────────────────────────────────

[routing]
# When a product name forces the sales agent, show that product's details
# instead of the generic sales reply
substitute_product_detail = false

# ─────────────────────────────────────────────────────────────────────────────
# PERSONALITY
# ─────────────────────────────────────────────────────────────────────────────

[personality]
# Model override for personality analysis (defaults to llm.model)
# model = "gpt-4o-mini"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"

# ─────────────────────────────────────────────────────────────────────────────
# AGENTS AND PRODUCTS (Optional)
# ─────────────────────────────────────────────────────────────────────────────
#
# Without [[agents]] the built-in registry (default, sales, support, faq,
# escalation) is used. An override must define "default" and "sales".
#
# [[agents]]
# key = "default"
# description = "Routes queries to the appropriate agent."
# content = "Hello! I will help direct your query to the right expert."
#
# Without [[products]] the built-in catalog is used.
#
# [[products]]
# name = "Epson T3 SCARA Robot"
# price = "$8,000"
# features = ["Compact design", "Easy integration", "High-speed assembly"]
# link = "https://catalog.fa.com.my/Industrial-Robots"
#
# [products.competitor]
# name = "ABB IRB 910SC"
# price = "$9,500"
# comparison = "Epson T3 is more cost-effective and provides similar performance for standard tasks."
"#
}

/// Run an interactive chat session over a line-based reader and writer
///
/// Each non-empty line is one user message. `/transcript` prints the
/// conversation so far; `/quit` or end of input ends the session.
pub async fn run_chat<R, W>(
    reader: R,
    writer: &mut W,
    session: &mut ChatSession,
    router: &IntentRouter,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    writer
        .write_all(b"Ask me anything! (/transcript to review, /quit to leave)\n")
        .await?;
    writer.flush().await?;

    while let Some(line) = lines.next_line().await? {
        // Commands are matched trimmed; messages are routed and recorded as
        // typed, same as POST /chat
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/transcript" => {
                for message in session.transcript() {
                    let who = match message.role {
                        Role::User => "you",
                        Role::Assistant => "assistant",
                    };
                    writer
                        .write_all(format!("{}: {}\n", who, message.content).as_bytes())
                        .await?;
                }
            }
            _ => {
                let turn = session.handle(&line, router).await;
                if let Some(notice) = &turn.notice {
                    writer
                        .write_all(format!("[error] {}\n", notice).as_bytes())
                        .await?;
                }
                writer
                    .write_all(format!("[{}] {}\n", turn.agent, turn.reply).as_bytes())
                    .await?;
            }
        }
        writer.flush().await?;
    }

    Ok(())
}
