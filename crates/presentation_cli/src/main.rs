//! Lodestar CLI
//!
//! Runs the retrieval and answer pipelines in-process against a local Ollama
//! server and, when an API key is configured, Brave Search.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;
mod render;
mod services;

use std::io::Write;

use ai_core::{InferenceEngine, OllamaInferenceEngine};
use anyhow::{Context, bail};
use application::GenerationRequest;
use clap::Parser;
use domain::{ConversationId, StreamEvent};
use infrastructure::{AppConfig, init_tracing};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    cli::{Cli, Commands, log_filter_from_verbosity},
    services::Services,
};

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AppConfig::load().context("failed to load configuration")?,
    };
    if let Some(filter) = log_filter_from_verbosity(cli.verbose) {
        config.logging.filter = filter.to_string();
    }
    Ok(config)
}

/// Cancel `token` on Ctrl-C
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, cancelling request");
            token.cancel();
        }
    });
}

/// Print events as they arrive; returns whether the answer completed
async fn print_answer(mut events: mpsc::Receiver<StreamEvent>) -> anyhow::Result<bool> {
    let mut stdout = std::io::stdout();
    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::Delta { content } => {
                stdout.write_all(content.as_bytes())?;
                stdout.flush()?;
            },
            StreamEvent::Done => {
                writeln!(stdout)?;
                return Ok(true);
            },
            StreamEvent::Error { message } => {
                writeln!(stdout)?;
                eprintln!("error: {message}");
                return Ok(false);
            },
        }
    }
    Ok(false)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.logging)?;

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    match cli.command {
        Commands::Search { query } => {
            let services = Services::build(&config)?;
            let Some(search) = services.search else {
                bail!(
                    "web search is disabled; set search.brave.brave_api_key or \
                     LODESTAR_SEARCH__BRAVE__BRAVE_API_KEY"
                );
            };
            let texts = search.search(&query, &cancel).await?;
            if texts.is_empty() {
                println!("No readable pages found for \"{query}\"");
            } else {
                print!("{}", render::snippets(&texts));
            }
        },

        Commands::Ask {
            prompt,
            with_search,
        } => {
            let services = Services::build(&config)?;
            if with_search && services.search.is_none() {
                warn!("--with-search given but web search is disabled");
            }
            let conversation = ConversationId::new();
            let events = if with_search {
                services
                    .answers
                    .answer_with_search(conversation, &prompt, cancel.clone())
                    .await?
            } else {
                services
                    .answers
                    .stream_answer(conversation, GenerationRequest::simple(prompt), cancel.clone())
                    .await?
            };
            let completed = print_answer(events).await?;
            services.answers.wait_for_persistence().await;
            debug!(completed, stored = services.store.len(), "Answer finished");
            if !completed {
                std::process::exit(1);
            }
        },

        Commands::Health => {
            let engine = OllamaInferenceEngine::new(config.inference.clone())?;
            match engine.health_check().await {
                Ok(true) => println!("Ollama reachable at {}", config.inference.base_url),
                Ok(false) => {
                    println!("Ollama at {} responded unhealthy", config.inference.base_url);
                    std::process::exit(1);
                },
                Err(e) => {
                    println!("Ollama unreachable: {e}");
                    std::process::exit(1);
                },
            }
        },
    }

    Ok(())
}
