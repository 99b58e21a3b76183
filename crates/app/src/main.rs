mod render;
mod utils;

use std::io::Write;
use std::sync::Arc;

use agent_host::{ConversationLog, ResearchHost};
use anyhow::Result;
use shared::events::TurnEvent;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let (settings, found) = utils::load_settings_or_default();
    if !found {
        // First run: leave an editable copy of the defaults behind.
        match utils::save_settings(&settings) {
            Ok(()) => tracing::info!(path = ?utils::config_path(), "wrote default settings"),
            Err(err) => tracing::warn!(error = %err, "could not write default settings"),
        }
    }

    let host = Arc::new(ResearchHost::from_settings(&settings)?);
    let log = ConversationLog::new();

    println!("{}", render::welcome());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        // The next question is only read once this turn has finalized.
        let (tx, mut rx) = mpsc::unbounded_channel();
        let turn = host.submit_question(question, tx);
        let mut shown = String::new();

        while let Some(event) = rx.recv().await {
            match &event {
                TurnEvent::ContentUpdated { content, .. } => {
                    print!("{}", content.strip_prefix(shown.as_str()).unwrap_or(content));
                    std::io::stdout().flush()?;
                    shown.clone_from(content);
                }
                TurnEvent::Finalized {
                    content,
                    references,
                    ..
                } => {
                    if *content != shown {
                        // Stream failed: the partial answer is withdrawn.
                        println!("\n\n{}", content);
                    } else {
                        println!();
                    }
                    print!("{}", render::format_references(references));
                    println!();
                }
                _ => {}
            }
            log.append(event);
        }
        turn.await?;
        tracing::debug!(messages = log.snapshot().len(), "turn recorded");
    }

    Ok(())
}
