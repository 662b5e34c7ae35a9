//! `blotter chat` — Interactive or single-message chat mode.

use crate::app::App;
use blotter_config::AppConfig;
use blotter_core::message::{ConversationId, IncomingMessage};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

pub async fn run(config: AppConfig, message: Option<String>) -> anyhow::Result<()> {
    let app = App::build(config).await?;

    if let Some(msg) = message {
        let outcome = app.dispatcher.dispatch(IncomingMessage::new(&msg)).await;
        println!("{}", outcome.reply.text);
        return Ok(());
    }

    // Interactive mode: one conversation for the whole session, so
    // pronouns and follow-ups carry across turns.
    let conversation = ConversationId::new();
    println!("Blotter — type a message, or 'exit' to quit.");

    let stdin = tokio::io::stdin();
    let mut lines = tokio::io::BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        let outcome = app
            .dispatcher
            .dispatch(IncomingMessage::new(line).with_conversation(conversation.to_string()))
            .await;
        println!("[{}] {}", outcome.handler, outcome.reply.text);
    }

    Ok(())
}
