//! Conversation CLI commands: ask, list, show.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use concierge_types::conversation::{Conversation, Role};

use crate::state::AppState;

/// Send a message. Starts a new conversation unless `conversation_id` is given.
///
/// # Examples
///
/// ```bash
/// concierge ask "What's the weather in Barcelona?"
/// concierge ask --conversation <id> "And tomorrow?"
/// ```
pub async fn ask(
    state: &AppState,
    conversation_id: Option<&str>,
    message: &str,
    json: bool,
) -> Result<()> {
    match conversation_id {
        None => {
            let started = state.chat_service.start_conversation(message).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&started)?);
                return Ok(());
            }

            println!();
            println!(
                "  {} {}",
                style(&started.title).cyan().bold(),
                style(format!("({})", started.conversation_id)).dim()
            );
            println!();
            print_reply(&started.reply);
            println!(
                "  {}",
                style(format!(
                    "Continue with: concierge ask --conversation {} \"...\"",
                    started.conversation_id
                ))
                .dim()
            );
            println!();
        }
        Some(id) => {
            let continued = state.chat_service.continue_conversation(id, message).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&continued)?);
                return Ok(());
            }

            println!();
            print_reply(&continued.reply);
        }
    }

    Ok(())
}

fn print_reply(reply: &str) {
    for line in reply.lines() {
        println!("  {line}");
    }
    println!();
}

/// List conversations in a table, most recently updated first.
pub async fn list_conversations(state: &AppState, json: bool) -> Result<()> {
    let conversations = state.chat_service.list_conversations().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversations)?);
        return Ok(());
    }

    if conversations.is_empty() {
        println!();
        println!(
            "  {} No conversations yet. Start one with: {}",
            style("i").blue().bold(),
            style("concierge ask \"...\"").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Created").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for conversation in &conversations {
        table.add_row(vec![
            Cell::new(conversation.id.to_string()).fg(Color::DarkGrey),
            Cell::new(truncate(&conversation.title, 40)).fg(Color::Cyan),
            Cell::new(conversation.created_at.format("%Y-%m-%d %H:%M").to_string())
                .fg(Color::White),
            Cell::new(conversation.updated_at.format("%Y-%m-%d %H:%M").to_string())
                .fg(Color::White),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} conversation{}",
        style(conversations.len()).bold(),
        if conversations.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Print one conversation with its full message history.
pub async fn show_conversation(state: &AppState, id: &str, json: bool) -> Result<()> {
    let conversation = state.chat_service.describe_conversation(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversation)?);
        return Ok(());
    }

    print_conversation(&conversation);
    Ok(())
}

fn print_conversation(conversation: &Conversation) {
    println!();
    println!("  {}", style(&conversation.title).cyan().bold());
    println!(
        "  {}",
        style(format!(
            "{} · started {}",
            conversation.id,
            conversation.created_at.format("%Y-%m-%d %H:%M")
        ))
        .dim()
    );
    println!();

    for message in &conversation.messages {
        let label = match message.role {
            Role::User => style("you").green().bold(),
            Role::Assistant => style("assistant").magenta().bold(),
            Role::System => style("system").yellow().bold(),
        };
        println!(
            "  {} {}",
            label,
            style(message.created_at.format("%H:%M:%S")).dim()
        );
        for line in message.content.lines() {
            println!("    {line}");
        }
        println!();
    }
}

/// Shorten to at most `max` characters, ending with `...` when cut.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_titles() {
        assert_eq!(truncate("Weekend plans", 40), "Weekend plans");
    }

    #[test]
    fn truncate_is_char_safe() {
        let title = "Què farem el cap de setmana a Girona amb la família?";
        let short = truncate(title, 20);
        assert_eq!(short.chars().count(), 20);
        assert!(short.ends_with("..."));
    }
}
