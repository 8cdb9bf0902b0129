use anyhow::{Context, Result};
use parley_llm::{ChatClient, ChatOptions, ChatRequest, Message};
use tracing::debug;

pub const TITLE_PROMPT: &str = "You will generate a short title based on the first message \
a user begins a conversation with. Ensure it is not more than 80 characters long. The title \
should be a summary of the user's message. Do not use quotes or colons.";

const MAX_TITLE_CHARS: usize = 80;
const FALLBACK_TITLE: &str = "New chat";

/// Ask the model for a chat title summarizing the first user message
pub async fn generate_title(client: &dyn ChatClient, model: &str, first_message: &str) -> Result<String> {
    let request = ChatRequest::new(
        model,
        vec![Message::system(TITLE_PROMPT), Message::human(first_message)],
    )
    .with_options(ChatOptions::new().max_tokens(40));

    let response = client
        .chat(request)
        .await
        .context("Title generation failed")?;

    let title = clean_title(response.content.as_deref().unwrap_or_default());
    debug!(title = %title, "Generated chat title");
    Ok(title)
}

fn clean_title(raw: &str) -> String {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();
    let cleaned: String = line
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '#')
        .replace(':', "")
        .trim()
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect();

    if cleaned.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("\"Weather: Berlin\"\n"), "Weather Berlin");
        assert_eq!(clean_title("\n\n"), "New chat");
        assert_eq!(clean_title(&"a".repeat(120)).len(), 80);
    }
}
