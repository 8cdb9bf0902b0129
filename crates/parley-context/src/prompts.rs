use serde::{Deserialize, Serialize};

pub const REGULAR_PROMPT: &str =
    "You are a friendly assistant! Keep your responses concise and helpful.";

pub const ARTIFACTS_PROMPT: &str = "Artifacts is a special user interface mode that helps \
users with writing, editing, and other content creation tasks. When an artifact is open, it \
is on the right side of the screen, while the conversation is on the left side. When creating \
or updating documents, changes are reflected in real-time on the artifacts and visible to the user.

When asked to write code, always use artifacts. Specify the language in the backticks.

DO NOT UPDATE DOCUMENTS IMMEDIATELY AFTER CREATING THEM. WAIT FOR USER FEEDBACK OR REQUEST TO UPDATE IT.

When to use `create_document`:
- For substantial content (>10 lines) or code
- For content users will likely save or reuse (emails, code, essays, etc.)
- When explicitly requested to create a document
- For when content contains a single code snippet

When NOT to use `create_document`:
- For informational or explanatory content
- For conversational responses
- When asked to keep it in chat

Using `update_document`:
- Default to full document rewrites for major changes
- Use targeted updates only for specific, isolated changes
- Follow user instructions for which parts to modify

Do not update a document right after creating it. Wait for user feedback or a request to update it.";

/// Where the request came from, as reported by the edge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestHints {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl RequestHints {
    fn is_empty(&self) -> bool {
        self.latitude.is_none() && self.longitude.is_none() && self.city.is_none() && self.country.is_none()
    }

    fn to_prompt(&self) -> String {
        let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "unknown".to_string());
        format!(
            "About the origin of user's request:\n- lat: {}\n- lon: {}\n- city: {}\n- country: {}",
            field(&self.latitude),
            field(&self.longitude),
            field(&self.city),
            field(&self.country),
        )
    }
}

/// Compose the system prompt.
///
/// Reasoning models run without tools, so they do not get the artifact
/// instructions.
pub fn system_prompt(hints: Option<&RequestHints>, tools_enabled: bool) -> String {
    let mut prompt = REGULAR_PROMPT.to_string();
    if let Some(hints) = hints.filter(|h| !h.is_empty()) {
        prompt.push_str("\n\n");
        prompt.push_str(&hints.to_prompt());
    }
    if tools_enabled {
        prompt.push_str("\n\n");
        prompt.push_str(ARTIFACTS_PROMPT);
    }
    prompt
}
