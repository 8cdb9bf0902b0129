mod default;
mod prompts;
mod strategy;
mod title;

pub use default::DefaultContextStrategy;
pub use prompts::{system_prompt, RequestHints, ARTIFACTS_PROMPT, REGULAR_PROMPT};
pub use strategy::{ContextStrategy, ContextWindow};
pub use title::{generate_title, TITLE_PROMPT};
