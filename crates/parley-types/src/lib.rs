pub mod artifact;
pub mod config;
pub mod events;
pub mod output;
pub mod state;

pub use artifact::{ArtifactEvent, ArtifactKind, SuggestionDelta};
pub use config::{ContextPolicy, GraphConfig, LLMConfig};
pub use events::{EndStatus, StreamEvent};
pub use output::GraphOutput;
pub use state::{GraphInput, GraphState};
