pub mod context;
pub mod documents;
pub mod handler;
pub mod registry;
pub mod weather;

pub use context::{EventSender, ToolContext};
pub use documents::{CreateDocumentTool, RequestSuggestionsTool, UpdateDocumentTool};
pub use handler::ToolHandler;
pub use registry::ToolRegistry;
pub use weather::{WeatherTool, OPEN_METEO_API_BASE};
