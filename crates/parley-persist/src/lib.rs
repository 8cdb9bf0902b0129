pub mod builder;
pub mod dbs;
pub mod error;
pub mod models;
pub mod trait_client;

pub use builder::PersistenceBuilder;
pub use dbs::memory::MemoryPersistenceClient;
#[cfg(feature = "postgres")]
pub use dbs::postgres::PostgresPersistenceClient;
pub use error::{PersistError, Result};
pub use models::{
    Chat, ChatList, ChatPage, DBMessage, Document, MessageRole, MessageType, Suggestion,
    Visibility, Vote, to_llm_messages,
};
pub use trait_client::PersistenceClient;
