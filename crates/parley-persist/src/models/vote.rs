use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One vote per (chat, message); voting again overwrites
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub chat_id: Uuid,
    pub message_id: Uuid,
    pub is_upvoted: bool,
}
