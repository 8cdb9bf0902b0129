use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::PersistError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(PersistError::InvalidData(format!("visibility '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            title: title.into(),
            visibility: Visibility::Private,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Public chats are readable by anyone, private ones only by their owner
    pub fn is_visible_to(&self, user_id: Option<&str>) -> bool {
        self.visibility == Visibility::Public || user_id.is_some_and(|u| self.is_owned_by(u))
    }
}

/// Cursor paging over a user's chats, newest first.
///
/// `starting_after` pages towards older chats, `ending_before` towards newer
/// ones. Both cursors are chat ids; setting both is rejected by the API layer.
#[derive(Debug, Clone, Default)]
pub struct ChatPage {
    pub limit: usize,
    pub starting_after: Option<Uuid>,
    pub ending_before: Option<Uuid>,
}

impl ChatPage {
    pub const MAX_LIMIT: usize = 100;

    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            ..Default::default()
        }
    }

    pub fn starting_after(mut self, id: Uuid) -> Self {
        self.starting_after = Some(id);
        self
    }

    pub fn ending_before(mut self, id: Uuid) -> Self {
        self.ending_before = Some(id);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatList {
    pub chats: Vec<Chat>,
    pub has_more: bool,
}
