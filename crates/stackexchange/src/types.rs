//! Stack Exchange wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Common wrapper returned by every Stack Exchange method.
///
/// See <https://api.stackexchange.com/docs/wrapper>.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionsEnvelope {
    #[serde(default)]
    pub items: Vec<QuestionItem>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default)]
    pub quota_max: u32,
    #[serde(default)]
    pub quota_remaining: u32,
    /// Seconds the API asks us to wait before hitting the same method again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl QuestionsEnvelope {
    /// The API error carried by this envelope, if any.
    #[must_use]
    pub fn error(&self) -> Option<Error> {
        self.error_id.map(|id| Error::Api {
            id,
            name: self.error_name.clone().unwrap_or_default(),
            message: self.error_message.clone().unwrap_or_default(),
        })
    }
}

/// A question as returned by `/search/advanced` and `/questions/{ids}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionItem {
    pub question_id: i64,
    #[serde(default)]
    pub title: String,
    /// Epoch seconds.
    #[serde(default)]
    pub creation_date: i64,
    /// Epoch seconds.
    #[serde(default)]
    pub last_activity_date: i64,
    #[serde(default)]
    pub owner: ShallowUser,
    #[serde(default)]
    pub is_answered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_reason: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub answer_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub up_vote_count: i64,
    #[serde(default)]
    pub down_vote_count: i64,
    #[serde(default)]
    pub delete_vote_count: i64,
    #[serde(default)]
    pub favorite_count: i64,
    #[serde(default)]
    pub reopen_vote_count: i64,
}

impl QuestionItem {
    /// Share link when the filter includes it, the plain link otherwise.
    #[must_use]
    pub fn canonical_link(&self) -> String {
        self.share_link
            .as_ref()
            .or(self.link.as_ref())
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        epoch(self.creation_date)
    }

    #[must_use]
    pub fn last_activity_at(&self) -> DateTime<Utc> {
        epoch(self.last_activity_date)
    }
}

/// Owner of a question.
///
/// Deleted and anonymous owners come without a `user_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShallowUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub profile_image: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub reputation: i64,
    #[serde(default)]
    pub accept_rate: i64,
    #[serde(default)]
    pub badge_counts: BadgeCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeCounts {
    #[serde(default)]
    pub bronze: i64,
    #[serde(default)]
    pub silver: i64,
    #[serde(default)]
    pub gold: i64,
}

/// Convert API epoch seconds, falling back to the Unix epoch on overflow.
#[must_use]
pub fn epoch(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
