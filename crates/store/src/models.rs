//! Stored row types.
//!
//! Distinct from the `stackexchange` wire types so the store only keeps what
//! the sync engine compares and renders.

use chrono::{DateTime, Utc};
use stackexchange::{QuestionItem, ShallowUser};

/// Last known state of a question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionRecord {
    pub id: i64,
    pub title: String,
    pub creation_date: DateTime<Utc>,
    pub last_activity_date: DateTime<Utc>,
    pub link: String,
    pub closed_reason: Option<String>,
    pub tags: Vec<String>,
    pub site: String,
    pub is_answered: bool,
    pub score: i64,
    pub view_count: i64,
    pub answer_count: i64,
    pub comment_count: i64,
    pub up_vote_count: i64,
    pub down_vote_count: i64,
    pub delete_vote_count: i64,
    pub favorite_count: i64,
    pub reopen_vote_count: i64,
    /// Owner; `None` for deleted or anonymous users.
    pub user_id: Option<i64>,
}

impl QuestionRecord {
    pub fn from_wire(item: &QuestionItem, site: &str) -> Self {
        Self {
            id: item.question_id,
            title: item.title.clone(),
            creation_date: item.created_at(),
            last_activity_date: item.last_activity_at(),
            link: item.canonical_link(),
            closed_reason: item.closed_reason.clone(),
            tags: item.tags.clone(),
            site: site.to_string(),
            is_answered: item.is_answered,
            score: item.score,
            view_count: item.view_count,
            answer_count: item.answer_count,
            comment_count: item.comment_count,
            up_vote_count: item.up_vote_count,
            down_vote_count: item.down_vote_count,
            delete_vote_count: item.delete_vote_count,
            favorite_count: item.favorite_count,
            reopen_vote_count: item.reopen_vote_count,
            user_id: item.owner.user_id,
        }
    }
}

/// Shallow user profile of a question owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub display_name: String,
    pub profile_image: String,
    pub link: String,
    pub reputation: i64,
    pub accept_rate: i64,
    pub badge_bronze: i64,
    pub badge_silver: i64,
    pub badge_gold: i64,
}

impl UserRecord {
    /// `None` when the owner has no user id.
    pub fn from_wire(owner: &ShallowUser) -> Option<Self> {
        owner.user_id.map(|id| Self {
            id,
            display_name: owner.display_name.clone(),
            profile_image: owner.profile_image.clone(),
            link: owner.link.clone(),
            reputation: owner.reputation,
            accept_rate: owner.accept_rate,
            badge_bronze: owner.badge_counts.bronze,
            badge_silver: owner.badge_counts.silver,
            badge_gold: owner.badge_counts.gold,
        })
    }
}

/// Chat message a question was mirrored to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLink {
    pub question_id: i64,
    pub channel: String,
    /// Message timestamp, Slack's message handle.
    pub ts: String,
}

/// Result of an equality-checked upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

impl UpsertOutcome {
    /// Whether a row was written.
    pub fn is_write(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackexchange::BadgeCounts;

    #[test]
    fn test_question_from_wire() {
        let item = QuestionItem {
            question_id: 42,
            title: "Rotate entity".to_string(),
            creation_date: 1_500_000_000,
            last_activity_date: 1_500_000_500,
            link: Some("https://stackoverflow.com/questions/42/rotate".to_string()),
            share_link: Some("https://stackoverflow.com/q/42".to_string()),
            tags: vec!["aframe".to_string()],
            score: 3,
            owner: ShallowUser {
                user_id: Some(7),
                ..Default::default()
            },
            ..Default::default()
        };

        let record = QuestionRecord::from_wire(&item, "stackoverflow");
        assert_eq!(record.id, 42);
        assert_eq!(record.link, "https://stackoverflow.com/q/42");
        assert_eq!(record.creation_date.timestamp(), 1_500_000_000);
        assert_eq!(record.site, "stackoverflow");
        assert_eq!(record.user_id, Some(7));
    }

    #[test]
    fn test_user_from_wire() {
        let owner = ShallowUser {
            user_id: Some(9),
            display_name: "ngokevin".to_string(),
            badge_counts: BadgeCounts {
                bronze: 1,
                silver: 2,
                gold: 3,
            },
            ..Default::default()
        };
        let user = UserRecord::from_wire(&owner).unwrap();
        assert_eq!(user.id, 9);
        assert_eq!(user.badge_gold, 3);

        assert!(UserRecord::from_wire(&ShallowUser::default()).is_none());
    }
}
