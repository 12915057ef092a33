/// Discussion forums
///
/// Threads are filed under a fixed set of topics. Reply counters on a
/// thread are maintained when replies are added or removed.

mod manager;
pub mod topics;

pub use manager::ForumManager;
pub use topics::{find_topic, Topic, TopicSummary, TOPICS};

use crate::store::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Thread record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub topic_id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub reply_count: u32,
    #[serde(default)]
    pub last_reply_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Thread {
    const DOCUMENT: &'static str = "threads";
    const KIND: &'static str = "Thread";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Reply record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: String,
    pub thread_id: String,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

impl Record for Reply {
    const DOCUMENT: &'static str = "replies";
    const KIND: &'static str = "Reply";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateThreadRequest {
    pub topic_id: String,
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 20000, message = "Content is required"))]
    pub content: String,
}

/// Partial thread update. `isPinned` and `isLocked` are admin-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateThreadRequest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 20000, message = "Content is required"))]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_locked: Option<bool>,
}

impl UpdateThreadRequest {
    fn moderates(&self) -> bool {
        self.is_pinned.is_some() || self.is_locked.is_some()
    }

    fn edits_content(&self) -> bool {
        self.topic_id.is_some() || self.title.is_some() || self.content.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateReplyRequest {
    #[validate(length(min = 1, max = 20000, message = "Reply cannot be empty"))]
    pub content: String,
}

/// Pinned threads first, newest first within each group
pub fn sort_threads(threads: &mut Vec<Thread>) {
    threads.reverse();
    threads.sort_by(|a, b| {
        b.is_pinned
            .cmp(&a.is_pinned)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn thread(id: &str, pinned: bool, age_minutes: i64) -> Thread {
        let created = Utc::now() - Duration::minutes(age_minutes);
        Thread {
            id: id.to_string(),
            topic_id: "general".to_string(),
            title: id.to_string(),
            content: "body".to_string(),
            author_id: "u1".to_string(),
            author_name: "Teacher".to_string(),
            is_pinned: pinned,
            is_locked: false,
            reply_count: 0,
            last_reply_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_pinned_first_then_newest() {
        let mut threads = vec![
            thread("old", false, 50),
            thread("pinned-old", true, 100),
            thread("new", false, 1),
            thread("pinned-new", true, 10),
        ];
        sort_threads(&mut threads);

        let order: Vec<&str> = threads.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, vec!["pinned-new", "pinned-old", "new", "old"]);
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(thread("t", true, 0)).unwrap();
        assert_eq!(json["isPinned"], true);
        assert_eq!(json["topicId"], "general");
        assert_eq!(json["replyCount"], 0);
    }
}
