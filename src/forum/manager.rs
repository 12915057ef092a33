/// Forum manager backed by the `threads` and `replies` JSON documents
use crate::{
    account::User,
    error::{ApiError, ApiResult},
    forum::{
        find_topic, sort_threads, CreateReplyRequest, CreateThreadRequest, Reply, Thread,
        TopicSummary, UpdateThreadRequest, TOPICS,
    },
    store::{Collection, DocumentBackend},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct ForumManager {
    threads: Collection<Thread>,
    replies: Collection<Reply>,
}

fn require_topic(topic_id: &str) -> ApiResult<String> {
    find_topic(topic_id)
        .map(|t| t.id.to_string())
        .ok_or_else(|| ApiError::Validation(format!("Unknown topic: {}", topic_id)))
}

fn required_text(value: &str, field: &str) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

impl ForumManager {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            threads: Collection::new(Arc::clone(&backend)),
            replies: Collection::new(backend),
        }
    }

    /// Every topic with its thread count
    pub async fn topics(&self) -> ApiResult<Vec<TopicSummary>> {
        let threads = self.threads.all().await?;
        Ok(TOPICS
            .iter()
            .map(|topic| TopicSummary {
                topic: *topic,
                thread_count: threads.iter().filter(|t| t.topic_id == topic.id).count(),
            })
            .collect())
    }

    /// Threads, optionally for one topic, pinned first then newest first
    pub async fn list_threads(&self, topic_id: Option<&str>) -> ApiResult<Vec<Thread>> {
        let mut threads = self.threads.all().await?;
        if let Some(topic_id) = topic_id.filter(|t| !t.is_empty()) {
            threads.retain(|t| t.topic_id == topic_id);
        }
        sort_threads(&mut threads);
        Ok(threads)
    }

    pub async fn get_thread(&self, id: &str) -> ApiResult<Thread> {
        self.threads.get(id).await
    }

    pub async fn create_thread(&self, author: &User, req: CreateThreadRequest) -> ApiResult<Thread> {
        req.validate()?;

        let now = Utc::now();
        let thread = Thread {
            id: Uuid::new_v4().to_string(),
            topic_id: require_topic(&req.topic_id)?,
            title: required_text(&req.title, "Title")?,
            content: required_text(&req.content, "Content")?,
            author_id: author.id.clone(),
            author_name: author.display_name.clone(),
            is_pinned: false,
            is_locked: false,
            reply_count: 0,
            last_reply_at: None,
            created_at: now,
            updated_at: now,
        };

        let thread = self.threads.insert(thread).await?;
        tracing::info!("{} started thread {} in {}", author.id, thread.id, thread.topic_id);
        Ok(thread)
    }

    /// Partial update: content by author or admin, pin/lock by admin
    pub async fn update_thread(&self, actor: &User, req: UpdateThreadRequest) -> ApiResult<Thread> {
        req.validate()?;

        if req.moderates() && !actor.is_admin() {
            return Err(ApiError::Authorization(
                "Only admins can pin or lock threads".to_string(),
            ));
        }

        let topic_id = req.topic_id.as_deref().map(require_topic).transpose()?;
        let id = req.id.clone();

        self.threads
            .modify(&id, |thread| {
                if req.edits_content() && !actor.can_manage(&thread.author_id) {
                    return Err(ApiError::Authorization(
                        "Only the author can edit this thread".to_string(),
                    ));
                }

                if let Some(topic_id) = topic_id {
                    thread.topic_id = topic_id;
                }
                if let Some(title) = req.title.as_deref() {
                    thread.title = required_text(title, "Title")?;
                }
                if let Some(content) = req.content.as_deref() {
                    thread.content = required_text(content, "Content")?;
                }
                if let Some(pinned) = req.is_pinned {
                    thread.is_pinned = pinned;
                }
                if let Some(locked) = req.is_locked {
                    thread.is_locked = locked;
                }

                thread.updated_at = Utc::now();
                Ok(thread.clone())
            })
            .await
    }

    /// Delete a thread and its replies (author or admin)
    pub async fn delete_thread(&self, actor: &User, id: &str) -> ApiResult<Thread> {
        let thread = self
            .threads
            .update(|threads| {
                let index = threads
                    .iter()
                    .position(|t| t.id == id)
                    .ok_or_else(|| ApiError::NotFound("Thread not found".to_string()))?;

                if !actor.can_manage(&threads[index].author_id) {
                    return Err(ApiError::Authorization(
                        "Only the author can delete this thread".to_string(),
                    ));
                }

                Ok(threads.remove(index))
            })
            .await?;

        let removed = self.replies.remove_where(|r| r.thread_id == thread.id).await?;
        tracing::info!(
            "{} deleted thread {} with {} replies",
            actor.id,
            thread.id,
            removed
        );
        Ok(thread)
    }

    /// Replies of a thread, oldest first
    pub async fn list_replies(&self, thread_id: &str) -> ApiResult<Vec<Reply>> {
        self.threads.get(thread_id).await?;

        let mut replies: Vec<Reply> = self
            .replies
            .all()
            .await?
            .into_iter()
            .filter(|r| r.thread_id == thread_id)
            .collect();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(replies)
    }

    /// Reply to an unlocked thread
    pub async fn create_reply(
        &self,
        author: &User,
        thread_id: &str,
        req: CreateReplyRequest,
    ) -> ApiResult<Reply> {
        req.validate()?;
        let content = required_text(&req.content, "Reply")?;
        let now = Utc::now();

        let reply = self
            .replies
            .insert(Reply {
                id: Uuid::new_v4().to_string(),
                thread_id: thread_id.to_string(),
                content,
                author_id: author.id.clone(),
                author_name: author.display_name.clone(),
                created_at: now,
            })
            .await?;

        // The reply is stored before the counter moves, so a thread deleted
        // in between either still sees it in its cascade or fails the update
        // below and the reply is taken back out.
        let counted = self
            .threads
            .modify(thread_id, |thread| {
                if thread.is_locked {
                    return Err(ApiError::Validation("Thread is locked".to_string()));
                }
                thread.reply_count += 1;
                thread.last_reply_at = Some(now);
                Ok(())
            })
            .await;

        if let Err(err) = counted {
            if let Err(cleanup) = self.replies.remove(&reply.id).await {
                tracing::warn!("Failed to remove uncounted reply {}: {}", reply.id, cleanup);
            }
            return Err(err);
        }

        Ok(reply)
    }

    /// Delete a reply (author or admin) and roll back the thread counters
    pub async fn delete_reply(&self, actor: &User, thread_id: &str, reply_id: &str) -> ApiResult<Reply> {
        let reply = self
            .replies
            .update(|replies| {
                let index = replies
                    .iter()
                    .position(|r| r.id == reply_id && r.thread_id == thread_id)
                    .ok_or_else(|| ApiError::NotFound("Reply not found".to_string()))?;

                if !actor.can_manage(&replies[index].author_id) {
                    return Err(ApiError::Authorization(
                        "Only the author can delete this reply".to_string(),
                    ));
                }

                Ok(replies.remove(index))
            })
            .await?;

        let last_reply_at = self
            .replies
            .all()
            .await?
            .into_iter()
            .filter(|r| r.thread_id == thread_id)
            .map(|r| r.created_at)
            .max();

        self.threads
            .modify(thread_id, |thread| {
                thread.reply_count = thread.reply_count.saturating_sub(1);
                thread.last_reply_at = last_reply_at;
                Ok(())
            })
            .await?;

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{account::Role, store::MemoryDocumentBackend};

    fn user(id: &str, role: Role) -> User {
        let now = Utc::now();
        User {
            id: id.to_string(),
            email: format!("{}@school.edu", id),
            password_hash: String::new(),
            display_name: id.to_string(),
            school: None,
            job_title: None,
            bio: None,
            avatar_url: None,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    fn new_thread(topic: &str, title: &str) -> CreateThreadRequest {
        CreateThreadRequest {
            topic_id: topic.to_string(),
            title: title.to_string(),
            content: "What do you think?".to_string(),
        }
    }

    fn reply(text: &str) -> CreateReplyRequest {
        CreateReplyRequest {
            content: text.to_string(),
        }
    }

    fn manager() -> ForumManager {
        ForumManager::new(Arc::new(MemoryDocumentBackend::new()))
    }

    #[tokio::test]
    async fn test_unknown_topic_rejected() {
        let forum = manager();
        let author = user("u1", Role::Member);

        let err = forum
            .create_thread(&author, new_thread("gossip", "Hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_sorted_and_filtered() {
        let forum = manager();
        let member = user("u1", Role::Member);
        let admin = user("u2", Role::Admin);

        let first = forum.create_thread(&member, new_thread("general", "first")).await.unwrap();
        forum.create_thread(&member, new_thread("assessment", "second")).await.unwrap();
        forum.create_thread(&member, new_thread("general", "third")).await.unwrap();

        forum
            .update_thread(
                &admin,
                UpdateThreadRequest {
                    id: first.id.clone(),
                    is_pinned: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let titles: Vec<String> = forum
            .list_threads(None)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["first", "third", "second"]);

        let general = forum.list_threads(Some("general")).await.unwrap();
        assert_eq!(general.len(), 2);

        let topics = forum.topics().await.unwrap();
        let counts: Vec<usize> = topics.iter().map(|t| t.thread_count).collect();
        assert_eq!(counts, vec![2, 0, 1, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_members_cannot_moderate() {
        let forum = manager();
        let member = user("u1", Role::Member);
        let thread = forum.create_thread(&member, new_thread("general", "mine")).await.unwrap();

        let err = forum
            .update_thread(
                &member,
                UpdateThreadRequest {
                    id: thread.id.clone(),
                    is_locked: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Authorization(_)));

        let edited = forum
            .update_thread(
                &member,
                UpdateThreadRequest {
                    id: thread.id.clone(),
                    title: Some("still mine".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.title, "still mine");
    }

    #[tokio::test]
    async fn test_replies_maintain_counters() {
        let forum = manager();
        let author = user("u1", Role::Member);
        let thread = forum.create_thread(&author, new_thread("resources", "Rubrics")).await.unwrap();

        let first = forum.create_reply(&author, &thread.id, reply("one")).await.unwrap();
        forum.create_reply(&author, &thread.id, reply("two")).await.unwrap();

        let stored = forum.get_thread(&thread.id).await.unwrap();
        assert_eq!(stored.reply_count, 2);
        assert!(stored.last_reply_at.is_some());

        let replies = forum.list_replies(&thread.id).await.unwrap();
        assert_eq!(replies[0].content, "one");

        forum.delete_reply(&author, &thread.id, &first.id).await.unwrap();
        assert_eq!(forum.get_thread(&thread.id).await.unwrap().reply_count, 1);
    }

    #[tokio::test]
    async fn test_locked_thread_rejects_replies() {
        let forum = manager();
        let admin = user("u1", Role::Admin);
        let thread = forum.create_thread(&admin, new_thread("general", "Closed")).await.unwrap();

        forum
            .update_thread(
                &admin,
                UpdateThreadRequest {
                    id: thread.id.clone(),
                    is_locked: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = forum.create_reply(&admin, &thread.id, reply("late")).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(forum.get_thread(&thread.id).await.unwrap().reply_count, 0);
        assert!(forum.list_replies(&thread.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reply_to_missing_thread_leaves_nothing_behind() {
        let forum = manager();
        let author = user("u1", Role::Member);

        let err = forum.create_reply(&author, "nope", reply("hello")).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(forum.replies.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replies_racing_thread_delete_leave_no_orphans() {
        let forum = Arc::new(manager());
        let author = user("u1", Role::Member);
        let thread = forum.create_thread(&author, new_thread("general", "Race")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let forum = Arc::clone(&forum);
            let author = author.clone();
            let thread_id = thread.id.clone();
            handles.push(tokio::spawn(async move {
                let _ = forum
                    .create_reply(&author, &thread_id, reply(&format!("r{}", i)))
                    .await;
            }));
        }
        forum.delete_thread(&author, &thread.id).await.unwrap();
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(forum.replies.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_replies_are_all_counted() {
        let forum = Arc::new(manager());
        let author = user("u1", Role::Member);
        let thread = forum.create_thread(&author, new_thread("general", "Busy")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let forum = Arc::clone(&forum);
            let author = author.clone();
            let thread_id = thread.id.clone();
            handles.push(tokio::spawn(async move {
                forum
                    .create_reply(&author, &thread_id, reply(&format!("r{}", i)))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = forum.get_thread(&thread.id).await.unwrap();
        assert_eq!(stored.reply_count, 10);
        assert_eq!(forum.list_replies(&thread.id).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_delete_thread_removes_replies() {
        let forum = manager();
        let author = user("u1", Role::Member);
        let thread = forum.create_thread(&author, new_thread("general", "Bye")).await.unwrap();
        forum.create_reply(&author, &thread.id, reply("r")).await.unwrap();

        forum.delete_thread(&author, &thread.id).await.unwrap();

        assert!(matches!(
            forum.list_replies(&thread.id).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(forum.replies.all().await.unwrap().is_empty());
    }
}
