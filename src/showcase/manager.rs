/// Project manager backed by the `projects` JSON document
use crate::{
    account::User,
    error::{ApiError, ApiResult},
    likes::toggle_like,
    showcase::{
        clean_list, clean_phases, CreateProjectRequest, Project, ProjectFilter,
        UpdateProjectRequest,
    },
    store::{Collection, DocumentBackend},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct ProjectManager {
    projects: Collection<Project>,
}

impl ProjectManager {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            projects: Collection::new(backend),
        }
    }

    /// Filtered projects, newest first
    pub async fn list(&self, filter: &ProjectFilter) -> ApiResult<Vec<Project>> {
        let phase = filter.phase()?;
        let mut projects: Vec<Project> = self
            .projects
            .all()
            .await?
            .into_iter()
            .filter(|p| filter.matches(p, phase))
            .collect();
        // Later inserts win timestamp ties
        projects.reverse();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    pub async fn get(&self, id: &str) -> ApiResult<Project> {
        self.projects.get(id).await
    }

    pub async fn create(&self, author: &User, req: CreateProjectRequest) -> ApiResult<Project> {
        req.validate()?;

        let title = req.title.trim().to_string();
        if title.is_empty() {
            return Err(ApiError::Validation("Title is required".to_string()));
        }

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4().to_string(),
            title,
            description: req.description.trim().to_string(),
            grade_level: req.grade_level.trim().to_string(),
            design_cycle_phases: clean_phases(req.design_cycle_phases),
            images: clean_list(req.images),
            tags: clean_list(req.tags),
            likes: Vec::new(),
            comment_count: 0,
            author_id: author.id.clone(),
            author_name: author.display_name.clone(),
            created_at: now,
            updated_at: now,
        };

        let project = self.projects.insert(project).await?;
        tracing::info!("{} shared project {}", author.id, project.id);
        Ok(project)
    }

    /// Partial update (author or admin)
    pub async fn update(&self, actor: &User, req: UpdateProjectRequest) -> ApiResult<Project> {
        req.validate()?;

        let id = req.id.clone();
        self.projects
            .modify(&id, |project| {
                if !actor.can_manage(&project.author_id) {
                    return Err(ApiError::Authorization(
                        "Only the author can edit this project".to_string(),
                    ));
                }

                if let Some(title) = req.title {
                    let title = title.trim().to_string();
                    if title.is_empty() {
                        return Err(ApiError::Validation("Title is required".to_string()));
                    }
                    project.title = title;
                }
                if let Some(description) = req.description {
                    project.description = description.trim().to_string();
                }
                if let Some(grade_level) = req.grade_level {
                    project.grade_level = grade_level.trim().to_string();
                }
                if let Some(phases) = req.design_cycle_phases {
                    project.design_cycle_phases = clean_phases(phases);
                }
                if let Some(images) = req.images {
                    project.images = clean_list(images);
                }
                if let Some(tags) = req.tags {
                    project.tags = clean_list(tags);
                }

                project.updated_at = Utc::now();
                Ok(project.clone())
            })
            .await
    }

    pub async fn toggle_like(&self, id: &str, user_id: &str) -> ApiResult<Project> {
        self.projects
            .modify(id, |project| {
                toggle_like(&mut project.likes, user_id);
                Ok(project.clone())
            })
            .await
    }

    /// Delete (author or admin)
    pub async fn delete(&self, actor: &User, id: &str) -> ApiResult<Project> {
        let project = self
            .projects
            .update(|projects| {
                let index = projects
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

                if !actor.can_manage(&projects[index].author_id) {
                    return Err(ApiError::Authorization(
                        "Only the author can delete this project".to_string(),
                    ));
                }

                Ok(projects.remove(index))
            })
            .await?;

        tracing::info!("{} deleted project {}", actor.id, project.id);
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{account::Role, showcase::DesignCyclePhase, store::MemoryDocumentBackend};

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

    fn project(title: &str, grade: &str, phases: Vec<DesignCyclePhase>) -> CreateProjectRequest {
        CreateProjectRequest {
            title: title.to_string(),
            description: "Student work".to_string(),
            grade_level: grade.to_string(),
            design_cycle_phases: phases,
            images: vec!["https://images.test/1.jpg".to_string()],
            tags: vec!["cardboard".to_string()],
        }
    }

    #[tokio::test]
    async fn test_filter_and_order() {
        let manager = ProjectManager::new(Arc::new(MemoryDocumentBackend::new()));
        let author = user("u1", Role::Member);

        manager
            .create(&author, project("Chairs", "MYP 3", vec![DesignCyclePhase::CreatingSolution]))
            .await
            .unwrap();
        manager
            .create(&author, project("Apps", "MYP 5", vec![DesignCyclePhase::Evaluating]))
            .await
            .unwrap();
        manager
            .create(
                &author,
                project(
                    "Lamps",
                    "MYP 3",
                    vec![DesignCyclePhase::Evaluating, DesignCyclePhase::CreatingSolution],
                ),
            )
            .await
            .unwrap();

        let all = manager.list(&ProjectFilter::default()).await.unwrap();
        let titles: Vec<&str> = all.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Lamps", "Apps", "Chairs"]);

        let filter = ProjectFilter {
            grade_level: Some("myp 3".to_string()),
            design_cycle_phase: Some("evaluating".to_string()),
        };
        let filtered = manager.list(&filter).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Lamps");

        let bad = ProjectFilter {
            grade_level: None,
            design_cycle_phase: Some("dreaming".to_string()),
        };
        assert!(matches!(manager.list(&bad).await, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_only_author_or_admin_edits() {
        let manager = ProjectManager::new(Arc::new(MemoryDocumentBackend::new()));
        let author = user("u1", Role::Member);
        let other = user("u2", Role::Member);
        let admin = user("u3", Role::Admin);

        let created = manager
            .create(&author, project("Bridges", "MYP 2", Vec::new()))
            .await
            .unwrap();

        let edit = UpdateProjectRequest {
            id: created.id.clone(),
            title: Some("Better bridges".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            manager.update(&other, edit.clone()).await,
            Err(ApiError::Authorization(_))
        ));
        let updated = manager.update(&admin, edit).await.unwrap();
        assert_eq!(updated.title, "Better bridges");
        assert_eq!(updated.tags, vec!["cardboard"]);

        assert!(matches!(
            manager.delete(&other, &created.id).await,
            Err(ApiError::Authorization(_))
        ));
        manager.delete(&author, &created.id).await.unwrap();
        assert!(matches!(
            manager.delete(&author, &created.id).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_like_toggle() {
        let manager = ProjectManager::new(Arc::new(MemoryDocumentBackend::new()));
        let author = user("u1", Role::Member);
        let created = manager
            .create(&author, project("Kites", "MYP 1", Vec::new()))
            .await
            .unwrap();

        assert_eq!(manager.toggle_like(&created.id, "u2").await.unwrap().likes.len(), 1);
        assert!(manager.toggle_like(&created.id, "u2").await.unwrap().likes.is_empty());
    }
}
