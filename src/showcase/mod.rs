/// Project showcase
///
/// Teachers post student work tagged with a grade level and the design
/// cycle phases it covers.

mod manager;

pub use manager::ProjectManager;

use crate::{
    error::{ApiError, ApiResult},
    store::Record,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

/// Stage of the design cycle a project demonstrates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DesignCyclePhase {
    InquiringAnalysing,
    DevelopingIdeas,
    CreatingSolution,
    Evaluating,
}

impl DesignCyclePhase {
    pub const ALL: [DesignCyclePhase; 4] = [
        DesignCyclePhase::InquiringAnalysing,
        DesignCyclePhase::DevelopingIdeas,
        DesignCyclePhase::CreatingSolution,
        DesignCyclePhase::Evaluating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DesignCyclePhase::InquiringAnalysing => "inquiring-analysing",
            DesignCyclePhase::DevelopingIdeas => "developing-ideas",
            DesignCyclePhase::CreatingSolution => "creating-solution",
            DesignCyclePhase::Evaluating => "evaluating",
        }
    }
}

impl FromStr for DesignCyclePhase {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| ApiError::Validation(format!("Unknown design cycle phase: {}", s)))
    }
}

/// Project record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub grade_level: String,
    #[serde(default)]
    pub design_cycle_phases: Vec<DesignCyclePhase>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comment_count: u32,
    pub author_id: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Project {
    const DOCUMENT: &'static str = "projects";
    const KIND: &'static str = "Project";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Create project request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 10000))]
    pub description: String,
    #[validate(length(min = 1, max = 40, message = "Grade level is required"))]
    pub grade_level: String,
    #[serde(default)]
    pub design_cycle_phases: Vec<DesignCyclePhase>,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub images: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub tags: Vec<String>,
}

/// Partial project update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 40))]
    pub grade_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_cycle_phases: Option<Vec<DesignCyclePhase>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 20))]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 20))]
    pub tags: Option<Vec<String>>,
}

/// List filter from the query string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFilter {
    pub grade_level: Option<String>,
    pub design_cycle_phase: Option<String>,
}

impl ProjectFilter {
    /// Resolve the phase name; unknown phases are a validation error
    pub fn phase(&self) -> ApiResult<Option<DesignCyclePhase>> {
        self.design_cycle_phase
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(DesignCyclePhase::from_str)
            .transpose()
    }

    pub fn matches(&self, project: &Project, phase: Option<DesignCyclePhase>) -> bool {
        let grade_ok = match self.grade_level.as_deref().map(str::trim) {
            Some(grade) if !grade.is_empty() => project.grade_level.eq_ignore_ascii_case(grade),
            _ => true,
        };
        let phase_ok = phase.map_or(true, |p| project.design_cycle_phases.contains(&p));
        grade_ok && phase_ok
    }
}

/// Trim, drop blanks and duplicates while keeping order
pub(crate) fn clean_list(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim().to_string();
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

/// Phases in cycle order without repeats
pub(crate) fn clean_phases(phases: Vec<DesignCyclePhase>) -> Vec<DesignCyclePhase> {
    DesignCyclePhase::ALL
        .into_iter()
        .filter(|p| phases.contains(p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_names() {
        assert_eq!(
            "developing-ideas".parse::<DesignCyclePhase>().unwrap(),
            DesignCyclePhase::DevelopingIdeas
        );
        assert!("brainstorming".parse::<DesignCyclePhase>().is_err());

        let json = serde_json::to_string(&DesignCyclePhase::InquiringAnalysing).unwrap();
        assert_eq!(json, "\"inquiring-analysing\"");
    }

    #[test]
    fn test_clean_lists() {
        let tags = clean_list(vec![
            " wood ".to_string(),
            "".to_string(),
            "wood".to_string(),
            "CAD".to_string(),
        ]);
        assert_eq!(tags, vec!["wood", "CAD"]);

        let phases = clean_phases(vec![
            DesignCyclePhase::Evaluating,
            DesignCyclePhase::InquiringAnalysing,
            DesignCyclePhase::Evaluating,
        ]);
        assert_eq!(
            phases,
            vec![DesignCyclePhase::InquiringAnalysing, DesignCyclePhase::Evaluating]
        );
    }
}
