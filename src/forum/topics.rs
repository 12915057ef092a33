/// Fixed forum topic taxonomy
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Topic {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const TOPICS: [Topic; 7] = [
    Topic {
        id: "general",
        name: "General Discussion",
        description: "Introductions, questions and anything design education",
    },
    Topic {
        id: "design-cycle",
        name: "The Design Cycle",
        description: "Teaching inquiry, ideation, creation and evaluation",
    },
    Topic {
        id: "assessment",
        name: "Assessment",
        description: "Criteria, rubrics, moderation and feedback",
    },
    Topic {
        id: "resources",
        name: "Resources",
        description: "Unit plans, worksheets and shared materials",
    },
    Topic {
        id: "technology",
        name: "Technology",
        description: "Tools, software, fabrication and workshop equipment",
    },
    Topic {
        id: "projects",
        name: "Projects",
        description: "Project ideas and student work in progress",
    },
    Topic {
        id: "professional-growth",
        name: "Professional Growth",
        description: "Workshops, reading and career development",
    },
];

/// Look up a topic by id
pub fn find_topic(id: &str) -> Option<&'static Topic> {
    TOPICS.iter().find(|t| t.id == id)
}

/// A topic with the number of threads filed under it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSummary {
    #[serde(flatten)]
    pub topic: Topic,
    pub thread_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_topic() {
        assert_eq!(find_topic("assessment").unwrap().name, "Assessment");
        assert!(find_topic("off-topic").is_none());
    }

    #[test]
    fn test_topic_ids_unique() {
        for (i, a) in TOPICS.iter().enumerate() {
            assert!(TOPICS.iter().skip(i + 1).all(|b| b.id != a.id));
        }
    }
}
