use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::modules::{lenient, Keyed};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Lesson {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub oid: Option<Bson>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub content: String,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
}

impl Lesson {
    pub fn has_image(&self) -> bool {
        self.content.contains("<img")
    }

    pub fn has_video(&self) -> bool {
        self.content.contains("<video") || self.content.contains("<iframe")
    }
}

impl Keyed for Lesson {
    fn app_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn object_id(&self) -> Option<&Bson> {
        self.oid.as_ref()
    }
}

/// Where a lesson is stored.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// A document in the `lessons` collection.
    Collection,
    /// An element of `modules.lessons` on the module with this key.
    Embedded { module: bson::Document, index: usize },
    /// An element of `courses.modules.N.lessons` on the course with this key.
    CourseEmbedded {
        course: bson::Document,
        module: usize,
        index: usize,
    },
}

impl Placement {
    pub fn label(&self) -> &'static str {
        match self {
            Placement::Collection => "collection",
            Placement::Embedded { .. } => "embedded",
            Placement::CourseEmbedded { .. } => "course-embedded",
        }
    }

    /// Dotted path of the array holding the lesson, and its index there.
    pub fn array_path(&self) -> Option<(String, usize)> {
        match self {
            Placement::Collection => None,
            Placement::Embedded { index, .. } => Some(("lessons".to_string(), *index)),
            Placement::CourseEmbedded { module, index, .. } => {
                Some((format!("modules.{}.lessons", module), *index))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlacedLesson {
    pub lesson: Lesson,
    pub placement: Placement,
}

impl PlacedLesson {
    pub fn order(&self) -> i64 {
        match (&self.lesson.order, &self.placement) {
            (Some(order), _) => *order,
            (None, Placement::Embedded { index, .. }) | (None, Placement::CourseEmbedded { index, .. }) => {
                *index as i64
            }
            (None, Placement::Collection) => i64::MAX,
        }
    }
}
