use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::modules::lesson::model::Lesson;
use crate::modules::{lenient, Keyed};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Module {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub oid: Option<Bson>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// Present only on modules that embed their lessons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lessons: Option<Vec<Lesson>>,
}

impl Module {
    pub fn embedded_lessons(&self) -> &[Lesson] {
        self.lessons.as_deref().unwrap_or(&[])
    }
}

impl Keyed for Module {
    fn app_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn object_id(&self) -> Option<&Bson> {
        self.oid.as_ref()
    }
}
