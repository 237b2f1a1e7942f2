use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::modules::lenient;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Progress {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub oid: Option<Bson>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub completed_lessons: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub percentage: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<String>,
}

impl Progress {
    /// A fresh, zeroed record for a newly enrolled user.
    pub fn fresh(user_id: String, course_id: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            oid: None,
            id: Some(uuid::Uuid::new_v4().to_string()),
            user_id: Some(user_id),
            course_id: Some(course_id),
            completed_lessons: Vec::new(),
            percentage: Some(0),
            started_at: Some(now.clone()),
            last_accessed: Some(now),
        }
    }
}
