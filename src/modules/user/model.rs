use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::modules::{lenient, Keyed};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub oid: Option<Bson>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub enrolled_courses: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub completed_courses: Vec<String>,
}

impl User {
    pub fn label(&self) -> &str {
        self.email
            .as_deref()
            .or(self.employee_id.as_deref())
            .unwrap_or("Unknown")
    }
}

impl Keyed for User {
    fn app_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn object_id(&self) -> Option<&Bson> {
        self.oid.as_ref()
    }
}
