use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::modules::module::model::Module;
use crate::modules::{lenient, Keyed};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Course {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub oid: Option<Bson>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub course_type: Option<String>,
    /// Older documents spell `course_type` as `type`.
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_bool", skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_bool", skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub enrolled_users: Vec<String>,
    /// Older courses keep their modules, with lessons, inside the course.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<Module>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Bson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Bson>,
}

impl Course {
    pub fn kind(&self) -> Option<&str> {
        self.course_type.as_deref().or(self.legacy_type.as_deref())
    }

    pub fn is_live(&self) -> bool {
        self.is_published.or(self.published).unwrap_or(false)
    }

    pub fn embedded_modules(&self) -> &[Module] {
        self.modules.as_deref().unwrap_or(&[])
    }
}

impl Keyed for Course {
    fn app_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn object_id(&self) -> Option<&Bson> {
        self.oid.as_ref()
    }
}

/// Canonical spelling of a category label.
///
/// `supply_chain`, `SUPPLY CHAIN` and `Supply Chain` all become
/// `Supply Chain`. Short all-caps words (`HR`) are kept as acronyms.
pub fn canonical_category(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|w| !w.is_empty())
        .map(title_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_word(word: &str) -> String {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    if !letters.is_empty() && letters.len() <= 2 && letters.iter().all(|c| c.is_uppercase()) {
        return word.to_string();
    }

    let mut out = String::with_capacity(word.len());
    let mut seen_letter = false;
    for c in word.chars() {
        if c.is_alphabetic() && !seen_letter {
            out.extend(c.to_uppercase());
            seen_letter = true;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn decodes_both_field_spellings() {
        let course: Course = bson::from_document(doc! {
            "_id": bson::oid::ObjectId::new(),
            "id": "incoterms_2024",
            "title": "Introduction to Commercial Terms (Incoterms)",
            "type": "compulsory",
            "published": true,
            "duration": 3_i32,
        })
        .unwrap();

        assert_eq!(course.kind(), Some("compulsory"));
        assert!(course.is_live());
        assert_eq!(course.duration.as_deref(), Some("3"));
        assert_eq!(course.reference().as_deref(), Some("incoterms_2024"));
    }

    #[test]
    fn new_flag_wins_over_legacy_flag() {
        let course: Course = bson::from_document(doc! {
            "title": "Valves",
            "is_published": false,
            "published": true,
        })
        .unwrap();
        assert!(!course.is_live());
    }

    #[test]
    fn object_id_is_the_fallback_key() {
        let oid = bson::oid::ObjectId::new();
        let course: Course = bson::from_document(doc! { "_id": oid, "title": "Legacy" }).unwrap();

        assert_eq!(course.key_filter(), doc! { "_id": oid });
        assert_eq!(course.reference(), Some(oid.to_hex()));
    }

    #[test]
    fn decodes_modules_embedded_in_the_course() {
        let course: Course = bson::from_document(doc! {
            "title": "Introduction to Commercial Terms (Incoterms)",
            "modules": [
                { "title": "Incoterms Presentation", "lessons": [
                    { "title": "Slide 1", "content": "<p>EXW</p>" },
                    { "title": "Slide 2", "order": "2" }
                ] }
            ]
        })
        .unwrap();

        let modules = course.embedded_modules();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].embedded_lessons().len(), 2);
        assert_eq!(modules[0].embedded_lessons()[1].order, Some(2));
        assert!(Course::default().embedded_modules().is_empty());
    }

    #[test]
    fn canonical_categories() {
        assert_eq!(canonical_category("supply_chain"), "Supply Chain");
        assert_eq!(canonical_category("SUPPLY CHAIN"), "Supply Chain");
        assert_eq!(canonical_category("Supply Chain"), "Supply Chain");
        assert_eq!(canonical_category("HEALTH & SAFETY"), "Health & Safety");
        assert_eq!(canonical_category("SALES (ENGINEER)"), "Sales (Engineer)");
        assert_eq!(canonical_category("HR Policy"), "HR Policy");
        assert_eq!(canonical_category("  required "), "Required");
    }
}
