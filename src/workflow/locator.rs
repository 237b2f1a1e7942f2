use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use mongodb::Database;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{MaintError, Result};
use crate::modules::course::{crud::CourseCrud, model::Course};
use crate::modules::lesson::crud::LessonCrud;
use crate::modules::lesson::model::{PlacedLesson, Placement};
use crate::modules::module::{crud::ModuleCrud, model::Module};
use crate::modules::quiz::{crud::QuizCrud, model::Quiz};
use crate::modules::user::{crud::UserCrud, model::User};
use crate::modules::Keyed;

/// Operator-facing way of naming documents on the command line.
///
/// `id:`, `code:`, `title:` are exact matches; `match:` is a
/// case-insensitive regex on the title and `contains:` a case-insensitive
/// literal. `order:` picks a module or lesson by position. Bare text is an
/// exact title.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    All,
    Id(String),
    Order(i64),
    Code(String),
    Title(String),
    TitleRegex(String),
    TitleContains(String),
    Email(String),
    EmployeeId(String),
}

impl Selector {
    pub fn to_filter(&self) -> Document {
        match self {
            Selector::All => doc! {},
            Selector::Id(id) => match ObjectId::parse_str(id) {
                Ok(oid) => doc! { "$or": [ { "id": id.as_str() }, { "_id": oid } ] },
                Err(_) => doc! { "id": id.as_str() },
            },
            Selector::Order(order) => doc! { "order": *order },
            Selector::Code(code) => doc! { "code": code.as_str() },
            Selector::Title(title) => doc! { "title": title.as_str() },
            Selector::TitleRegex(pattern) => doc! {
                "title": { "$regex": pattern.as_str(), "$options": "i" }
            },
            Selector::TitleContains(text) => doc! {
                "title": { "$regex": regex::escape(text), "$options": "i" }
            },
            Selector::Email(email) => doc! { "email": email.as_str() },
            Selector::EmployeeId(id) => doc! { "employee_id": id.as_str() },
        }
    }

    /// The same test as `to_filter`, for modules and lessons that are
    /// already loaded (embedded ones have no collection to query).
    pub fn matches(&self, reference: Option<&str>, title: &str, order: Option<i64>) -> bool {
        match self {
            Selector::All => true,
            Selector::Id(id) => reference == Some(id.as_str()),
            Selector::Order(n) => order == Some(*n),
            Selector::Title(t) => title == t,
            Selector::TitleRegex(pattern) => regex::RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map(|re| re.is_match(title))
                .unwrap_or(false),
            Selector::TitleContains(text) => title.to_lowercase().contains(&text.to_lowercase()),
            Selector::Code(_) | Selector::Email(_) | Selector::EmployeeId(_) => false,
        }
    }
}

impl FromStr for Selector {
    type Err = MaintError;

    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(MaintError::InvalidArgument("empty selector".to_string()));
        }
        if raw == "all" {
            return Ok(Selector::All);
        }

        let selector = match raw.split_once(':') {
            Some(("id", v)) => Selector::Id(v.to_string()),
            Some(("order", v)) => Selector::Order(v.trim().parse().map_err(|_| {
                MaintError::InvalidArgument(format!("order must be an integer, got {:?}", v))
            })?),
            Some(("code", v)) => Selector::Code(v.to_string()),
            Some(("title", v)) => Selector::Title(v.to_string()),
            Some(("match", v)) => {
                regex::Regex::new(v).map_err(|e| {
                    MaintError::InvalidArgument(format!("bad regex {:?}: {}", v, e))
                })?;
                Selector::TitleRegex(v.to_string())
            }
            Some(("contains", v)) => Selector::TitleContains(v.to_string()),
            Some(("email", v)) => Selector::Email(v.to_string()),
            Some(("employee", v)) => Selector::EmployeeId(v.to_string()),
            _ => Selector::Title(raw.to_string()),
        };

        match &selector {
            Selector::Id(v)
            | Selector::Code(v)
            | Selector::Title(v)
            | Selector::TitleRegex(v)
            | Selector::TitleContains(v)
            | Selector::Email(v)
            | Selector::EmployeeId(v)
                if v.is_empty() =>
            {
                Err(MaintError::InvalidArgument(format!("selector {:?} has no value", raw)))
            }
            _ => Ok(selector),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::All => write!(f, "all"),
            Selector::Id(v) => write!(f, "id:{}", v),
            Selector::Order(n) => write!(f, "order:{}", n),
            Selector::Code(v) => write!(f, "code:{}", v),
            Selector::Title(v) => write!(f, "title:{}", v),
            Selector::TitleRegex(v) => write!(f, "match:{}", v),
            Selector::TitleContains(v) => write!(f, "contains:{}", v),
            Selector::Email(v) => write!(f, "email:{}", v),
            Selector::EmployeeId(v) => write!(f, "employee:{}", v),
        }
    }
}

fn exactly_one<T>(mut found: Vec<T>, entity: &'static str, selector: &Selector) -> Result<T> {
    match found.len() {
        0 => Err(MaintError::NotFound {
            entity,
            selector: selector.to_string(),
        }),
        1 => Ok(found.remove(0)),
        count => Err(MaintError::Ambiguous {
            entity,
            selector: selector.to_string(),
            count,
        }),
    }
}

fn module_refs(modules: &[Module]) -> Vec<String> {
    modules.iter().filter_map(|m| m.reference()).collect()
}

/// Title of the group holding lessons that belong to no module.
pub const UNASSIGNED: &str = "(unassigned)";

/// Lessons under one module heading, whichever way the module is stored.
#[derive(Debug, Clone)]
pub struct LessonGroup {
    pub title: String,
    pub order: Option<i64>,
    pub reference: Option<String>,
    pub lessons: Vec<PlacedLesson>,
}

/// Finds courses and everything hanging off them.
pub struct Locator<'a> {
    db: &'a Database,
}

impl<'a> Locator<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn course(&self, selector: &Selector) -> Result<Course> {
        let found = self.courses(selector).await?;
        exactly_one(found, "course", selector)
    }

    pub async fn courses(&self, selector: &Selector) -> Result<Vec<Course>> {
        Ok(CourseCrud::new(self.db).find(selector.to_filter()).await?)
    }

    pub async fn user(&self, selector: &Selector) -> Result<User> {
        let found = UserCrud::new(self.db).find(selector.to_filter()).await?;
        exactly_one(found, "user", selector)
    }

    pub async fn modules(&self, course: &Course) -> Result<Vec<Module>> {
        match course.reference() {
            Some(course_ref) => Ok(ModuleCrud::new(self.db).find_by_course(&course_ref).await?),
            None => Ok(Vec::new()),
        }
    }

    /// Collection and embedded lessons of one module, in lesson order.
    pub async fn lessons(&self, module: &Module) -> Result<Vec<PlacedLesson>> {
        let mut placed = Vec::new();

        if let Some(module_ref) = module.reference() {
            let stored = LessonCrud::new(self.db)
                .find(doc! { "module_id": module_ref.as_str() })
                .await?;
            placed.extend(stored.into_iter().map(|lesson| PlacedLesson {
                lesson,
                placement: Placement::Collection,
            }));
        }

        placed.extend(module.embedded_lessons().iter().enumerate().map(|(index, lesson)| {
            PlacedLesson {
                lesson: lesson.clone(),
                placement: Placement::Embedded {
                    module: module.key_filter(),
                    index,
                },
            }
        }));

        placed.sort_by_key(PlacedLesson::order);
        Ok(placed)
    }

    /// The course's lessons under their module headings: collection
    /// modules in order, then modules embedded in the course document, then
    /// an `(unassigned)` group for collection lessons that only point at the
    /// course.
    pub async fn lesson_groups(&self, course: &Course) -> Result<Vec<LessonGroup>> {
        let modules = self.modules(course).await?;
        let mut groups = Vec::with_capacity(modules.len());
        for module in &modules {
            groups.push(LessonGroup {
                title: module.title.clone(),
                order: module.order,
                reference: module.reference(),
                lessons: self.lessons(module).await?,
            });
        }

        let course_key = course.key_filter();
        for (m, module) in course.embedded_modules().iter().enumerate() {
            let mut lessons: Vec<PlacedLesson> = module
                .embedded_lessons()
                .iter()
                .enumerate()
                .map(|(index, lesson)| PlacedLesson {
                    lesson: lesson.clone(),
                    placement: Placement::CourseEmbedded {
                        course: course_key.clone(),
                        module: m,
                        index,
                    },
                })
                .collect();
            lessons.sort_by_key(PlacedLesson::order);
            groups.push(LessonGroup {
                title: module.title.clone(),
                order: module.order,
                reference: module.reference(),
                lessons,
            });
        }

        let strays = self.stray_lessons(course, &modules, &groups).await?;
        if !strays.is_empty() {
            groups.push(LessonGroup {
                title: UNASSIGNED.to_string(),
                order: None,
                reference: None,
                lessons: strays,
            });
        }
        Ok(groups)
    }

    /// Collection lessons with the course's `course_id` whose `module_id` is
    /// none of its modules, minus any already listed in `groups`.
    async fn stray_lessons(
        &self,
        course: &Course,
        modules: &[Module],
        groups: &[LessonGroup],
    ) -> Result<Vec<PlacedLesson>> {
        let Some(course_ref) = course.reference() else {
            return Ok(Vec::new());
        };

        let seen: HashSet<String> = groups
            .iter()
            .flat_map(|g| &g.lessons)
            .filter(|p| matches!(p.placement, Placement::Collection))
            .filter_map(|p| p.lesson.reference())
            .collect();

        let stray = LessonCrud::new(self.db)
            .find(doc! { "course_id": course_ref.as_str(), "module_id": { "$nin": module_refs(modules) } })
            .await?;

        Ok(stray
            .into_iter()
            .filter(|l| l.reference().map_or(true, |r| !seen.contains(&r)))
            .map(|lesson| PlacedLesson {
                lesson,
                placement: Placement::Collection,
            })
            .collect())
    }

    /// Every lesson of a course, group by group.
    pub async fn course_lessons(&self, course: &Course) -> Result<Vec<PlacedLesson>> {
        Ok(self
            .lesson_groups(course)
            .await?
            .into_iter()
            .flat_map(|g| g.lessons)
            .collect())
    }

    /// Exactly one module document of the course.
    pub async fn module(&self, course: &Course, selector: &Selector) -> Result<Module> {
        let found = self
            .modules(course)
            .await?
            .into_iter()
            .filter(|m| selector.matches(m.reference().as_deref(), &m.title, m.order))
            .collect();
        exactly_one(found, "module", selector)
    }

    /// Exactly one lesson of the course, optionally only under the module
    /// headings `module` selects.
    pub async fn lesson(
        &self,
        course: &Course,
        module: Option<&Selector>,
        selector: &Selector,
    ) -> Result<PlacedLesson> {
        let mut groups = self.lesson_groups(course).await?;
        if let Some(module_sel) = module {
            groups.retain(|g| module_sel.matches(g.reference.as_deref(), &g.title, g.order));
            if groups.is_empty() {
                return Err(MaintError::NotFound {
                    entity: "module",
                    selector: module_sel.to_string(),
                });
            }
        }

        let found = groups
            .into_iter()
            .flat_map(|g| g.lessons)
            .filter(|p| selector.matches(p.lesson.reference().as_deref(), &p.lesson.title, Some(p.order())))
            .collect();
        exactly_one(found, "lesson", selector)
    }

    /// Exactly one quiz of the course.
    pub async fn quiz(&self, course: &Course, selector: &Selector) -> Result<Quiz> {
        let found = self
            .quizzes(course)
            .await?
            .into_iter()
            .filter(|q| selector.matches(q.reference().as_deref(), &q.title, None))
            .collect();
        exactly_one(found, "quiz", selector)
    }

    pub async fn quizzes(&self, course: &Course) -> Result<Vec<Quiz>> {
        let Some(course_ref) = course.reference() else {
            return Ok(Vec::new());
        };
        let modules = self.modules(course).await?;
        Ok(QuizCrud::new(self.db)
            .find(course_scope_filter(&course_ref, &module_refs(&modules)))
            .await?)
    }
}

/// Documents tied to a course directly or through one of its modules.
pub fn course_scope_filter(course_ref: &str, module_refs: &[String]) -> Document {
    let modules: Vec<Bson> = module_refs.iter().map(|r| Bson::String(r.clone())).collect();
    doc! {
        "$or": [
            { "course_id": course_ref },
            { "module_id": { "$in": modules } },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_selectors() {
        assert_eq!("code:HR-001".parse::<Selector>().unwrap(), Selector::Code("HR-001".into()));
        assert_eq!("id:incoterms_2024".parse::<Selector>().unwrap(), Selector::Id("incoterms_2024".into()));
        assert_eq!(
            "match:diploma.*supply.*chain".parse::<Selector>().unwrap(),
            Selector::TitleRegex("diploma.*supply.*chain".into())
        );
        assert_eq!("all".parse::<Selector>().unwrap(), Selector::All);
    }

    #[test]
    fn bare_text_is_an_exact_title() {
        let sel: Selector = "Motivation - Power Guide to motivating yourself and others".parse().unwrap();
        assert_eq!(
            sel.to_filter(),
            doc! { "title": "Motivation - Power Guide to motivating yourself and others" }
        );
    }

    #[test]
    fn unknown_prefix_is_part_of_the_title() {
        let sel: Selector = "Human Resources: Discipline and Termination".parse().unwrap();
        assert_eq!(sel, Selector::Title("Human Resources: Discipline and Termination".into()));
    }

    #[test]
    fn contains_is_escaped_and_case_insensitive() {
        let sel: Selector = "contains:Incoterms (2020)".parse().unwrap();
        assert_eq!(
            sel.to_filter(),
            doc! { "title": { "$regex": r"Incoterms \(2020\)", "$options": "i" } }
        );
    }

    #[test]
    fn rejects_empty_and_invalid_selectors() {
        assert!("".parse::<Selector>().is_err());
        assert!("code:".parse::<Selector>().is_err());
        assert!("match:(unclosed".parse::<Selector>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for raw in ["code:LPHR1", "match:pump", "email:a@b.c", "employee:EMP-TEST-01"] {
            let sel: Selector = raw.parse().unwrap();
            assert_eq!(sel.to_string(), raw);
        }
    }

    #[test]
    fn id_that_looks_like_an_object_id_also_matches_underscore_id() {
        let hex = "6ad2ab5feef6791f00cc697b";
        let sel: Selector = format!("id:{}", hex).parse().unwrap();
        let oid = ObjectId::parse_str(hex).unwrap();
        assert_eq!(sel.to_filter(), doc! { "$or": [ { "id": hex }, { "_id": oid } ] });

        let uuid: Selector = "id:0b7c9e52-3f44-4c1a-9a57-0f3d2a1c5e10".parse().unwrap();
        assert_eq!(uuid.to_filter(), doc! { "id": "0b7c9e52-3f44-4c1a-9a57-0f3d2a1c5e10" });
    }

    #[test]
    fn order_selector() {
        let sel: Selector = "order:3".parse().unwrap();
        assert_eq!(sel, Selector::Order(3));
        assert_eq!(sel.to_filter(), doc! { "order": 3_i64 });
        assert_eq!(sel.to_string(), "order:3");
        assert!("order:third".parse::<Selector>().is_err());
    }

    #[test]
    fn in_memory_matching() {
        let title = "Supply Chain Networks";
        assert!(Selector::Title(title.into()).matches(None, title, None));
        assert!(!Selector::Title("Supply Chain".into()).matches(None, title, None));
        assert!(Selector::TitleRegex("supply.*networks".into()).matches(None, title, None));
        assert!(Selector::TitleContains("CHAIN NET".into()).matches(None, title, None));
        assert!(Selector::Order(2).matches(None, title, Some(2)));
        assert!(!Selector::Order(2).matches(None, title, None));
        assert!(Selector::Id("l1".into()).matches(Some("l1"), title, None));
        assert!(!Selector::Code("SC-1".into()).matches(Some("SC-1"), title, None));
        assert!(Selector::All.matches(None, "", None));
    }

    #[test]
    fn exactly_one_reports_counts() {
        let sel = Selector::Title("Valves".into());
        assert!(matches!(
            exactly_one(Vec::<u8>::new(), "course", &sel),
            Err(MaintError::NotFound { entity: "course", .. })
        ));
        assert!(matches!(
            exactly_one(vec![1, 2], "course", &sel),
            Err(MaintError::Ambiguous { count: 2, .. })
        ));
        assert_eq!(exactly_one(vec![7], "course", &sel).unwrap(), 7);
    }

    #[test]
    fn scope_filter_covers_course_and_modules() {
        let filter = course_scope_filter("c1", &["m1".to_string()]);
        assert_eq!(
            filter,
            doc! { "$or": [ { "course_id": "c1" }, { "module_id": { "$in": ["m1"] } } ] }
        );
    }
}
