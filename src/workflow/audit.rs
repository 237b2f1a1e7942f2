use bson::{doc, Bson};
use mongodb::Database;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::Result;
use crate::modules::course::crud::COLLECTION_NAME as COURSES;
use crate::modules::course::model::canonical_category;
use crate::modules::lesson::crud::COLLECTION_NAME as LESSONS;
use crate::modules::module::crud::COLLECTION_NAME as MODULES;
use crate::modules::progress::crud::COLLECTION_NAME as PROGRESS;
use crate::modules::quiz::crud::COLLECTION_NAME as QUIZZES;
use crate::modules::{lenient, Keyed};

/// Just the linkage fields of a document.
#[derive(Debug, Clone, Deserialize)]
pub struct Row {
    #[serde(rename = "_id")]
    pub oid: Bson,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub course_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub module_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub category: Option<String>,
}

impl Keyed for Row {
    fn app_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn object_id(&self) -> Option<&Bson> {
        Some(&self.oid)
    }
}

#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub courses: Vec<Row>,
    pub modules: Vec<Row>,
    pub lessons: Vec<Row>,
    pub quizzes: Vec<Row>,
    pub progress: Vec<Row>,
}

impl Snapshot {
    pub async fn load(db: &Database) -> Result<Self> {
        Ok(Self {
            courses: load_rows(db, COURSES).await?,
            modules: load_rows(db, MODULES).await?,
            lessons: load_rows(db, LESSONS).await?,
            quizzes: load_rows(db, QUIZZES).await?,
            progress: load_rows(db, PROGRESS).await?,
        })
    }
}

async fn load_rows(db: &Database, collection: &str) -> Result<Vec<Row>> {
    use futures::TryStreamExt;

    let cursor = db
        .collection::<Row>(collection)
        .find(doc! {})
        .projection(doc! {
            "_id": 1, "id": 1, "course_id": 1, "module_id": 1, "title": 1, "category": 1
        })
        .await?;
    Ok(cursor.try_collect().await?)
}

#[derive(Debug, Clone, Serialize)]
pub struct Orphan {
    #[serde(skip)]
    pub oid: Bson,
    pub reference: String,
    pub title: String,
    pub parent: String,
}

impl Orphan {
    fn from_row(row: &Row, parent: Option<&str>) -> Self {
        Self {
            oid: row.oid.clone(),
            reference: row.reference().unwrap_or_default(),
            title: row.title.clone(),
            parent: parent.unwrap_or("<none>").to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct AuditFindings {
    pub orphan_modules: Vec<Orphan>,
    pub orphan_lessons: Vec<Orphan>,
    pub orphan_quizzes: Vec<Orphan>,
    pub orphan_progress: Vec<Orphan>,
    pub courses_without_modules: Vec<String>,
    pub quizzes_without_module: Vec<String>,
    pub duplicate_titles: Vec<(String, usize)>,
    pub noncanonical_categories: Vec<(String, String)>,
}

impl AuditFindings {
    pub fn orphan_count(&self) -> usize {
        self.orphan_modules.len()
            + self.orphan_lessons.len()
            + self.orphan_quizzes.len()
            + self.orphan_progress.len()
    }

    pub fn is_clean(&self) -> bool {
        self.orphan_count() == 0
            && self.courses_without_modules.is_empty()
            && self.quizzes_without_module.is_empty()
            && self.duplicate_titles.is_empty()
            && self.noncanonical_categories.is_empty()
    }
}

fn points_into(value: Option<&str>, refs: &HashSet<String>) -> bool {
    value.is_some_and(|v| refs.contains(v))
}

/// Referential integrity checks over a snapshot; no database access.
pub fn audit(snapshot: &Snapshot) -> AuditFindings {
    let mut findings = AuditFindings::default();

    let course_refs: HashSet<String> = snapshot.courses.iter().filter_map(|c| c.reference()).collect();

    let mut module_refs = HashSet::new();
    let mut courses_with_modules = HashSet::new();
    for module in &snapshot.modules {
        if points_into(module.course_id.as_deref(), &course_refs) {
            if let Some(r) = module.reference() {
                module_refs.insert(r);
            }
            if let Some(c) = &module.course_id {
                courses_with_modules.insert(c.clone());
            }
        } else {
            findings
                .orphan_modules
                .push(Orphan::from_row(module, module.course_id.as_deref()));
        }
    }

    let attached = |row: &Row| {
        points_into(row.module_id.as_deref(), &module_refs)
            || points_into(row.course_id.as_deref(), &course_refs)
    };
    let parent = |row: &Row| row.module_id.clone().or_else(|| row.course_id.clone());

    for lesson in &snapshot.lessons {
        if !attached(lesson) {
            findings
                .orphan_lessons
                .push(Orphan::from_row(lesson, parent(lesson).as_deref()));
        }
    }

    for quiz in &snapshot.quizzes {
        if !attached(quiz) {
            findings
                .orphan_quizzes
                .push(Orphan::from_row(quiz, parent(quiz).as_deref()));
        } else if quiz.module_id.as_deref().map_or(true, str::is_empty) {
            findings.quizzes_without_module.push(quiz.title.clone());
        }
    }

    for progress in &snapshot.progress {
        if !points_into(progress.course_id.as_deref(), &course_refs) {
            findings
                .orphan_progress
                .push(Orphan::from_row(progress, progress.course_id.as_deref()));
        }
    }

    let mut titles: BTreeMap<&str, usize> = BTreeMap::new();
    let mut categories = BTreeMap::new();
    for course in &snapshot.courses {
        if !course.reference().is_some_and(|r| courses_with_modules.contains(&r)) {
            findings.courses_without_modules.push(course.title.clone());
        }
        *titles.entry(course.title.as_str()).or_default() += 1;
        if let Some(category) = &course.category {
            let canonical = canonical_category(category);
            if &canonical != category {
                categories.insert(category.clone(), canonical);
            }
        }
    }

    findings.duplicate_titles = titles
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(t, n)| (t.to_string(), n))
        .collect();
    findings.noncanonical_categories = categories.into_iter().collect();
    findings
}

impl fmt::Display for AuditFindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return writeln!(f, "No integrity problems found");
        }

        let orphans = [
            ("modules", &self.orphan_modules),
            ("lessons", &self.orphan_lessons),
            ("quizzes", &self.orphan_quizzes),
            ("progress records", &self.orphan_progress),
        ];
        for (label, list) in orphans {
            if list.is_empty() {
                continue;
            }
            writeln!(f, "Orphan {} ({}):", label, list.len())?;
            for o in list {
                writeln!(f, "  - {} {:?} -> missing {}", o.reference, o.title, o.parent)?;
            }
        }

        if !self.courses_without_modules.is_empty() {
            writeln!(f, "Courses without modules ({}):", self.courses_without_modules.len())?;
            for title in &self.courses_without_modules {
                writeln!(f, "  - {}", title)?;
            }
        }
        if !self.quizzes_without_module.is_empty() {
            writeln!(f, "Quizzes without module_id ({}):", self.quizzes_without_module.len())?;
            for title in &self.quizzes_without_module {
                writeln!(f, "  - {}", title)?;
            }
        }
        if !self.duplicate_titles.is_empty() {
            writeln!(f, "Duplicate course titles:")?;
            for (title, n) in &self.duplicate_titles {
                writeln!(f, "  - {} (x{})", title, n)?;
            }
        }
        if !self.noncanonical_categories.is_empty() {
            writeln!(f, "Non-canonical categories:")?;
            for (raw, canonical) in &self.noncanonical_categories {
                writeln!(f, "  - {:?} should be {:?}", raw, canonical)?;
            }
        }
        Ok(())
    }
}
