use bson::{doc, Bson, Document};
use mongodb::Database;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use validator::Validate;

use crate::content::{quiz_bank, replace_literal, slides};
use crate::error::{MaintError, Result};
use crate::modules::course::crud::{CourseCrud, COLLECTION_NAME as COURSES};
use crate::modules::course::model::{canonical_category, Course};
use crate::modules::lesson::crud::{LessonCrud, COLLECTION_NAME as LESSONS};
use crate::modules::lesson::model::{Lesson, PlacedLesson, Placement};
use crate::modules::module::crud::{ModuleCrud, COLLECTION_NAME as MODULES};
use crate::modules::module::model::Module;
use crate::modules::progress::crud::{ProgressCrud, CERTIFICATES, COLLECTION_NAME as PROGRESS};
use crate::modules::progress::model::Progress;
use crate::modules::quiz::crud::{QuizCrud, COLLECTION_NAME as QUIZZES};
use crate::modules::user::crud::COLLECTION_NAME as USERS;
use crate::modules::user::model::User;
use crate::modules::Keyed;
use crate::workflow::audit::AuditFindings;
use crate::workflow::locator::{course_scope_filter, Locator, Selector};
use crate::workflow::report::{Action, Report};
use crate::workflow::seed::{self, LessonSeed, QuizSeed};

/// Module title used when lessons are added to a course without modules.
pub const DEFAULT_MODULE_TITLE: &str = "Course Content";

/// Which of a course's ordered lessons to remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimMode {
    KeepFirst(usize),
    DropLast(usize),
}

impl TrimMode {
    pub fn victims(&self, len: usize) -> Range<usize> {
        match *self {
            TrimMode::KeepFirst(n) => n.min(len)..len,
            TrimMode::DropLast(n) => len.saturating_sub(n)..len,
        }
    }
}

/// Parses `key=value` into a `$set` pair. `true`/`false`, `null` and
/// numbers are typed; everything else stays a string.
pub fn parse_assignment(raw: &str) -> Result<(String, Bson)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| MaintError::InvalidArgument(format!("expected key=value, got {:?}", raw)))?;
    let key = key.trim();

    if key.is_empty() || key.starts_with('$') || key == "_id" || key == "id" {
        return Err(MaintError::InvalidArgument(format!("field {:?} cannot be set", key)));
    }

    let value = match value {
        "true" => Bson::Boolean(true),
        "false" => Bson::Boolean(false),
        "null" => Bson::Null,
        v => match v.parse::<i64>() {
            Ok(n) => Bson::Int64(n),
            Err(_) => match v.parse::<f64>() {
                Ok(f) if v.contains('.') => Bson::Double(f),
                _ => Bson::String(v.to_string()),
            },
        },
    };
    Ok((key.to_string(), value))
}

fn required_ref<T: Keyed>(item: &T, what: &str) -> Result<String> {
    item.reference()
        .ok_or_else(|| MaintError::InvalidArgument(format!("{} has neither id nor _id", what)))
}

/// Names one lesson: its course, optionally its module heading, and the
/// lesson itself.
#[derive(Debug, Clone)]
pub struct LessonPath {
    pub course: Selector,
    pub module: Option<Selector>,
    pub lesson: Selector,
}

/// The document and array that hold an embedded lesson.
#[derive(Debug, Clone, PartialEq)]
struct ArrayOwner {
    collection: &'static str,
    key: Document,
    path: String,
}

fn array_owner(placement: &Placement) -> Option<(ArrayOwner, usize)> {
    let (path, index) = placement.array_path()?;
    let (collection, key) = match placement {
        Placement::Embedded { module, .. } => (MODULES, module.clone()),
        Placement::CourseEmbedded { course, .. } => (COURSES, course.clone()),
        Placement::Collection => return None,
    };
    Some((ArrayOwner { collection, key, path }, index))
}

/// Follows a dotted path (`modules.2.lessons`) to an array in a raw document.
fn array_at<'d>(raw: &'d Document, path: &str) -> Option<&'d Vec<Bson>> {
    let mut parts = path.split('.');
    let mut node = raw.get(parts.next()?)?;
    for part in parts {
        node = match node {
            Bson::Document(inner) => inner.get(part)?,
            Bson::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    node.as_array()
}

/// Lesson arrays of a raw module (`lessons`) or course
/// (`modules.N.lessons`) document, with their paths.
fn lesson_arrays(raw: &Document) -> Vec<(String, &Vec<Bson>)> {
    let mut arrays = Vec::new();
    if let Ok(lessons) = raw.get_array("lessons") {
        arrays.push(("lessons".to_string(), lessons));
    }
    if let Ok(modules) = raw.get_array("modules") {
        for (m, module) in modules.iter().enumerate() {
            if let Some(lessons) = module.as_document().and_then(|d| d.get_array("lessons").ok()) {
                arrays.push((format!("modules.{}.lessons", m), lessons));
            }
        }
    }
    arrays
}

/// Adds a `$set` entry for every lesson in the array whose content
/// contains `from`.
fn content_rewrites(lessons: &[Bson], path: &str, from: &str, to: &str, set: &mut Document) {
    for (index, lesson) in lessons.iter().enumerate() {
        let content = lesson
            .as_document()
            .and_then(|d| d.get_str("content").ok())
            .and_then(|c| replace_literal(c, from, to));
        if let Some(content) = content {
            set.insert(format!("{}.{}.content", path, index), content);
        }
    }
}

/// Applies writes to located documents. In dry-run mode every write is
/// replaced by a count of what it would touch.
pub struct Mutator<'a> {
    db: &'a Database,
    dry_run: bool,
}

impl<'a> Mutator<'a> {
    pub fn new(db: &'a Database, dry_run: bool) -> Self {
        Self { db, dry_run }
    }

    fn locator(&self) -> Locator<'a> {
        Locator::new(self.db)
    }

    async fn purge(&self, collection: &str, filter: Document) -> Result<u64> {
        let coll = self.db.collection::<Document>(collection);
        if self.dry_run {
            return Ok(coll.count_documents(filter).await?);
        }
        Ok(coll.delete_many(filter).await?.deleted_count)
    }

    async fn apply(&self, collection: &str, filter: Document, update: Document, many: bool) -> Result<u64> {
        let coll = self.db.collection::<Document>(collection);
        if self.dry_run {
            let matched = coll.count_documents(filter).await?;
            return Ok(if many { matched } else { matched.min(1) });
        }
        let result = if many {
            coll.update_many(filter, update).await?
        } else {
            coll.update_one(filter, update).await?
        };
        Ok(result.modified_count)
    }

    pub async fn set_course_fields(&self, selector: &Selector, fields: Document, many: bool) -> Result<Report> {
        if fields.is_empty() {
            return Err(MaintError::InvalidArgument("no fields to set".to_string()));
        }

        let mut report = Report::new(format!("Set course fields on {}", selector), self.dry_run);
        let filter = if many {
            selector.to_filter()
        } else {
            self.locator().course(selector).await?.key_filter()
        };

        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        let detail = keys.join(", ");
        let updated = self.apply(COURSES, filter, doc! { "$set": fields }, many).await?;
        report.record_detail(Action::Updated, COURSES, updated, detail);
        Ok(report)
    }

    pub async fn rename_course(&self, selector: &Selector, new_title: &str) -> Result<Report> {
        let course = self.locator().course(selector).await?;
        let mut report = Report::new(format!("Rename {:?}", course.title), self.dry_run);

        let updated = self
            .apply(COURSES, course.key_filter(), doc! { "$set": { "title": new_title } }, false)
            .await?;
        report.record_detail(Action::Updated, COURSES, updated, format!("{} -> {}", course.title, new_title));
        Ok(report)
    }

    /// Writes both publication flags so old and new readers agree.
    pub async fn publish(&self, selector: &Selector, published: bool) -> Result<Report> {
        let verb = if published { "Publish" } else { "Unpublish" };
        let mut report = Report::new(format!("{} {}", verb, selector), self.dry_run);

        let updated = self
            .apply(
                COURSES,
                selector.to_filter(),
                doc! { "$set": { "is_published": published, "published": published } },
                true,
            )
            .await?;
        report.record(Action::Updated, COURSES, updated);
        Ok(report)
    }

    pub async fn recategorize(&self, from: &str, to: &str) -> Result<Report> {
        let mut report = Report::new(format!("Recategorize {:?} -> {:?}", from, to), self.dry_run);
        let updated = self
            .apply(COURSES, doc! { "category": from }, doc! { "$set": { "category": to } }, true)
            .await?;
        report.record(Action::Updated, COURSES, updated);
        Ok(report)
    }

    pub async fn normalize_categories(&self) -> Result<Report> {
        let mut report = Report::new("Normalize categories", self.dry_run);

        for raw in CourseCrud::new(self.db).categories().await? {
            let canonical = canonical_category(&raw);
            if canonical == raw || canonical.is_empty() {
                continue;
            }
            let updated = self
                .apply(
                    COURSES,
                    doc! { "category": raw.as_str() },
                    doc! { "$set": { "category": canonical.as_str() } },
                    true,
                )
                .await?;
            report.record_detail(Action::Updated, COURSES, updated, format!("{:?} -> {:?}", raw, canonical));
        }

        if report.entries.is_empty() {
            report.note("all categories already canonical");
        }
        Ok(report)
    }

    pub async fn delete_course(&self, course: &Course) -> Result<Report> {
        let mut report = Report::new(format!("Delete course {:?}", course.title), self.dry_run);
        self.cascade(course, &mut report).await?;
        Ok(report)
    }

    /// Removes a course and everything that references it.
    async fn cascade(&self, course: &Course, report: &mut Report) -> Result<()> {
        let course_ref = required_ref(course, "course")?;
        let modules = self.locator().modules(course).await?;
        let module_refs: Vec<String> = modules.iter().filter_map(|m| m.reference()).collect();
        let scope = course_scope_filter(&course_ref, &module_refs);

        let lessons = self.purge(LESSONS, scope.clone()).await?;
        report.record(Action::Deleted, LESSONS, lessons);

        let quizzes = self.purge(QUIZZES, scope).await?;
        report.record(Action::Deleted, QUIZZES, quizzes);

        let modules_deleted = self.purge(MODULES, doc! { "course_id": course_ref.as_str() }).await?;
        report.record(Action::Deleted, MODULES, modules_deleted);

        let progress = self.purge(PROGRESS, doc! { "course_id": course_ref.as_str() }).await?;
        report.record(Action::Deleted, PROGRESS, progress);

        let certificates = self.purge(CERTIFICATES, doc! { "course_id": course_ref.as_str() }).await?;
        report.record(Action::Deleted, CERTIFICATES, certificates);

        let courses = self.purge(COURSES, course.key_filter()).await?;
        report.record_detail(Action::Deleted, COURSES, courses, course.title.clone());

        let users = self
            .apply(
                USERS,
                doc! { "$or": [
                    { "enrolled_courses": course_ref.as_str() },
                    { "completed_courses": course_ref.as_str() }
                ] },
                doc! { "$pull": {
                    "enrolled_courses": course_ref.as_str(),
                    "completed_courses": course_ref.as_str()
                } },
                true,
            )
            .await?;
        report.record(Action::Updated, USERS, users);
        Ok(())
    }

    /// Deletes every course whose type is not `keep_type`.
    pub async fn prune_courses(&self, keep_type: &str) -> Result<Report> {
        let mut report = Report::new(format!("Keep only {:?} courses", keep_type), self.dry_run);
        let doomed = CourseCrud::new(self.db)
            .find(doc! {
                "course_type": { "$ne": keep_type },
                "type": { "$ne": keep_type }
            })
            .await?;

        for course in &doomed {
            self.cascade(course, &mut report).await?;
        }

        let remaining = CourseCrud::new(self.db).count(doc! {}).await?;
        let remaining = if self.dry_run {
            remaining.saturating_sub(doomed.len() as u64)
        } else {
            remaining
        };
        report.note(format!("{} courses remain", remaining));
        Ok(report)
    }

    /// Keeps the copy with the most lessons among courses sharing a title.
    pub async fn dedupe_courses(&self, title: &str) -> Result<Report> {
        let mut report = Report::new(format!("Dedupe {:?}", title), self.dry_run);
        let copies = self.locator().courses(&Selector::Title(title.to_string())).await?;
        report.record(Action::Found, COURSES, copies.len() as u64);

        if copies.len() < 2 {
            report.note("no duplicates");
            return Ok(report);
        }

        let mut ranked = Vec::with_capacity(copies.len());
        for course in copies {
            let lessons = self.locator().course_lessons(&course).await?.len();
            ranked.push((lessons, course));
        }
        ranked.sort_by(|(a_count, a), (b_count, b)| {
            b_count
                .cmp(a_count)
                .then_with(|| a.reference().cmp(&b.reference()))
        });

        let (kept_lessons, kept) = ranked.remove(0);
        report.note(format!(
            "keeping {} with {} lessons",
            kept.reference().unwrap_or_default(),
            kept_lessons
        ));
        for (_, course) in &ranked {
            self.cascade(course, &mut report).await?;
        }
        Ok(report)
    }

    pub async fn trim_lessons(&self, selector: &Selector, mode: TrimMode) -> Result<Report> {
        let course = self.locator().course(selector).await?;
        let mut report = Report::new(format!("Trim lessons of {:?}", course.title), self.dry_run);

        let lessons = self.locator().course_lessons(&course).await?;
        let victims = &lessons[mode.victims(lessons.len())];

        let stored: Vec<Document> = victims
            .iter()
            .filter(|p| matches!(p.placement, Placement::Collection))
            .map(|p| p.lesson.key_filter())
            .collect();
        if !stored.is_empty() {
            let deleted = self.purge(LESSONS, doc! { "$or": stored }).await?;
            report.record(Action::Deleted, LESSONS, deleted);
        }

        let mut embedded: BTreeMap<String, (ArrayOwner, BTreeSet<usize>)> = BTreeMap::new();
        for placed in victims {
            if let Some((owner, index)) = array_owner(&placed.placement) {
                embedded
                    .entry(format!("{}:{}:{}", owner.collection, owner.key, owner.path))
                    .or_insert_with(|| (owner, BTreeSet::new()))
                    .1
                    .insert(index);
            }
        }
        for (owner, indices) in embedded.into_values() {
            let removed = self.remove_from_array(&owner, &indices).await?;
            report.record_detail(Action::Deleted, LESSONS, removed, format!("embedded in {}", owner.collection));
        }

        for placed in victims {
            tracing::debug!(title = %placed.lesson.title, placement = placed.placement.label(), "trimmed lesson");
        }
        report.note(format!("{} -> {} lessons", lessons.len(), lessons.len() - victims.len()));
        Ok(report)
    }

    /// Rewrites an embedded lesson array without the given indices.
    /// The raw array is edited so fields this crate does not model survive.
    async fn remove_from_array(&self, owner: &ArrayOwner, indices: &BTreeSet<usize>) -> Result<u64> {
        if self.dry_run {
            return Ok(indices.len() as u64);
        }

        let coll = self.db.collection::<Document>(owner.collection);
        let Some(raw) = coll.find_one(owner.key.clone()).await? else {
            return Ok(0);
        };
        let Some(current) = array_at(&raw, &owner.path) else {
            return Ok(0);
        };

        let kept: Vec<Bson> = current
            .iter()
            .enumerate()
            .filter(|(i, _)| !indices.contains(i))
            .map(|(_, lesson)| lesson.clone())
            .collect();
        let removed = (current.len() - kept.len()) as u64;

        let mut set = Document::new();
        set.insert(owner.path.clone(), kept);
        coll.update_one(owner.key.clone(), doc! { "$set": set }).await?;
        Ok(removed)
    }

    /// `$set` on one lesson. Embedded lessons are updated in place through
    /// their array position.
    async fn set_lesson_fields(&self, placed: &PlacedLesson, fields: Document) -> Result<u64> {
        match array_owner(&placed.placement) {
            None => {
                self.apply(LESSONS, placed.lesson.key_filter(), doc! { "$set": fields }, false)
                    .await
            }
            Some((owner, index)) => {
                let mut set = Document::new();
                for (field, value) in fields {
                    set.insert(format!("{}.{}.{}", owner.path, index, field), value);
                }
                self.apply(owner.collection, owner.key, doc! { "$set": set }, false).await
            }
        }
    }

    async fn locate_lesson(&self, path: &LessonPath) -> Result<(Course, PlacedLesson)> {
        let course = self.locator().course(&path.course).await?;
        let placed = self
            .locator()
            .lesson(&course, path.module.as_ref(), &path.lesson)
            .await?;
        Ok((course, placed))
    }

    pub async fn update_lesson(&self, path: &LessonPath, fields: Document) -> Result<Report> {
        if fields.is_empty() {
            return Err(MaintError::InvalidArgument("no lesson fields to set".to_string()));
        }
        let (course, placed) = self.locate_lesson(path).await?;
        let mut report = Report::new(
            format!("Update lesson {:?} of {:?}", placed.lesson.title, course.title),
            self.dry_run,
        );

        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        let detail = format!("{} ({})", keys.join(", "), placed.placement.label());
        let updated = self.set_lesson_fields(&placed, fields).await?;
        report.record_detail(Action::Updated, LESSONS, updated, detail);
        Ok(report)
    }

    pub async fn delete_lesson(&self, path: &LessonPath) -> Result<Report> {
        let (course, placed) = self.locate_lesson(path).await?;
        let mut report = Report::new(
            format!("Delete lesson {:?} of {:?}", placed.lesson.title, course.title),
            self.dry_run,
        );

        let deleted = match array_owner(&placed.placement) {
            None => self.purge(LESSONS, placed.lesson.key_filter()).await?,
            Some((owner, index)) => self.remove_from_array(&owner, &BTreeSet::from([index])).await?,
        };
        report.record_detail(Action::Deleted, LESSONS, deleted, placed.placement.label());
        Ok(report)
    }

    /// Appends lessons to one module of a course, numbered after its last
    /// lesson. A course without module documents first gets one, titled by
    /// a `title:` module selector or `Course Content`.
    pub async fn add_lessons(
        &self,
        course: &Selector,
        module: Option<&Selector>,
        seeds: &[LessonSeed],
    ) -> Result<Report> {
        if seeds.is_empty() {
            return Err(MaintError::InvalidArgument("no lessons to add".to_string()));
        }
        for lesson in seeds {
            lesson.validate()?;
        }

        let locator = self.locator();
        let course = locator.course(course).await?;
        let course_ref = required_ref(&course, "course")?;
        let mut report = Report::new(format!("Add lessons to {:?}", course.title), self.dry_run);

        let mut existing = locator.modules(&course).await?;
        let target = if existing.is_empty() {
            let title = match module {
                Some(Selector::Title(title)) => title.clone(),
                _ => DEFAULT_MODULE_TITLE.to_string(),
            };
            let created = Module {
                id: Some(uuid::Uuid::new_v4().to_string()),
                course_id: Some(course_ref.clone()),
                title,
                order: Some(1),
                ..Module::default()
            };
            if !self.dry_run {
                ModuleCrud::new(self.db).create(&created).await?;
            }
            report.record_detail(Action::Inserted, MODULES, 1, created.title.clone());
            created
        } else if let Some(selector) = module {
            locator.module(&course, selector).await?
        } else {
            existing.remove(0)
        };
        let module_ref = required_ref(&target, "module")?;

        let next = locator
            .lessons(&target)
            .await?
            .iter()
            .map(PlacedLesson::order)
            .filter(|order| *order != i64::MAX)
            .max()
            .map_or(1, |last| last + 1);
        let lessons: Vec<Lesson> = seeds
            .iter()
            .enumerate()
            .map(|(i, lesson)| seed::build_lesson(lesson, &module_ref, &course_ref, next + i as i64))
            .collect();

        if target.lessons.is_some() {
            let docs = lessons
                .iter()
                .map(bson::to_bson)
                .collect::<std::result::Result<Vec<Bson>, _>>()?;
            if !self.dry_run {
                self.db
                    .collection::<Document>(MODULES)
                    .update_one(target.key_filter(), doc! { "$push": { "lessons": { "$each": docs } } })
                    .await?;
            }
            report.record_detail(
                Action::Inserted,
                LESSONS,
                lessons.len() as u64,
                format!("embedded in {:?}", target.title),
            );
        } else {
            if !self.dry_run {
                LessonCrud::new(self.db).create_many(&lessons).await?;
            }
            report.record_detail(Action::Inserted, LESSONS, lessons.len() as u64, format!("module {:?}", target.title));
        }
        Ok(report)
    }

    /// Replaces a quiz's title and questions, keeping its id and links.
    pub async fn replace_quiz(&self, course: &Selector, quiz: &Selector, replacement: &QuizSeed) -> Result<Report> {
        replacement.validate()?;
        let course = self.locator().course(course).await?;
        let quiz = self.locator().quiz(&course, quiz).await?;
        let mut report = Report::new(format!("Replace quiz {:?} of {:?}", quiz.title, course.title), self.dry_run);

        let questions = seed::build_questions(&replacement.questions);
        let mut set = doc! {
            "title": replacement.title.as_str(),
            "questions": bson::to_bson(&questions)?
        };
        if let Some(description) = &replacement.description {
            set.insert("description", description.as_str());
        }
        if let Some(score) = replacement.passing_score {
            set.insert("passing_score", score);
        }
        if let Some(minutes) = replacement.time_limit_minutes {
            set.insert("time_limit_minutes", minutes);
        }

        let updated = self
            .apply(QUIZZES, quiz.key_filter(), doc! { "$set": set }, false)
            .await?;
        report.record_detail(Action::Updated, QUIZZES, updated, format!("{} questions", questions.len()));
        Ok(report)
    }

    /// Literal replacement in lesson HTML and course thumbnails, e.g. moving
    /// uploads from a dev host to the production one.
    pub async fn rewrite_urls(&self, from: &str, to: &str) -> Result<Report> {
        if from.is_empty() {
            return Err(MaintError::InvalidArgument("--from must not be empty".to_string()));
        }
        let mut report = Report::new(format!("Rewrite {:?} -> {:?}", from, to), self.dry_run);
        let pattern = regex::escape(from);

        let stored = LessonCrud::new(self.db)
            .find(doc! { "content": { "$regex": pattern.as_str() } })
            .await?;
        let mut lessons_updated = 0;
        for lesson in &stored {
            if let Some(content) = replace_literal(&lesson.content, from, to) {
                lessons_updated += self
                    .apply(LESSONS, lesson.key_filter(), doc! { "$set": { "content": content } }, false)
                    .await?;
            }
        }
        report.record(Action::Updated, LESSONS, lessons_updated);

        let in_modules = self
            .rewrite_embedded(MODULES, doc! { "lessons.content": { "$regex": pattern.as_str() } }, from, to)
            .await?;
        report.record_detail(Action::Updated, LESSONS, in_modules, "embedded in modules");

        let in_courses = self
            .rewrite_embedded(COURSES, doc! { "modules.lessons.content": { "$regex": pattern.as_str() } }, from, to)
            .await?;
        if in_courses > 0 {
            report.record_detail(Action::Updated, LESSONS, in_courses, "embedded in courses");
        }

        let courses = CourseCrud::new(self.db)
            .find(doc! { "thumbnail": { "$regex": pattern.as_str() } })
            .await?;
        let mut thumbnails_updated = 0;
        for course in &courses {
            let rewritten = course
                .thumbnail
                .as_deref()
                .and_then(|t| replace_literal(t, from, to));
            if let Some(thumbnail) = rewritten {
                thumbnails_updated += self
                    .apply(COURSES, course.key_filter(), doc! { "$set": { "thumbnail": thumbnail } }, false)
                    .await?;
            }
        }
        report.record_detail(Action::Updated, COURSES, thumbnails_updated, "thumbnails");
        Ok(report)
    }

    /// Rewrites lesson content inside the embedded arrays of every raw
    /// document `filter` matches. Returns the number of lessons changed.
    async fn rewrite_embedded(&self, collection: &'static str, filter: Document, from: &str, to: &str) -> Result<u64> {
        use futures::TryStreamExt;

        let coll = self.db.collection::<Document>(collection);
        let mut cursor = coll.find(filter).await?;
        let mut updated = 0;
        while let Some(raw) = cursor.try_next().await? {
            let mut set = Document::new();
            for (path, lessons) in lesson_arrays(&raw) {
                content_rewrites(lessons, &path, from, to, &mut set);
            }
            if set.is_empty() {
                continue;
            }
            let Some(id) = raw.get("_id") else {
                continue;
            };
            let count = set.len() as u64;
            if self.apply(collection, doc! { "_id": id.clone() }, doc! { "$set": set }, false).await? > 0 {
                updated += count;
            }
        }
        Ok(updated)
    }

    /// Points every numbered lesson of a course at its slide image.
    pub async fn render_slides(
        &self,
        selector: &Selector,
        image_base: &str,
        extension: &str,
        alt_label: Option<&str>,
    ) -> Result<Report> {
        let course = self.locator().course(selector).await?;
        let mut report = Report::new(format!("Render slides for {:?}", course.title), self.dry_run);
        let alt = alt_label.unwrap_or(&course.title);

        let mut updated = 0;
        let mut unnumbered = 0;
        for placed in self.locator().course_lessons(&course).await? {
            let Some(number) = slides::slide_number(&placed.lesson.title) else {
                unnumbered += 1;
                continue;
            };
            let html = slides::slide_html(image_base, number, extension, alt);
            if html == placed.lesson.content {
                continue;
            }
            updated += self.set_lesson_fields(&placed, doc! { "content": html }).await?;
        }

        report.record(Action::Updated, LESSONS, updated);
        if unnumbered > 0 {
            report.record_detail(Action::Skipped, LESSONS, unnumbered, "title has no slide number");
        }
        Ok(report)
    }

    /// Attaches unlinked quizzes of a course to its first module.
    pub async fn link_quiz(&self, selector: &Selector) -> Result<Report> {
        let course = self.locator().course(selector).await?;
        let course_ref = required_ref(&course, "course")?;
        let mut report = Report::new(format!("Link quizzes of {:?}", course.title), self.dry_run);

        let modules = self.locator().modules(&course).await?;
        let first = modules.first().ok_or_else(|| MaintError::NotFound {
            entity: "module",
            selector: format!("course_id:{}", course_ref),
        })?;
        let module_ref = required_ref(first, "module")?;

        let updated = self
            .apply(
                QUIZZES,
                doc! { "course_id": course_ref.as_str(), "module_id": { "$in": [Bson::Null, ""] } },
                doc! { "$set": { "module_id": module_ref.as_str() } },
                true,
            )
            .await?;
        report.record_detail(Action::Updated, QUIZZES, updated, format!("module {:?}", first.title));
        Ok(report)
    }

    /// Gives every course that has modules but no quiz the stock assessment.
    pub async fn add_missing_quizzes(&self) -> Result<Report> {
        let mut report = Report::new("Add missing quizzes", self.dry_run);
        let quizzes = QuizCrud::new(self.db);

        let mut inserted = 0;
        for course in CourseCrud::new(self.db).find(doc! {}).await? {
            let Some(course_ref) = course.reference() else {
                continue;
            };
            let modules = self.locator().modules(&course).await?;
            let Some(module_ref) = modules.first().and_then(|m| m.reference()) else {
                continue;
            };
            if quizzes.count(doc! { "module_id": module_ref.as_str() }).await? > 0 {
                continue;
            }

            let category = course.category.as_deref().unwrap_or("General");
            let quiz = quiz_bank::default_quiz(&course.title, category, &course_ref, &module_ref);
            if !self.dry_run {
                quizzes.create(&quiz).await?;
            }
            inserted += 1;
            report.note(course.title.clone());
        }

        report.record(Action::Inserted, QUIZZES, inserted);
        Ok(report)
    }

    pub async fn clear_progress(&self, selector: &Selector) -> Result<Report> {
        let course = self.locator().course(selector).await?;
        let course_ref = required_ref(&course, "course")?;
        let mut report = Report::new(format!("Clear progress of {:?}", course.title), self.dry_run);

        let deleted = self.purge(PROGRESS, doc! { "course_id": course_ref.as_str() }).await?;
        report.record(Action::Deleted, PROGRESS, deleted);
        Ok(report)
    }

    /// Enrolls on both sides and restarts the user's progress from zero.
    pub async fn enroll(&self, user: &User, course: &Course) -> Result<Report> {
        let user_ref = required_ref(user, "user")?;
        let course_ref = required_ref(course, "course")?;
        let mut report = Report::new(
            format!("Enroll {} in {:?}", user.label(), course.title),
            self.dry_run,
        );

        let users = self
            .apply(
                USERS,
                user.key_filter(),
                doc! { "$addToSet": { "enrolled_courses": course_ref.as_str() } },
                false,
            )
            .await?;
        report.record(Action::Updated, USERS, users);

        let courses = self
            .apply(
                COURSES,
                course.key_filter(),
                doc! { "$addToSet": { "enrolled_users": user_ref.as_str() } },
                false,
            )
            .await?;
        report.record(Action::Updated, COURSES, courses);

        let stale = self
            .purge(
                PROGRESS,
                doc! { "user_id": user_ref.as_str(), "course_id": course_ref.as_str() },
            )
            .await?;
        report.record(Action::Deleted, PROGRESS, stale);

        if !self.dry_run {
            ProgressCrud::new(self.db)
                .create(&Progress::fresh(user_ref, course_ref))
                .await?;
        }
        report.record(Action::Inserted, PROGRESS, 1);
        Ok(report)
    }

    pub async fn unenroll_all(&self) -> Result<Report> {
        let mut report = Report::new("Unenroll all users", self.dry_run);

        let courses = self
            .apply(COURSES, doc! {}, doc! { "$set": { "enrolled_users": [] } }, true)
            .await?;
        report.record(Action::Updated, COURSES, courses);

        let users = self
            .apply(USERS, doc! {}, doc! { "$set": { "enrolled_courses": [] } }, true)
            .await?;
        report.record(Action::Updated, USERS, users);

        let progress = self.purge(PROGRESS, doc! {}).await?;
        report.record(Action::Deleted, PROGRESS, progress);

        let certificates = self.purge(CERTIFICATES, doc! {}).await?;
        report.record(Action::Deleted, CERTIFICATES, certificates);
        Ok(report)
    }

    /// Deletes the orphans an audit found, by `_id`.
    pub async fn delete_orphans(&self, findings: &AuditFindings) -> Result<Report> {
        let mut report = Report::new("Delete orphans", self.dry_run);

        let groups = [
            (MODULES, &findings.orphan_modules),
            (LESSONS, &findings.orphan_lessons),
            (QUIZZES, &findings.orphan_quizzes),
            (PROGRESS, &findings.orphan_progress),
        ];
        for (collection, orphans) in groups {
            if orphans.is_empty() {
                continue;
            }
            let ids: Vec<Bson> = orphans.iter().map(|o| o.oid.clone()).collect();
            let deleted = self.purge(collection, doc! { "_id": { "$in": ids } }).await?;
            report.record(Action::Deleted, collection, deleted);
        }

        if report.entries.is_empty() {
            report.note("no orphans");
        }
        Ok(report)
    }
}
