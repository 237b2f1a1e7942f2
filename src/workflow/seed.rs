use bson::Bson;
use mongodb::Database;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::{Validate, ValidationError};

use crate::content::quiz_bank;
use crate::error::Result;
use crate::modules::course::crud::{CourseCrud, COLLECTION_NAME as COURSES};
use crate::modules::course::model::{canonical_category, Course};
use crate::modules::lesson::crud::{LessonCrud, COLLECTION_NAME as LESSONS};
use crate::modules::lesson::model::Lesson;
use crate::modules::module::crud::{ModuleCrud, COLLECTION_NAME as MODULES};
use crate::modules::module::model::Module;
use crate::modules::quiz::crud::{QuizCrud, COLLECTION_NAME as QUIZZES};
use crate::modules::quiz::model::{Question, Quiz};
use crate::workflow::report::{Action, Report};

/// Where seeded lessons are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonLayout {
    #[default]
    Collection,
    Embedded,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SeedPlan {
    #[validate(length(min = 1, message = "Plan has no courses"))]
    #[validate(nested)]
    pub courses: Vec<CourseSeed>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "check_quiz_choice"))]
pub struct CourseSeed {
    #[validate(length(min = 1, message = "Course title cannot be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "Course code cannot be empty"))]
    pub code: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub course_type: Option<String>,
    pub duration: Option<String>,
    pub level: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    pub layout: LessonLayout,
    #[serde(default)]
    #[validate(nested)]
    pub modules: Vec<ModuleSeed>,
    #[validate(nested)]
    pub quiz: Option<QuizSeed>,
    #[serde(default)]
    pub default_quiz: bool,
}

fn default_published() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ModuleSeed {
    #[validate(length(min = 1, message = "Module title cannot be empty"))]
    pub title: String,
    pub description: Option<String>,
    pub order: Option<i64>,
    #[serde(default)]
    #[validate(nested)]
    pub lessons: Vec<LessonSeed>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LessonSeed {
    #[validate(length(min = 1, message = "Lesson title cannot be empty"))]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub content_type: Option<String>,
    pub duration_minutes: Option<i64>,
    pub order: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct QuizSeed {
    #[validate(length(min = 1, message = "Quiz title cannot be empty"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 100, message = "Passing score must be between 0 and 100"))]
    pub passing_score: Option<i64>,
    pub time_limit_minutes: Option<i64>,
    #[validate(length(min = 1, message = "Quiz needs at least one question"))]
    #[validate(nested)]
    pub questions: Vec<QuestionSeed>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "check_answer"))]
pub struct QuestionSeed {
    #[validate(length(min = 1, message = "Question text cannot be empty"))]
    pub question: String,
    pub question_type: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    pub points: Option<i64>,
}

fn check_answer(q: &QuestionSeed) -> std::result::Result<(), ValidationError> {
    if !q.options.is_empty() && !q.options.contains(&q.correct_answer) {
        let mut err = ValidationError::new("answer_not_an_option");
        err.message = Some(format!("{:?} is not one of the options of {:?}", q.correct_answer, q.question).into());
        return Err(err);
    }
    Ok(())
}

fn check_quiz_choice(course: &CourseSeed) -> std::result::Result<(), ValidationError> {
    if course.quiz.is_some() && course.default_quiz {
        let mut err = ValidationError::new("two_quizzes");
        err.message = Some(format!("{}: give either quiz or default_quiz, not both", course.code).into());
        return Err(err);
    }
    if (course.quiz.is_some() || course.default_quiz) && course.modules.is_empty() {
        let mut err = ValidationError::new("quiz_without_module");
        err.message = Some(format!("{}: a quiz needs at least one module", course.code).into());
        return Err(err);
    }
    Ok(())
}

impl SeedPlan {
    pub fn parse(json: &str) -> Result<Self> {
        let plan: SeedPlan = serde_json::from_str(json)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::parse(&json)
    }
}

/// Reads a JSON file into `T`. Callers validate.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// The documents one course seed turns into.
#[derive(Debug, Clone)]
pub struct SeedDocuments {
    pub course: Course,
    pub modules: Vec<Module>,
    /// Collection-layout lessons; empty when lessons are embedded.
    pub lessons: Vec<Lesson>,
    pub quiz: Option<Quiz>,
}

impl SeedDocuments {
    pub fn lesson_count(&self) -> usize {
        self.lessons.len()
            + self
                .modules
                .iter()
                .map(|m| m.embedded_lessons().len())
                .sum::<usize>()
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A fresh lesson document. `default_order` applies when the seed has none.
pub fn build_lesson(seed: &LessonSeed, module_id: &str, course_id: &str, default_order: i64) -> Lesson {
    Lesson {
        id: Some(new_id()),
        module_id: Some(module_id.to_string()),
        course_id: Some(course_id.to_string()),
        title: seed.title.clone(),
        content: seed.content.clone(),
        content_type: Some(seed.content_type.clone().unwrap_or_else(|| "text".to_string())),
        order: Some(seed.order.unwrap_or(default_order)),
        duration_minutes: seed.duration_minutes,
        ..Lesson::default()
    }
}

pub fn build_questions(seeds: &[QuestionSeed]) -> Vec<Question> {
    seeds
        .iter()
        .enumerate()
        .map(|(i, q)| Question {
            question: q.question.clone(),
            question_type: q.question_type.clone(),
            options: q.options.clone(),
            correct_answer: Some(q.correct_answer.clone()),
            points: Some(q.points.unwrap_or(1)),
            order: Some(i as i64),
        })
        .collect()
}

/// Builds fresh documents for a course seed. No database access.
pub fn build(seed: &CourseSeed) -> SeedDocuments {
    let course_id = new_id();
    let now = Bson::DateTime(bson::DateTime::now());
    let category = seed.category.as_deref().map(canonical_category);

    let course = Course {
        id: Some(course_id.clone()),
        title: seed.title.clone(),
        code: Some(seed.code.clone()),
        description: seed.description.clone(),
        category: category.clone(),
        course_type: seed.course_type.clone(),
        is_published: Some(seed.published),
        published: Some(seed.published),
        thumbnail: seed.thumbnail.clone(),
        duration: seed.duration.clone(),
        level: seed.level.clone(),
        created_at: Some(now.clone()),
        updated_at: Some(now),
        ..Course::default()
    };

    let mut modules = Vec::with_capacity(seed.modules.len());
    let mut lessons = Vec::new();
    for (m_index, module_seed) in seed.modules.iter().enumerate() {
        let module_id = new_id();
        let module_lessons: Vec<Lesson> = module_seed
            .lessons
            .iter()
            .enumerate()
            .map(|(l_index, l)| build_lesson(l, &module_id, &course_id, l_index as i64 + 1))
            .collect();

        let embedded = match seed.layout {
            LessonLayout::Collection => {
                lessons.extend(module_lessons);
                None
            }
            LessonLayout::Embedded => Some(module_lessons),
        };

        modules.push(Module {
            id: Some(module_id),
            course_id: Some(course_id.clone()),
            title: module_seed.title.clone(),
            description: module_seed.description.clone(),
            order: Some(module_seed.order.unwrap_or(m_index as i64 + 1)),
            lessons: embedded,
            ..Module::default()
        });
    }

    let first_module = modules.first().and_then(|m| m.id.clone());
    let quiz = match (&seed.quiz, first_module) {
        (Some(q), module_id) => Some(Quiz {
            id: Some(new_id()),
            course_id: Some(course_id.clone()),
            module_id,
            title: q.title.clone(),
            description: q.description.clone(),
            passing_score: Some(q.passing_score.unwrap_or(quiz_bank::PASSING_SCORE)),
            time_limit_minutes: Some(q.time_limit_minutes.unwrap_or(quiz_bank::TIME_LIMIT_MINUTES)),
            questions: build_questions(&q.questions),
            created_at: Some(Bson::DateTime(bson::DateTime::now())),
            ..Quiz::default()
        }),
        (None, Some(module_id)) if seed.default_quiz => Some(quiz_bank::default_quiz(
            &seed.title,
            category.as_deref().unwrap_or("General"),
            &course_id,
            &module_id,
        )),
        _ => None,
    };

    SeedDocuments {
        course,
        modules,
        lessons,
        quiz,
    }
}

/// Inserts every course of the plan whose code is not already present.
pub async fn seed(db: &Database, plan: &SeedPlan, dry_run: bool) -> Result<Report> {
    plan.validate()?;
    let mut report = Report::new(format!("Seed {} courses", plan.courses.len()), dry_run);

    let courses = CourseCrud::new(db);
    let modules = ModuleCrud::new(db);
    let lessons = LessonCrud::new(db);
    let quizzes = QuizCrud::new(db);

    for course_seed in &plan.courses {
        if courses.exists_code(&course_seed.code).await? {
            report.record_detail(Action::Skipped, COURSES, 1, format!("code {} already exists", course_seed.code));
            continue;
        }

        let docs = build(course_seed);
        if !dry_run {
            courses.create(&docs.course).await?;
            for module in &docs.modules {
                modules.create(module).await?;
            }
            lessons.create_many(&docs.lessons).await?;
            if let Some(quiz) = &docs.quiz {
                quizzes.create(quiz).await?;
            }
        }

        report.record_detail(Action::Inserted, COURSES, 1, docs.course.title.clone());
        report.record(Action::Inserted, MODULES, docs.modules.len() as u64);
        report.record(Action::Inserted, LESSONS, docs.lesson_count() as u64);
        if docs.quiz.is_some() {
            report.record(Action::Inserted, QUIZZES, 1);
        }
    }
    Ok(report)
}
