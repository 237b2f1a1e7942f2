use bson::{doc, Document};
use mongodb::Database;
use tokio_test::{assert_err, assert_ok};

use lmsctl::config::{database, Settings};
use lmsctl::content::quiz_bank;
use lmsctl::modules::lesson::crud::LessonCrud;
use lmsctl::modules::module::crud::ModuleCrud;
use lmsctl::modules::Keyed;
use lmsctl::workflow::inspect;
use lmsctl::workflow::locator::{Locator, Selector, UNASSIGNED};
use lmsctl::workflow::mutator::{LessonPath, Mutator, TrimMode, DEFAULT_MODULE_TITLE};
use lmsctl::workflow::report::Action;
use lmsctl::workflow::seed::{seed, LessonSeed, QuestionSeed, QuizSeed, SeedPlan};
use lmsctl::MaintError;

const PLAN: &str = r#"{
    "courses": [{
        "title": "Diploma in Supply Chain Management",
        "code": "SCM-DIP-01",
        "category": "supply_chain",
        "modules": [
            {"title": "Course Content", "lessons": [
                {"title": "Supply Chain Networks", "content": "<p>networks</p>"},
                {"title": "Case Study: Zara", "content": "<p>zara</p>"},
                {"title": "Supply Chain Networks - Summary", "content": "<p>summary</p>"}
            ]},
            {"title": "Assessment Prep", "lessons": [
                {"title": "Revision", "content": "<p>revision</p>"}
            ]}
        ],
        "default_quiz": true
    }]
}"#;

const IFRAME: &str = r#"<div style="text-align: center;"><iframe src="https://player.vimeo.com/video/95265089?quality=720p" width="960" height="540"></iframe></div>"#;

async fn setup_test_db() -> Option<Database> {
    dotenvy::dotenv().ok();
    let uri = std::env::var("MONGODB_URI").ok().filter(|u| !u.trim().is_empty())?;

    let settings = Settings {
        mongo_uri: uri,
        database: format!("lmsctl_test_{}", uuid::Uuid::new_v4().simple()),
        api_base_url: String::new(),
    };
    Some(database::connect(&settings).await.expect("MongoDB unreachable"))
}

macro_rules! test_db {
    () => {
        match setup_test_db().await {
            Some(db) => db,
            None => {
                eprintln!("MONGODB_URI not set, skipping");
                return;
            }
        }
    };
}

async fn seed_plan(db: &Database, json: &str) {
    let plan = SeedPlan::parse(json).unwrap();
    assert_ok!(seed(db, &plan, false).await);
}

fn embedded(plan: &str) -> String {
    plan.replace(r#""category": "supply_chain","#, r#""category": "supply_chain", "layout": "embedded","#)
}

fn diploma() -> Selector {
    Selector::TitleRegex("diploma.*supply.*chain".to_string())
}

fn path(module: Option<&str>, lesson: Selector) -> LessonPath {
    LessonPath {
        course: diploma(),
        module: module.map(|m| Selector::Title(m.to_string())),
        lesson,
    }
}

fn lesson_seed(title: &str) -> LessonSeed {
    LessonSeed {
        title: title.to_string(),
        content: format!("<p>{}</p>", title),
        content_type: Some("embed".to_string()),
        duration_minutes: Some(10),
        order: None,
    }
}

/// A course that keeps its modules and lessons inside the course document.
async fn insert_legacy_course(db: &Database) {
    db.collection::<Document>("courses")
        .insert_one(doc! {
            "id": "incoterms-legacy",
            "title": "Introduction to Commercial Terms (Incoterms)",
            "modules": [
                { "title": "Incoterms Presentation", "lessons": [
                    { "title": "Slide 1", "content": "<p>EXW</p>", "speaker_notes": "keep me" },
                    { "title": "Slide 2", "content": "<p>FCA</p>" },
                    { "title": "Slide 3", "content": "<p>CPT</p>" }
                ] }
            ]
        })
        .await
        .unwrap();
}

fn legacy() -> Selector {
    Selector::Id("incoterms-legacy".to_string())
}

#[tokio::test]
async fn test_update_lesson_by_module_and_title() {
    let db = test_db!();
    seed_plan(&db, PLAN).await;

    let report = Mutator::new(&db, false)
        .update_lesson(
            &path(Some("Course Content"), Selector::Title("Supply Chain Networks".to_string())),
            doc! { "content": IFRAME, "content_type": "embed" },
        )
        .await
        .unwrap();
    assert_eq!(report.total(Action::Updated, "lessons"), 1);

    let lessons = LessonCrud::new(&db);
    let updated = lessons.find(doc! { "title": "Supply Chain Networks" }).await.unwrap();
    assert_eq!(updated[0].content, IFRAME);
    assert_eq!(updated[0].content_type.as_deref(), Some("embed"));
    let summary = lessons.find(doc! { "title": "Supply Chain Networks - Summary" }).await.unwrap();
    assert_eq!(summary[0].content, "<p>summary</p>");

    db.drop().await.unwrap();
}

#[tokio::test]
async fn test_update_embedded_lesson_by_order() {
    let db = test_db!();
    seed_plan(&db, &embedded(PLAN)).await;

    let mutator = Mutator::new(&db, false);
    let report = mutator
        .update_lesson(&path(None, Selector::Order(2)), doc! { "content": IFRAME })
        .await
        .unwrap();
    assert_eq!(report.total(Action::Updated, "lessons"), 1);

    let modules = ModuleCrud::new(&db).find(doc! { "title": "Course Content" }).await.unwrap();
    let lessons = modules[0].embedded_lessons();
    assert_eq!(lessons[1].title, "Case Study: Zara");
    assert_eq!(lessons[1].content, IFRAME);
    assert_eq!(lessons[0].content, "<p>networks</p>");

    // order 1 exists in both modules
    let err = mutator
        .update_lesson(&path(None, Selector::Order(1)), doc! { "content": "x" })
        .await
        .unwrap_err();
    assert!(matches!(err, MaintError::Ambiguous { entity: "lesson", count: 2, .. }));

    db.drop().await.unwrap();
}

#[tokio::test]
async fn test_lesson_lookup_errors_name_what_is_missing() {
    let db = test_db!();
    seed_plan(&db, PLAN).await;
    let locator = Locator::new(&db);
    let course = locator.course(&diploma()).await.unwrap();

    let err = assert_err!(
        locator
            .lesson(&course, Some(&Selector::Title("Nope".to_string())), &Selector::All)
            .await
    );
    assert!(matches!(err, MaintError::NotFound { entity: "module", .. }));

    let err = assert_err!(locator.lesson(&course, None, &Selector::Title("Missing".to_string())).await);
    assert!(matches!(err, MaintError::NotFound { entity: "lesson", .. }));

    let found = locator
        .lesson(&course, None, &Selector::TitleRegex("^supply chain networks$".to_string()))
        .await
        .unwrap();
    assert_eq!(found.lesson.order, Some(1));

    let module = locator.module(&course, &Selector::Order(2)).await.unwrap();
    assert_eq!(module.title, "Assessment Prep");

    db.drop().await.unwrap();
}

#[tokio::test]
async fn test_delete_one_lesson_in_each_placement() {
    let db = test_db!();
    seed_plan(&db, PLAN).await;
    let mutator = Mutator::new(&db, false);

    let report = mutator
        .delete_lesson(&path(Some("Course Content"), Selector::Title("Supply Chain Networks".to_string())))
        .await
        .unwrap();
    assert_eq!(report.total(Action::Deleted, "lessons"), 1);
    let lessons = LessonCrud::new(&db);
    assert_eq!(lessons.count(doc! {}).await.unwrap(), 3);
    assert_eq!(lessons.count(doc! { "title": "Supply Chain Networks - Summary" }).await.unwrap(), 1);

    insert_legacy_course(&db).await;
    let report = mutator
        .delete_lesson(&LessonPath {
            course: legacy(),
            module: None,
            lesson: Selector::Title("Slide 2".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(report.total(Action::Deleted, "lessons"), 1);

    let raw = db
        .collection::<Document>("courses")
        .find_one(doc! { "id": "incoterms-legacy" })
        .await
        .unwrap()
        .unwrap();
    let slides = raw.get_array("modules").unwrap()[0]
        .as_document()
        .unwrap()
        .get_array("lessons")
        .unwrap();
    assert_eq!(slides.len(), 2);
    let first = slides[0].as_document().unwrap();
    assert_eq!(first.get_str("speaker_notes").unwrap(), "keep me");
    assert_eq!(slides[1].as_document().unwrap().get_str("title").unwrap(), "Slide 3");

    db.drop().await.unwrap();
}

#[tokio::test]
async fn test_add_lessons_creates_the_module_when_course_has_none() {
    let db = test_db!();
    db.collection::<Document>("courses")
        .insert_one(doc! { "id": "motivation", "title": "Motivation - Power Guide to motivating yourself and others" })
        .await
        .unwrap();
    let course = Selector::Id("motivation".to_string());
    let mutator = Mutator::new(&db, false);

    let report = mutator
        .add_lessons(&course, None, &[lesson_seed("Goals & What is Motivation")])
        .await
        .unwrap();
    assert_eq!(report.total(Action::Inserted, "modules"), 1);
    assert_eq!(report.total(Action::Inserted, "lessons"), 1);

    let modules = ModuleCrud::new(&db).find_by_course("motivation").await.unwrap();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].title, DEFAULT_MODULE_TITLE);

    let more = [lesson_seed("Intrinsic Motivation"), lesson_seed("Extrinsic Motivation")];
    let report = mutator
        .add_lessons(&course, Some(&Selector::Title(DEFAULT_MODULE_TITLE.to_string())), &more)
        .await
        .unwrap();
    assert_eq!(report.total(Action::Inserted, "modules"), 0);

    let lessons = LessonCrud::new(&db)
        .find(doc! { "module_id": modules[0].reference().unwrap() })
        .await
        .unwrap();
    let orders: Vec<Option<i64>> = lessons.iter().map(|l| l.order).collect();
    assert_eq!(orders, vec![Some(1), Some(2), Some(3)]);
    assert_eq!(lessons[2].title, "Extrinsic Motivation");
    assert_eq!(lessons[2].course_id.as_deref(), Some("motivation"));

    db.drop().await.unwrap();
}

#[tokio::test]
async fn test_add_lessons_to_an_embedding_module() {
    let db = test_db!();
    seed_plan(&db, &embedded(PLAN)).await;

    let report = Mutator::new(&db, false)
        .add_lessons(
            &diploma(),
            Some(&Selector::Title("Course Content".to_string())),
            &[lesson_seed("Case Study: Zara - Part 2")],
        )
        .await
        .unwrap();
    assert_eq!(report.total(Action::Inserted, "lessons"), 1);
    assert_eq!(LessonCrud::new(&db).count(doc! {}).await.unwrap(), 0);

    let modules = ModuleCrud::new(&db).find(doc! { "title": "Course Content" }).await.unwrap();
    let lessons = modules[0].embedded_lessons();
    assert_eq!(lessons.len(), 4);
    assert_eq!(lessons[3].title, "Case Study: Zara - Part 2");
    assert_eq!(lessons[3].order, Some(4));

    db.drop().await.unwrap();
}

#[tokio::test]
async fn test_add_lessons_dry_run_writes_nothing() {
    let db = test_db!();
    seed_plan(&db, PLAN).await;

    let report = Mutator::new(&db, true)
        .add_lessons(&diploma(), None, &[lesson_seed("Extra")])
        .await
        .unwrap();
    assert!(report.dry_run);
    assert_eq!(report.total(Action::Inserted, "lessons"), 1);
    assert_eq!(LessonCrud::new(&db).count(doc! {}).await.unwrap(), 4);

    db.drop().await.unwrap();
}

#[tokio::test]
async fn test_course_embedded_lessons_are_read_edited_and_trimmed() {
    let db = test_db!();
    insert_legacy_course(&db).await;
    let locator = Locator::new(&db);
    let course = locator.course(&legacy()).await.unwrap();

    let lessons = locator.course_lessons(&course).await.unwrap();
    assert_eq!(lessons.len(), 3);
    assert!(lessons.iter().all(|p| p.placement.label() == "course-embedded"));

    let mutator = Mutator::new(&db, false);
    let report = mutator
        .update_lesson(
            &LessonPath {
                course: legacy(),
                module: Some(Selector::Title("Incoterms Presentation".to_string())),
                lesson: Selector::Title("Slide 2".to_string()),
            },
            doc! { "content": "<p>FCA 2020</p>" },
        )
        .await
        .unwrap();
    assert_eq!(report.total(Action::Updated, "lessons"), 1);

    let report = mutator.trim_lessons(&legacy(), TrimMode::KeepFirst(2)).await.unwrap();
    assert_eq!(report.total(Action::Deleted, "lessons"), 1);

    let course = locator.course(&legacy()).await.unwrap();
    let slides = course.embedded_modules()[0].embedded_lessons();
    let titles: Vec<&str> = slides.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["Slide 1", "Slide 2"]);
    assert_eq!(slides[1].content, "<p>FCA 2020</p>");

    let summary = inspect::courses(&db, &legacy()).await.unwrap();
    assert_eq!(summary[0].modules, 1);
    assert_eq!(summary[0].lessons, 2);

    db.drop().await.unwrap();
}

#[tokio::test]
async fn test_show_lists_unassigned_lessons() {
    let db = test_db!();
    seed_plan(&db, PLAN).await;
    let course = Locator::new(&db).course(&diploma()).await.unwrap();
    db.collection::<Document>("lessons")
        .insert_one(doc! { "id": "stray", "course_id": course.reference().unwrap(), "title": "Welcome" })
        .await
        .unwrap();

    let tree = inspect::show(&db, &diploma()).await.unwrap();
    let titles: Vec<&str> = tree.modules.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["Course Content", "Assessment Prep", UNASSIGNED]);
    assert_eq!(tree.modules[2].lessons[0].title, "Welcome");
    assert!(tree.to_string().contains("(unassigned) (1 lessons)"));

    let summary = inspect::courses(&db, &diploma()).await.unwrap();
    let shown: usize = tree.modules.iter().map(|m| m.lessons.len()).sum();
    assert_eq!(summary[0].lessons, shown);

    db.drop().await.unwrap();
}

#[tokio::test]
async fn test_id_selector_reaches_object_id_only_course() {
    let db = test_db!();
    let inserted = db
        .collection::<Document>("courses")
        .insert_one(doc! { "title": "Pumps and Pump Spares" })
        .await
        .unwrap();
    let hex = inserted.inserted_id.as_object_id().unwrap().to_hex();

    let selector: Selector = format!("id:{}", hex).parse().unwrap();
    let course = Locator::new(&db).course(&selector).await.unwrap();
    assert_eq!(course.title, "Pumps and Pump Spares");
    assert_eq!(course.reference(), Some(hex));

    let report = Mutator::new(&db, false).rename_course(&selector, "Pumps").await.unwrap();
    assert_eq!(report.total(Action::Updated, "courses"), 1);

    db.drop().await.unwrap();
}

#[tokio::test]
async fn test_replace_quiz_questions() {
    let db = test_db!();
    seed_plan(&db, PLAN).await;

    let replacement = QuizSeed {
        title: "Supply Chain Final Assessment".to_string(),
        description: None,
        passing_score: Some(80),
        time_limit_minutes: None,
        questions: vec![QuestionSeed {
            question: "Zara restocks stores twice a week.".to_string(),
            question_type: Some("true_false".to_string()),
            options: vec!["True".to_string(), "False".to_string()],
            correct_answer: "True".to_string(),
            points: None,
        }],
    };

    let report = Mutator::new(&db, false)
        .replace_quiz(&diploma(), &Selector::All, &replacement)
        .await
        .unwrap();
    assert_eq!(report.total(Action::Updated, "quizzes"), 1);

    let locator = Locator::new(&db);
    let course = locator.course(&diploma()).await.unwrap();
    let quiz = locator
        .quiz(&course, &Selector::Title("Supply Chain Final Assessment".to_string()))
        .await
        .unwrap();
    assert_eq!(quiz.questions.len(), 1);
    assert_eq!(quiz.passing_score, Some(80));
    assert_eq!(quiz.time_limit_minutes, Some(quiz_bank::TIME_LIMIT_MINUTES));
    assert_eq!(quiz.questions[0].points, Some(1));

    let empty = QuizSeed {
        questions: Vec::new(),
        ..replacement
    };
    let err = Mutator::new(&db, false)
        .replace_quiz(&diploma(), &Selector::All, &empty)
        .await
        .unwrap_err();
    assert!(matches!(err, MaintError::InvalidPlan(_)));

    db.drop().await.unwrap();
}
