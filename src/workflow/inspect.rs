use bson::{doc, Document};
use mongodb::Database;
use serde::Serialize;
use std::fmt;

use crate::error::Result;
use crate::modules::course::model::Course;
use crate::modules::lesson::model::PlacedLesson;
use crate::modules::quiz::model::Quiz;
use crate::workflow::locator::{Locator, Selector};

#[derive(Debug, Clone, Serialize)]
pub struct CourseSummary {
    pub reference: Option<String>,
    pub title: String,
    pub code: Option<String>,
    pub category: Option<String>,
    pub kind: Option<String>,
    pub published: bool,
    pub modules: usize,
    pub lessons: usize,
    pub quizzes: usize,
}

impl fmt::Display for CourseSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} / {} / {} | {} modules, {} lessons, {} quizzes",
            self.title,
            self.code.as_deref().unwrap_or("N/A"),
            self.category.as_deref().unwrap_or("-"),
            self.kind.as_deref().unwrap_or("-"),
            if self.published { "published" } else { "draft" },
            self.modules,
            self.lessons,
            self.quizzes,
        )
    }
}

pub async fn courses(db: &Database, selector: &Selector) -> Result<Vec<CourseSummary>> {
    use crate::modules::Keyed;

    let locator = Locator::new(db);
    let mut summaries = Vec::new();
    for course in locator.courses(selector).await? {
        let modules = locator.modules(&course).await?.len() + course.embedded_modules().len();
        let lessons = locator.course_lessons(&course).await?.len();
        let quizzes = locator.quizzes(&course).await?.len();
        summaries.push(CourseSummary {
            reference: course.reference(),
            kind: course.kind().map(str::to_string),
            published: course.is_live(),
            title: course.title,
            code: course.code,
            category: course.category,
            modules,
            lessons,
            quizzes,
        });
    }
    Ok(summaries)
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonLine {
    pub order: Option<i64>,
    pub title: String,
    pub content_type: Option<String>,
    pub placement: &'static str,
    pub image: bool,
    pub video: bool,
}

impl From<PlacedLesson> for LessonLine {
    fn from(placed: PlacedLesson) -> Self {
        LessonLine {
            order: placed.lesson.order,
            image: placed.lesson.has_image(),
            video: placed.lesson.has_video(),
            placement: placed.placement.label(),
            content_type: placed.lesson.content_type,
            title: placed.lesson.title,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleTree {
    pub title: String,
    pub order: Option<i64>,
    pub lessons: Vec<LessonLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseTree {
    pub course: Course,
    pub modules: Vec<ModuleTree>,
    pub quizzes: Vec<Quiz>,
}

/// The course with every lesson group: its modules, modules embedded in
/// the course document, and lessons assigned to no module.
pub async fn show(db: &Database, selector: &Selector) -> Result<CourseTree> {
    let locator = Locator::new(db);
    let course = locator.course(selector).await?;

    let modules = locator
        .lesson_groups(&course)
        .await?
        .into_iter()
        .map(|group| ModuleTree {
            title: group.title,
            order: group.order,
            lessons: group.lessons.into_iter().map(LessonLine::from).collect(),
        })
        .collect();

    let quizzes = locator.quizzes(&course).await?;
    Ok(CourseTree {
        course,
        modules,
        quizzes,
    })
}

impl fmt::Display for CourseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.course;
        writeln!(f, "{}", c.title)?;
        writeln!(f, "  id: {}", c.id.as_deref().unwrap_or("-"))?;
        writeln!(f, "  code: {}", c.code.as_deref().unwrap_or("N/A"))?;
        writeln!(f, "  category: {}", c.category.as_deref().unwrap_or("-"))?;
        writeln!(f, "  type: {}", c.kind().unwrap_or("-"))?;
        writeln!(f, "  published: {}", c.is_live())?;
        if let Some(thumbnail) = &c.thumbnail {
            writeln!(f, "  thumbnail: {}", thumbnail)?;
        }

        for module in &self.modules {
            writeln!(
                f,
                "  [{}] {} ({} lessons)",
                module.order.map(|o| o.to_string()).unwrap_or_else(|| "-".into()),
                module.title,
                module.lessons.len()
            )?;
            for lesson in &module.lessons {
                let mut flags = Vec::new();
                if lesson.image {
                    flags.push("img");
                }
                if lesson.video {
                    flags.push("video");
                }
                if lesson.placement != "collection" {
                    flags.push(lesson.placement);
                }
                writeln!(
                    f,
                    "      {:>3}. {} <{}>{}",
                    lesson.order.map(|o| o.to_string()).unwrap_or_else(|| "?".into()),
                    lesson.title,
                    lesson.content_type.as_deref().unwrap_or("text"),
                    if flags.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", flags.join(", "))
                    }
                )?;
            }
        }

        for quiz in &self.quizzes {
            writeln!(
                f,
                "  quiz: {} ({} questions, module {})",
                quiz.title,
                quiz.questions.len(),
                quiz.module_id.as_deref().unwrap_or("<unlinked>")
            )?;
        }
        Ok(())
    }
}

/// Document counts for the LMS collections that exist.
pub async fn count(db: &Database) -> Result<Vec<(String, u64)>> {
    let mut names = db.list_collection_names().await?;
    names.sort();

    let mut counts = Vec::with_capacity(names.len());
    for name in names {
        let n = db.collection::<Document>(&name).count_documents(doc! {}).await?;
        counts.push((name, n));
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::locator::UNASSIGNED;

    fn line(order: i64, title: &str, placement: &'static str) -> LessonLine {
        LessonLine {
            order: Some(order),
            title: title.to_string(),
            content_type: None,
            placement,
            image: false,
            video: title.contains("Video"),
        }
    }

    #[test]
    fn tree_lists_every_group_with_placement_flags() {
        let tree = CourseTree {
            course: Course {
                id: Some("scm".to_string()),
                title: "Diploma in Supply Chain Management".to_string(),
                ..Course::default()
            },
            modules: vec![
                ModuleTree {
                    title: "Course Content".to_string(),
                    order: Some(1),
                    lessons: vec![line(1, "Supply Chain Networks", "collection")],
                },
                ModuleTree {
                    title: "Legacy Slides".to_string(),
                    order: None,
                    lessons: vec![line(0, "Slide 1", "course-embedded")],
                },
                ModuleTree {
                    title: UNASSIGNED.to_string(),
                    order: None,
                    lessons: vec![line(9, "Case Study: Zara Video", "collection")],
                },
            ],
            quizzes: Vec::new(),
        };

        let out = tree.to_string();
        assert!(out.contains("  [1] Course Content (1 lessons)"));
        assert!(out.contains("Slide 1 <text> [course-embedded]"));
        assert!(out.contains("  [-] (unassigned) (1 lessons)"));
        assert!(out.contains("Case Study: Zara Video <text> [video]"));
    }
}
