use bson::Bson;

use crate::modules::quiz::model::{Question, Quiz};

pub const PASSING_SCORE: i64 = 70;
pub const TIME_LIMIT_MINUTES: i64 = 24;

const TRUE_FALSE: [&str; 2] = ["True", "False"];

fn multiple_choice(question: &str, options: [&str; 4], answer: &str) -> (String, Vec<String>, String, &'static str) {
    (
        question.to_string(),
        options.iter().map(|o| o.to_string()).collect(),
        answer.to_string(),
        "multiple_choice",
    )
}

fn true_false(statement: &str) -> (String, Vec<String>, String, &'static str) {
    (
        statement.to_string(),
        TRUE_FALSE.iter().map(|o| o.to_string()).collect(),
        "True".to_string(),
        "true_false",
    )
}

/// Twelve generic questions, alternating multiple choice and true/false.
pub fn default_questions(category: &str) -> Vec<Question> {
    let principle = format!("What is a key principle in {}?", category);
    let items = [
        multiple_choice(
            &principle,
            ["Ignore standards", "Follow best practices", "Avoid learning", "Skip training"],
            "Follow best practices",
        ),
        true_false("Continuous improvement is essential for success."),
        multiple_choice(
            "What drives professional excellence?",
            ["Avoiding work", "Applying knowledge", "Ignoring feedback", "Staying static"],
            "Applying knowledge",
        ),
        true_false("Quality standards should be followed consistently."),
        multiple_choice(
            "What is essential for team success?",
            ["Working alone", "Collaboration", "Avoiding communication", "Ignoring goals"],
            "Collaboration",
        ),
        true_false("Safety is a priority in all operations."),
        multiple_choice(
            "What ensures quality outcomes?",
            ["Rushing work", "Following procedures", "Skipping checks", "Ignoring details"],
            "Following procedures",
        ),
        true_false("Professional development requires ongoing effort."),
        multiple_choice(
            "What is key to problem solving?",
            ["Ignoring issues", "Systematic analysis", "Avoiding decisions", "Guessing solutions"],
            "Systematic analysis",
        ),
        true_false("Effective communication improves team performance."),
        multiple_choice(
            "What drives organizational success?",
            ["Avoiding change", "Excellence and innovation", "Maintaining status quo", "Ignoring customers"],
            "Excellence and innovation",
        ),
        true_false("Accountability is essential for professional success."),
    ];

    items
        .into_iter()
        .enumerate()
        .map(|(order, (question, options, answer, kind))| Question {
            question,
            question_type: Some(kind.to_string()),
            options,
            correct_answer: Some(answer),
            points: Some(1),
            order: Some(order as i64),
        })
        .collect()
}

/// The stock final assessment attached to a course's first module.
pub fn default_quiz(course_title: &str, category: &str, course_ref: &str, module_ref: &str) -> Quiz {
    Quiz {
        oid: None,
        id: Some(uuid::Uuid::new_v4().to_string()),
        course_id: Some(course_ref.to_string()),
        module_id: Some(module_ref.to_string()),
        title: format!("{} - Final Assessment", course_title),
        description: Some(format!(
            "Test your knowledge of {}. You need {}% to pass.",
            course_title, PASSING_SCORE
        )),
        passing_score: Some(PASSING_SCORE),
        time_limit_minutes: Some(TIME_LIMIT_MINUTES),
        questions: default_questions(category),
        created_at: Some(Bson::DateTime(bson::DateTime::now())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_ordered_questions_with_valid_answers() {
        let questions = default_questions("Supply Chain");

        assert_eq!(questions.len(), 12);
        assert!(questions[0].question.contains("Supply Chain"));
        for (i, q) in questions.iter().enumerate() {
            assert_eq!(q.order, Some(i as i64));
            let answer = q.correct_answer.as_ref().unwrap();
            assert!(q.options.contains(answer), "{} has no matching option", q.question);
        }
        assert_eq!(questions[1].question_type.as_deref(), Some("true_false"));
    }

    #[test]
    fn quiz_is_linked_to_course_and_module() {
        let quiz = default_quiz("Valves", "Engineering", "c-1", "m-1");

        assert_eq!(quiz.title, "Valves - Final Assessment");
        assert_eq!(quiz.course_id.as_deref(), Some("c-1"));
        assert_eq!(quiz.module_id.as_deref(), Some("m-1"));
        assert_eq!(quiz.passing_score, Some(70));
        assert!(quiz.id.is_some());
    }
}
