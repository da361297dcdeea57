use std::collections::HashMap;

use crate::store::Question;

/// Outcome of one exam submission. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamScore {
    pub score: usize,
    pub total: usize,
}

/// Form field carrying the answer to a question (`q<id>`).
pub fn answer_field(question_id: i64) -> String {
    format!("q{question_id}")
}

/// Count questions whose submitted answer equals the text of the correct option.
///
/// Comparison is exact. A missing answer, or a question whose stored correct
/// index is outside 1–4, never scores.
pub fn score(questions: &[Question], answers: &HashMap<String, String>) -> ExamScore {
    let score = questions
        .iter()
        .filter(|q| {
            let Some(correct) = q.correct_option() else {
                tracing::warn!(
                    question = q.id,
                    correct_answer = %q.correct_answer,
                    "question has no valid correct option"
                );
                return false;
            };
            answers
                .get(&answer_field(q.id))
                .is_some_and(|given| given == correct)
        })
        .count();

    ExamScore {
        score,
        total: questions.len(),
    }
}
