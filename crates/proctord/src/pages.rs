//! Minimal HTML views. Presentation is intentionally bare.

use std::fmt::Write as _;

use axum::response::Html;

use crate::exam::{answer_field, ExamScore};
use crate::store::Question;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n<h1>{}</h1>\n{}\n</body></html>\n",
        escape(title),
        escape(title),
        body
    ))
}

pub fn home() -> Html<String> {
    layout(
        "Online Exam",
        r#"<p><a href="/login">Login</a> | <a href="/register">Register</a></p>"#,
    )
}

pub fn register() -> Html<String> {
    layout(
        "Register",
        r#"<form method="post" action="/register">
<input name="username" placeholder="Username" required>
<input name="password" type="password" placeholder="Password" required>
<select name="role"><option value="student">Student</option><option value="admin">Admin</option></select>
<button type="submit">Register</button>
</form>"#,
    )
}

pub fn login() -> Html<String> {
    layout(
        "Login",
        r#"<form method="post" action="/login">
<input name="username" placeholder="Username" required>
<input name="password" type="password" placeholder="Password" required>
<button type="submit">Login</button>
</form>"#,
    )
}

fn question_list(questions: &[Question]) -> String {
    let mut body = String::from("<ol>\n");
    for q in questions {
        let _ = writeln!(
            body,
            "<li>{} <em>(correct: option {})</em><ul>{}</ul></li>",
            escape(&q.question),
            escape(&q.correct_answer),
            q.options
                .iter()
                .map(|o| format!("<li>{}</li>", escape(o)))
                .collect::<String>()
        );
    }
    body.push_str("</ol>");
    body
}

pub fn admin_dashboard(questions: &[Question]) -> Html<String> {
    let mut body = String::from(
        r#"<form method="post" action="/admin">
<input name="question" placeholder="Question" required>
<input name="option1" placeholder="Option 1" required>
<input name="option2" placeholder="Option 2" required>
<input name="option3" placeholder="Option 3" required>
<input name="option4" placeholder="Option 4" required>
<input name="correct_answer" placeholder="Correct option (1-4)" required>
<button type="submit">Add question</button>
</form>
"#,
    );
    body.push_str(&question_list(questions));
    body.push_str("\n<p><a href=\"/logout\">Logout</a></p>");
    layout("Admin Dashboard", &body)
}

pub fn exam(questions: &[Question]) -> Html<String> {
    let mut body = String::from("<form method=\"post\" action=\"/submit_exam\">\n");
    for q in questions {
        let field = answer_field(q.id);
        let _ = writeln!(body, "<fieldset><legend>{}</legend>", escape(&q.question));
        for option in &q.options {
            let option = escape(option);
            let _ = writeln!(
                body,
                "<label><input type=\"radio\" name=\"{field}\" value=\"{option}\"> {option}</label>"
            );
        }
        body.push_str("</fieldset>\n");
    }
    body.push_str("<button type=\"submit\">Submit</button>\n</form>");
    layout("Exam", &body)
}

pub fn result(score: ExamScore) -> Html<String> {
    layout(
        "Result",
        &format!(
            "<p>Your score: {} / {}</p>\n<p><a href=\"/logout\">Logout</a></p>",
            score.score, score.total
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>\"a\" & 'b'</b>"), "&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;");
    }

    #[test]
    fn test_exam_renders_answer_fields() {
        let q = Question {
            id: 3,
            question: "Capital?".into(),
            options: ["Rome".into(), "Paris".into(), "Oslo".into(), "Bern".into()],
            correct_answer: "2".into(),
        };
        let Html(page) = exam(&[q]);
        assert!(page.contains(r#"name="q3" value="Paris""#));
        assert!(!page.contains("correct"));
    }
}
