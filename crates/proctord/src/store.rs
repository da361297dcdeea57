use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_rusqlite::Connection;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] tokio_rusqlite::Error),
    #[error("rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("username already taken: {0}")]
    DuplicateUsername(String),
    #[error("invalid role in database: {0}")]
    InvalidRole(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

/// A multiple-choice question as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: i64,
    pub question: String,
    pub options: [String; 4],
    /// 1-based index into `options`, stored as text.
    pub correct_answer: String,
}

impl Question {
    /// Text of the option selected by `correct_answer`, if the index is 1–4.
    pub fn correct_option(&self) -> Option<&str> {
        let index: usize = self.correct_answer.trim().parse().ok()?;
        if (1..=4).contains(&index) {
            Some(self.options[index - 1].as_str())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question: String,
    pub options: [String; 4],
    pub correct_answer: String,
}

/// SQLite-backed storage for users and questions.
#[derive(Clone)]
pub struct ExamStore {
    conn: Connection,
}

impl ExamStore {
    /// Open (or create) the database at the given path and create the tables.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }

        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                     id INTEGER PRIMARY KEY AUTOINCREMENT,
                     username TEXT UNIQUE,
                     password TEXT,
                     role TEXT CHECK(role IN ('admin', 'student'))
                 );
                 CREATE TABLE IF NOT EXISTS questions (
                     id INTEGER PRIMARY KEY AUTOINCREMENT,
                     question TEXT,
                     option1 TEXT,
                     option2 TEXT,
                     option3 TEXT,
                     option4 TEXT,
                     correct_answer TEXT
                 );",
            )?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Register a user. Returns the new row id.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<i64, StoreError> {
        let name = username.to_string();
        let password = password.to_string();

        let inserted = self
            .conn
            .call(move |conn| {
                let result = conn.execute(
                    "INSERT INTO users (username, password, role) VALUES (?1, ?2, ?3)",
                    rusqlite::params![name, password, role.as_str()],
                );
                match result {
                    Ok(_) => Ok(Some(conn.last_insert_rowid())),
                    Err(rusqlite::Error::SqliteFailure(e, _))
                        if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                    {
                        Ok(None)
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        inserted.ok_or_else(|| StoreError::DuplicateUsername(username.to_string()))
    }

    /// Look up a user by exact username and password.
    pub async fn find_user(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, StoreError> {
        let username = username.to_string();
        let password = password.to_string();

        let row: Option<(i64, String, String)> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, username, role FROM users WHERE username = ?1 AND password = ?2",
                )?;
                let mut rows = stmt.query_map([&username, &password], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?;
                Ok(rows.next().transpose()?)
            })
            .await?;

        let Some((id, username, role)) = row else {
            return Ok(None);
        };
        let role = role.parse::<Role>().map_err(StoreError::InvalidRole)?;
        Ok(Some(User { id, username, role }))
    }

    pub async fn add_question(&self, question: NewQuestion) -> Result<i64, StoreError> {
        self.conn
            .call(move |conn| {
                let [o1, o2, o3, o4] = question.options;
                conn.execute(
                    "INSERT INTO questions (question, option1, option2, option3, option4, correct_answer)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![question.question, o1, o2, o3, o4, question.correct_answer],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(StoreError::from)
    }

    /// All questions in insertion order.
    pub async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, question, option1, option2, option3, option4, correct_answer
                     FROM questions ORDER BY id",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(Question {
                        id: row.get(0)?,
                        question: text_or_empty(row, 1)?,
                        options: [
                            text_or_empty(row, 2)?,
                            text_or_empty(row, 3)?,
                            text_or_empty(row, 4)?,
                            text_or_empty(row, 5)?,
                        ],
                        correct_answer: text_or_empty(row, 6)?,
                    })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(StoreError::from)
    }

    pub async fn count_users(&self) -> Result<u64, StoreError> {
        self.conn
            .call(|conn| {
                let count: u64 =
                    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
                Ok(count)
            })
            .await
            .map_err(StoreError::from)
    }
}

/// Columns are nullable in the schema; treat NULL as empty text.
fn text_or_empty(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(text: &str, options: [&str; 4], correct: &str) -> NewQuestion {
        NewQuestion {
            question: text.to_string(),
            options: options.map(str::to_string),
            correct_answer: correct.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let store = ExamStore::open(Path::new(":memory:")).await.unwrap();

        let id = store.create_user("alice", "pw", Role::Student).await.unwrap();
        let user = store.find_user("alice", "pw").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.username, "alice");
        assert_eq!(user.role, Role::Student);
    }

    #[tokio::test]
    async fn test_find_user_requires_exact_match() {
        let store = ExamStore::open(Path::new(":memory:")).await.unwrap();
        store.create_user("admin", "adminpw", Role::Admin).await.unwrap();

        assert!(store.find_user("admin", "wrong").await.unwrap().is_none());
        assert!(store.find_user("Admin", "adminpw").await.unwrap().is_none());
        assert!(store.find_user("nobody", "x").await.unwrap().is_none());
        let admin = store.find_user("admin", "adminpw").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = ExamStore::open(Path::new(":memory:")).await.unwrap();
        store.create_user("bob", "a", Role::Student).await.unwrap();

        let err = store.create_user("bob", "b", Role::Admin).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername(ref name) if name == "bob"));
        assert_eq!(store.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_questions_listed_in_insertion_order() {
        let store = ExamStore::open(Path::new(":memory:")).await.unwrap();
        let first = store
            .add_question(question("Capital of France?", ["Rome", "Paris", "Oslo", "Bern"], "2"))
            .await
            .unwrap();
        let second = store
            .add_question(question("2 + 2?", ["3", "4", "5", "22"], "2"))
            .await
            .unwrap();

        let questions = store.list_questions().await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id, first);
        assert_eq!(questions[1].id, second);
        assert_eq!(questions[0].options[1], "Paris");
        assert_eq!(questions[0].correct_option(), Some("Paris"));
    }

    #[test]
    fn test_correct_option_out_of_range() {
        let mut q = Question {
            id: 1,
            question: "q".into(),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: "4".into(),
        };
        assert_eq!(q.correct_option(), Some("d"));
        q.correct_answer = "0".into();
        assert_eq!(q.correct_option(), None);
        q.correct_answer = "5".into();
        assert_eq!(q.correct_option(), None);
        q.correct_answer = "two".into();
        assert_eq!(q.correct_option(), None);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("student".parse::<Role>(), Ok(Role::Student));
        assert!("teacher".parse::<Role>().is_err());
    }
}
