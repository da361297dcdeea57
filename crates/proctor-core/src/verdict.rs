use std::fmt;

use serde::{Serialize, Serializer};

/// Object labels that may appear in frame without counting as a violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    labels: Vec<String>,
}

impl Default for AllowList {
    fn default() -> Self {
        Self {
            labels: vec!["person".to_string()],
        }
    }
}

impl AllowList {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated list, ignoring blanks (`"person, chair"`).
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|label| !label.is_empty()),
        )
    }

    pub fn allows(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Outcome of the object check for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Clean,
    /// The first disallowed label seen in the frame.
    Flagged(String),
}

impl Verdict {
    /// Scan labels in detector order; the first one not on the allow-list wins.
    pub fn from_labels<'a, I>(labels: I, allow: &AllowList) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        labels
            .into_iter()
            .find(|label| !allow.allows(label))
            .map(|label| Verdict::Flagged(label.to_string()))
            .unwrap_or(Verdict::Clean)
    }

    pub fn is_flagged(&self) -> bool {
        matches!(self, Verdict::Flagged(_))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Clean => f.write_str("No"),
            Verdict::Flagged(label) => write!(f, "Yes ({label})"),
        }
    }
}

impl Serialize for Verdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
