//! Per-user report log format.
//!
//! Each analysed frame produces one line:
//! `[HH:MM:SS] Blink: <..>, Mouth: <..>, Head Pose: <..>, Cheating: <..>`

use std::fmt;

use chrono::{DateTime, Local, NaiveTime, TimeZone};

use crate::heuristics::FaceSignals;
use crate::verdict::Verdict;

/// Written once to a monitor report when the violation threshold is reached.
pub const TERMINATION_NOTICE: &str = "\nExam Terminated due to repeated cheating.\n";

/// One report line. `Display` renders it without the trailing newline.
#[derive(Debug, Clone)]
pub struct ReportLine {
    pub time: NaiveTime,
    pub signals: FaceSignals,
    pub verdict: Verdict,
}

impl ReportLine {
    pub fn new<Tz: TimeZone>(at: &DateTime<Tz>, signals: FaceSignals, verdict: Verdict) -> Self {
        Self {
            time: at.time(),
            signals,
            verdict,
        }
    }
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] Blink: {}, Mouth: {}, Head Pose: {}, Cheating: {}",
            self.time.format("%H:%M:%S"),
            self.signals.blink,
            self.signals.mouth,
            self.signals.head_pose,
            self.verdict
        )
    }
}

/// Reduce a client-supplied user id to characters safe for a file name.
pub fn sanitize_user_id(user_id: &str) -> String {
    let cleaned: String = user_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

/// Report file for a user of the single-frame endpoint.
pub fn user_report_file_name(user_id: &str) -> String {
    format!("user_{}_report.txt", sanitize_user_id(user_id))
}

/// Report file for one monitor run, named after its start time.
pub fn session_report_file_name(started: &DateTime<Local>) -> String {
    format!("report_{}.txt", started.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::{Blink, HeadPose, Mouth};

    #[test]
    fn test_line_format() {
        let line = ReportLine {
            time: NaiveTime::from_hms_opt(9, 5, 7).unwrap(),
            signals: FaceSignals {
                blink: Blink::Yes,
                mouth: Mouth::Closed,
                head_pose: HeadPose::Left,
            },
            verdict: Verdict::Flagged("cell phone".into()),
        };
        assert_eq!(
            line.to_string(),
            "[09:05:07] Blink: Yes, Mouth: Closed, Head Pose: Left, Cheating: Yes (cell phone)"
        );
    }

    #[test]
    fn test_line_from_datetime() {
        let at = chrono::Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 1).unwrap();
        let line = ReportLine::new(&at, FaceSignals::default(), Verdict::Clean);
        assert_eq!(
            line.to_string(),
            "[23:59:01] Blink: No, Mouth: Closed, Head Pose: Center, Cheating: No"
        );
    }

    #[test]
    fn test_sanitize_user_id() {
        assert_eq!(sanitize_user_id("42"), "42");
        assert_eq!(sanitize_user_id("alice-01_x"), "alice-01_x");
        assert_eq!(sanitize_user_id("../../etc/passwd"), "______etc_passwd");
        assert_eq!(sanitize_user_id(""), "unknown");
    }

    #[test]
    fn test_file_names() {
        assert_eq!(user_report_file_name("7"), "user_7_report.txt");
        let started = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(session_report_file_name(&started), "report_20240102_030405.txt");
    }
}
