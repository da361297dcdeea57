//! Wall-clock stand-in for the face signals.
//!
//! The single-frame HTTP endpoint does not run the face-mesh model by default.
//! Its blink, mouth and head-pose fields are derived from the current unix
//! second instead, which keeps the response shape stable for clients while
//! the landmark path is opt-in.

use crate::heuristics::{Blink, FaceSignals, HeadPose, Mouth};

/// Face signals for the given unix timestamp (seconds).
///
/// Blink on even seconds, mouth open on multiples of three, head pose
/// cycling through [`HeadPose::ALL`] every five seconds.
pub fn signals_at(unix_secs: u64) -> FaceSignals {
    let blink = if unix_secs % 2 == 0 { Blink::Yes } else { Blink::No };
    let mouth = if unix_secs % 3 == 0 {
        Mouth::Open
    } else {
        Mouth::Closed
    };
    let head_pose = HeadPose::ALL[(unix_secs % 5) as usize];
    FaceSignals {
        blink,
        mouth,
        head_pose,
    }
}
