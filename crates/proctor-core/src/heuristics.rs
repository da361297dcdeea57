//! Gesture heuristics over face-mesh landmarks.
//!
//! Three fixed-threshold checks run on every analysed face:
//!
//! - **Blink:** vertical gap between the upper and lower left eyelid points.
//! - **Mouth:** vertical gap between the inner upper and lower lip points.
//! - **Head pose:** which region of the frame the nose tip falls in.
//!
//! All coordinates are normalised to `[0, 1]`, so thresholds are independent
//! of the capture resolution. The checks add no inference of their own; they
//! only read landmark data the face-mesh model already produced.

use std::fmt;

use serde::Serialize;

use crate::FaceMesh;
use crate::Landmark;

/// Eyelid gap below which the eye counts as closed.
pub const BLINK_THRESHOLD: f32 = 0.01;
/// Lip gap above which the mouth counts as open.
pub const MOUTH_OPEN_THRESHOLD: f32 = 0.03;
/// Nose-tip coordinate below which the head is turned left / tilted up.
pub const POSE_LOW: f32 = 0.4;
/// Nose-tip coordinate above which the head is turned right / tilted down.
pub const POSE_HIGH: f32 = 0.6;

// Face-mesh point numbers.
const LEFT_EYE_UPPER: usize = 159;
const LEFT_EYE_LOWER: usize = 145;
const LIP_UPPER_INNER: usize = 13;
const LIP_LOWER_INNER: usize = 14;
const NOSE_TIP: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Blink {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mouth {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeadPose {
    Left,
    Right,
    Up,
    Down,
    Center,
}

impl HeadPose {
    /// Every pose, in the order the clock placeholder cycles through them.
    pub const ALL: [HeadPose; 5] = [
        HeadPose::Left,
        HeadPose::Right,
        HeadPose::Up,
        HeadPose::Down,
        HeadPose::Center,
    ];
}

impl fmt::Display for Blink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Blink::Yes => "Yes",
            Blink::No => "No",
        })
    }
}

impl fmt::Display for Mouth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mouth::Open => "Open",
            Mouth::Closed => "Closed",
        })
    }
}

impl fmt::Display for HeadPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HeadPose::Left => "Left",
            HeadPose::Right => "Right",
            HeadPose::Up => "Up",
            HeadPose::Down => "Down",
            HeadPose::Center => "Center",
        })
    }
}

/// The three per-frame face signals that end up in a report line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceSignals {
    pub blink: Blink,
    pub mouth: Mouth,
    pub head_pose: HeadPose,
}

impl Default for FaceSignals {
    /// Signals reported when no face is visible.
    fn default() -> Self {
        Self {
            blink: Blink::No,
            mouth: Mouth::Closed,
            head_pose: HeadPose::Center,
        }
    }
}

impl FaceSignals {
    /// Evaluate all three heuristics on a face mesh.
    ///
    /// A mesh missing any of the required points yields the no-face default.
    pub fn from_mesh(mesh: &FaceMesh) -> Self {
        let points = (
            mesh.point(LEFT_EYE_UPPER),
            mesh.point(LEFT_EYE_LOWER),
            mesh.point(LIP_UPPER_INNER),
            mesh.point(LIP_LOWER_INNER),
            mesh.point(NOSE_TIP),
        );
        let (Some(eye_upper), Some(eye_lower), Some(lip_upper), Some(lip_lower), Some(nose)) =
            points
        else {
            tracing::debug!(points = mesh.points.len(), "face mesh too small for heuristics");
            return Self::default();
        };

        Self {
            blink: blink(eye_upper, eye_lower),
            mouth: mouth(lip_upper, lip_lower),
            head_pose: head_pose(nose),
        }
    }
}

/// `Yes` when the eyelid gap is strictly below [`BLINK_THRESHOLD`].
///
/// The gap is the absolute vertical distance, so the result does not depend
/// on which lid sits higher in image space. A signed difference would report
/// every open eye of an upright face as a blink.
pub fn blink(upper_lid: Landmark, lower_lid: Landmark) -> Blink {
    if (lower_lid.y - upper_lid.y).abs() < BLINK_THRESHOLD {
        Blink::Yes
    } else {
        Blink::No
    }
}

/// `Open` when the lip gap is strictly above [`MOUTH_OPEN_THRESHOLD`].
///
/// Uses the absolute vertical distance, like [`blink`].
pub fn mouth(upper_lip: Landmark, lower_lip: Landmark) -> Mouth {
    if (lower_lip.y - upper_lip.y).abs() > MOUTH_OPEN_THRESHOLD {
        Mouth::Open
    } else {
        Mouth::Closed
    }
}

/// Classify the nose-tip position.
///
/// The horizontal axis is checked first: a nose that is both left of
/// [`POSE_LOW`] and above [`POSE_LOW`] is `Left`, never `Up`.
pub fn head_pose(nose: Landmark) -> HeadPose {
    if nose.x < POSE_LOW {
        HeadPose::Left
    } else if nose.x > POSE_HIGH {
        HeadPose::Right
    } else if nose.y < POSE_LOW {
        HeadPose::Up
    } else if nose.y > POSE_HIGH {
        HeadPose::Down
    } else {
        HeadPose::Center
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lm(x: f32, y: f32) -> Landmark {
        Landmark { x, y }
    }

    /// Helper: a full 468-point mesh with the five heuristic points set.
    fn mesh_with(eye: (f32, f32), lips: (f32, f32), nose: (f32, f32)) -> FaceMesh {
        let mut points = vec![lm(0.5, 0.5); 468];
        points[LEFT_EYE_UPPER] = lm(0.45, eye.0);
        points[LEFT_EYE_LOWER] = lm(0.45, eye.1);
        points[LIP_UPPER_INNER] = lm(0.5, lips.0);
        points[LIP_LOWER_INNER] = lm(0.5, lips.1);
        points[NOSE_TIP] = lm(nose.0, nose.1);
        FaceMesh { points }
    }

    #[test]
    fn test_head_pose_regions() {
        assert_eq!(head_pose(lm(0.2, 0.5)), HeadPose::Left);
        assert_eq!(head_pose(lm(0.8, 0.5)), HeadPose::Right);
        assert_eq!(head_pose(lm(0.5, 0.2)), HeadPose::Up);
        assert_eq!(head_pose(lm(0.5, 0.8)), HeadPose::Down);
        assert_eq!(head_pose(lm(0.5, 0.5)), HeadPose::Center);
    }

    #[test]
    fn test_head_pose_horizontal_wins() {
        // Left and up at the same time: horizontal check runs first
        assert_eq!(head_pose(lm(0.3, 0.3)), HeadPose::Left);
        assert_eq!(head_pose(lm(0.3, 0.9)), HeadPose::Left);
        assert_eq!(head_pose(lm(0.7, 0.1)), HeadPose::Right);
        assert_eq!(head_pose(lm(0.7, 0.9)), HeadPose::Right);
    }

    #[test]
    fn test_head_pose_boundaries_are_center() {
        assert_eq!(head_pose(lm(0.4, 0.5)), HeadPose::Center);
        assert_eq!(head_pose(lm(0.6, 0.5)), HeadPose::Center);
        assert_eq!(head_pose(lm(0.5, 0.4)), HeadPose::Center);
        assert_eq!(head_pose(lm(0.5, 0.6)), HeadPose::Center);
        assert_eq!(head_pose(lm(0.4, 0.6)), HeadPose::Center);
    }

    #[test]
    fn test_head_pose_corners() {
        assert_eq!(head_pose(lm(0.0, 0.0)), HeadPose::Left);
        assert_eq!(head_pose(lm(1.0, 1.0)), HeadPose::Right);
        assert_eq!(head_pose(lm(0.5, 0.0)), HeadPose::Up);
        assert_eq!(head_pose(lm(0.5, 1.0)), HeadPose::Down);
    }

    #[test]
    fn test_blink_threshold_is_strict() {
        assert_eq!(blink(lm(0.0, 0.300), lm(0.0, 0.305)), Blink::Yes);
        assert_eq!(blink(lm(0.0, 0.30), lm(0.0, 0.35)), Blink::No);
        // Exactly at the threshold is not a blink
        assert_eq!(blink(lm(0.0, 0.0), lm(0.0, BLINK_THRESHOLD)), Blink::No);
    }

    #[test]
    fn test_mouth_threshold_is_strict() {
        assert_eq!(mouth(lm(0.0, 0.60), lm(0.0, 0.65)), Mouth::Open);
        assert_eq!(mouth(lm(0.0, 0.60), lm(0.0, 0.61)), Mouth::Closed);
        assert_eq!(mouth(lm(0.0, 0.0), lm(0.0, MOUTH_OPEN_THRESHOLD)), Mouth::Closed);
    }

    #[test]
    fn test_gaps_ignore_point_order() {
        // Upright face: upper lid above lower lid, eye wide open
        assert_eq!(blink(lm(0.0, 0.30), lm(0.0, 0.35)), Blink::No);
        assert_eq!(blink(lm(0.0, 0.35), lm(0.0, 0.30)), Blink::No);
        assert_eq!(mouth(lm(0.0, 0.65), lm(0.0, 0.60)), Mouth::Open);
        assert_eq!(mouth(lm(0.0, 0.61), lm(0.0, 0.60)), Mouth::Closed);
    }

    #[test]
    fn test_from_mesh_reads_named_points() {
        let mesh = mesh_with((0.40, 0.405), (0.60, 0.68), (0.5, 0.7));
        let signals = FaceSignals::from_mesh(&mesh);
        assert_eq!(signals.blink, Blink::Yes);
        assert_eq!(signals.mouth, Mouth::Open);
        assert_eq!(signals.head_pose, HeadPose::Down);
    }

    #[test]
    fn test_from_mesh_open_eyes_closed_mouth() {
        let mesh = mesh_with((0.38, 0.42), (0.62, 0.63), (0.5, 0.5));
        let signals = FaceSignals::from_mesh(&mesh);
        assert_eq!(signals.blink, Blink::No);
        assert_eq!(signals.mouth, Mouth::Closed);
        assert_eq!(signals.head_pose, HeadPose::Center);
    }

    #[test]
    fn test_truncated_mesh_falls_back_to_default() {
        let mesh = FaceMesh {
            points: vec![lm(0.1, 0.1); 20],
        };
        assert_eq!(FaceSignals::from_mesh(&mesh), FaceSignals::default());
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(Blink::Yes.to_string(), "Yes");
        assert_eq!(Mouth::Closed.to_string(), "Closed");
        assert_eq!(HeadPose::Center.to_string(), "Center");
    }
}
