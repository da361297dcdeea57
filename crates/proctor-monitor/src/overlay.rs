use image::{Rgb, RgbImage};
use proctor_core::{AllowList, Detection, FaceMesh};

const LANDMARK_COLOR: Rgb<u8> = Rgb([0, 255, 255]);
const ALLOWED_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const VIOLATION_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BORDER: u32 = 4;

/// Draw landmarks, detection boxes and a status border onto the frame.
///
/// The border is green for a clean frame and red when a disallowed object
/// was seen.
pub fn annotate(
    frame: &mut RgbImage,
    face: Option<&FaceMesh>,
    detections: &[Detection],
    allow: &AllowList,
    flagged: bool,
) {
    if let Some(mesh) = face {
        let (w, h) = frame.dimensions();
        for p in &mesh.points {
            let x = (p.x * w as f32).round();
            let y = (p.y * h as f32).round();
            if x >= 0.0 && y >= 0.0 && (x as u32) < w && (y as u32) < h {
                frame.put_pixel(x as u32, y as u32, LANDMARK_COLOR);
            }
        }
    }

    for det in detections {
        let color = if allow.allows(&det.label) {
            ALLOWED_COLOR
        } else {
            VIOLATION_COLOR
        };
        draw_rect(frame, det.bbox, color, 2);
    }

    let (w, h) = frame.dimensions();
    let status = if flagged { VIOLATION_COLOR } else { ALLOWED_COLOR };
    draw_rect(frame, [0.0, 0.0, w as f32, h as f32], status, BORDER);
}

/// Outline `[x1, y1, x2, y2]` (exclusive max) with the given thickness, clipped to the frame.
fn draw_rect(frame: &mut RgbImage, bbox: [f32; 4], color: Rgb<u8>, thickness: u32) {
    let (w, h) = frame.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let clamp_x = |v: f32| (v.max(0.0) as u32).min(w);
    let clamp_y = |v: f32| (v.max(0.0) as u32).min(h);
    let (x1, y1, x2, y2) = (
        clamp_x(bbox[0]),
        clamp_y(bbox[1]),
        clamp_x(bbox[2]),
        clamp_y(bbox[3]),
    );
    if x2 <= x1 || y2 <= y1 {
        return;
    }

    for y in y1..y2 {
        for x in x1..x2 {
            let edge = x < x1 + thickness
                || x + thickness >= x2
                || y < y1 + thickness
                || y + thickness >= y2;
            if edge {
                frame.put_pixel(x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor_core::Landmark;

    #[test]
    fn test_border_color_reflects_verdict() {
        let mut frame = RgbImage::new(20, 20);
        annotate(&mut frame, None, &[], &AllowList::default(), false);
        assert_eq!(frame.get_pixel(0, 0), &ALLOWED_COLOR);
        assert_eq!(frame.get_pixel(19, 19), &ALLOWED_COLOR);
        assert_eq!(frame.get_pixel(10, 10), &Rgb([0, 0, 0]));

        annotate(&mut frame, None, &[], &AllowList::default(), true);
        assert_eq!(frame.get_pixel(0, 10), &VIOLATION_COLOR);
    }

    #[test]
    fn test_landmarks_plotted() {
        let mut frame = RgbImage::new(100, 100);
        let mesh = FaceMesh {
            points: vec![Landmark { x: 0.5, y: 0.25 }],
        };
        annotate(&mut frame, Some(&mesh), &[], &AllowList::default(), false);
        assert_eq!(frame.get_pixel(50, 25), &LANDMARK_COLOR);
    }

    #[test]
    fn test_disallowed_box_is_red() {
        let mut frame = RgbImage::new(100, 100);
        let det = Detection {
            label: "cell phone".into(),
            confidence: 0.9,
            bbox: [20.0, 20.0, 60.0, 60.0],
        };
        annotate(&mut frame, None, &[det], &AllowList::default(), true);
        assert_eq!(frame.get_pixel(20, 40), &VIOLATION_COLOR);
        assert_eq!(frame.get_pixel(40, 40), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_box_outside_frame_is_clipped() {
        let mut frame = RgbImage::new(10, 10);
        draw_rect(&mut frame, [-50.0, -50.0, 500.0, 500.0], VIOLATION_COLOR, 1);
        assert_eq!(frame.get_pixel(0, 0), &VIOLATION_COLOR);
        assert_eq!(frame.get_pixel(9, 9), &VIOLATION_COLOR);
    }
}
