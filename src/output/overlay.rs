use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::data::Detection;

/// Fixed palette keyed by class id: pass, reject, foreign object, then a
/// catch-all for anything unconfigured.
pub fn class_color(class_id: usize) -> Rgb<u8> {
    match class_id {
        0 => Rgb([0, 255, 0]),
        1 => Rgb([255, 0, 0]),
        2 => Rgb([0, 0, 255]),
        _ => Rgb([255, 255, 255]),
    }
}

/// Draws hollow rectangles for the retained detections onto the frame copy
/// that goes to the display sink.
pub fn annotate(image: &mut RgbImage, detections: &[Detection]) {
    for det in detections {
        let (x1, y1, x2, y2) = det.bbox.as_x1y1_x2y2_i32();
        let w = (x2 - x1).max(1) as u32;
        let h = (y2 - y1).max(1) as u32;
        let rect = Rect::at(x1, y1).of_size(w, h);
        draw_hollow_rect_mut(image, rect, class_color(det.class_id));
    }
}
