use crate::shared::face_record::BoundingBox;

/// IoU between two face boxes.
pub fn bbox_iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let x1 = a.x1.max(b.x1) as f64;
    let y1 = a.y1.max(b.y1) as f64;
    let x2 = a.x2.min(b.x2) as f64;
    let y2 = a.y2.min(b.y2) as f64;

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }

    let area_a = a.width() as f64 * a.height() as f64;
    let area_b = b.width() as f64 * b.height() as f64;
    inter / (area_a + area_b - inter)
}
