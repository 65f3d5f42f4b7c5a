use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke};

use crate::timeline::ruler::RulerLabel;

pub(super) const BACKGROUND: Color32 = Color32::from_rgb(19, 23, 29);
pub(super) const RULER_HEIGHT: f32 = 24.0;

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

pub(super) fn draw_background(painter: &Painter, rect: Rect) {
    painter.rect_filled(rect, 0.0, BACKGROUND);
}

/// Draws tick lines across the canvas and label text inside the ruler band.
/// `labels` pairs each label with its screen x.
pub(super) fn draw_ruler(painter: &Painter, rect: Rect, labels: &[(f32, &RulerLabel)]) {
    let band = Rect::from_min_max(rect.min, Pos2::new(rect.right(), rect.top() + RULER_HEIGHT));
    painter.rect_filled(band, 0.0, Color32::from_rgb(27, 32, 40));

    for (x, label) in labels {
        if *x < rect.left() - 1.0 || *x > rect.right() + 1.0 {
            continue;
        }
        painter.line_segment(
            [Pos2::new(*x, band.bottom()), Pos2::new(*x, rect.bottom())],
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70)),
        );
        painter.line_segment(
            [Pos2::new(*x, band.bottom() - 6.0), Pos2::new(*x, band.bottom())],
            Stroke::new(1.0, Color32::from_gray(140)),
        );
        painter.text(
            Pos2::new(*x + 4.0, band.center().y),
            Align2::LEFT_CENTER,
            &label.text,
            FontId::proportional(11.0),
            Color32::from_gray(200),
        );
    }
}

/// Whether a horizontal span at `y` with half height `half_height` intersects `rect`.
pub(super) fn span_visible(rect: Rect, left: f32, right: f32, y: f32, half_height: f32) -> bool {
    !(right < rect.left()
        || left > rect.right()
        || y + half_height < rect.top()
        || y - half_height > rect.bottom())
}
