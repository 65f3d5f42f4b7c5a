use super::item::TimelineItem;
use super::scale::Scale;

/// Anything with a position on the axis and an optional extent.
pub trait Extent {
    fn value(&self) -> f64;

    fn length(&self) -> f64 {
        0.0
    }
}

impl Extent for TimelineItem {
    fn value(&self) -> f64 {
        TimelineItem::value(self)
    }

    fn length(&self) -> f64 {
        TimelineItem::length(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutParams {
    pub point_diameter: f64,
    pub horizontal_margin: f64,
    pub vertical_margin: f64,
    pub top_padding: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            point_diameter: 12.0,
            horizontal_margin: 4.0,
            vertical_margin: 4.0,
            top_padding: 28.0,
        }
    }
}

/// Placement of one item, in absolute pixels. `index` points into the laid out slice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemLayout {
    pub index: usize,
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
    pub radius: f64,
    pub row: usize,
}

impl ItemLayout {
    pub fn left(&self) -> f64 {
        self.center_x - self.radius
    }

    pub fn right(&self) -> f64 {
        self.left() + self.width
    }

    pub fn top(&self) -> f64 {
        self.center_y - self.radius
    }

    pub fn bottom(&self) -> f64 {
        self.top() + self.height
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left() && x <= self.right() && y >= self.top() && y <= self.bottom()
    }
}

/// Packs items into rows so that no two items in a row overlap.
///
/// Entries are reused in place between updates and truncated when the
/// item count shrinks.
#[derive(Debug, Default)]
pub struct TimelineLayout {
    entries: Vec<ItemLayout>,
    row_right_edges: Vec<f64>,
    params: LayoutParams,
}

impl TimelineLayout {
    pub fn new(params: LayoutParams) -> Self {
        Self {
            entries: Vec::new(),
            row_right_edges: Vec::new(),
            params,
        }
    }

    pub fn params(&self) -> LayoutParams {
        self.params
    }

    pub fn set_params(&mut self, params: LayoutParams) {
        self.params = params;
    }

    pub fn entries(&self) -> &[ItemLayout] {
        &self.entries
    }

    pub fn row_count(&self) -> usize {
        self.row_right_edges.len()
    }

    /// Total height needed to show every row.
    pub fn content_height(&self) -> f64 {
        let params = self.params;
        params.top_padding
            + params.vertical_margin
            + self.row_count() as f64 * (params.point_diameter + params.vertical_margin)
    }

    pub fn row_y(&self, row: usize) -> f64 {
        let params = self.params;
        params.top_padding
            + params.vertical_margin
            + params.point_diameter / 2.0
            + row as f64 * (params.point_diameter + params.vertical_margin)
    }

    /// Items are expected in value order; placement is still non-overlapping otherwise.
    pub fn update<T: Extent>(&mut self, items: &[T], scale: Scale) {
        let params = self.params;
        let radius = params.point_diameter / 2.0;
        self.row_right_edges.clear();
        self.entries.truncate(items.len());

        let mut previous: Option<(f64, usize)> = None;
        for (index, item) in items.iter().enumerate() {
            let center_x = scale.to_pixels(item.value()) as f64;
            let length = item.length();
            let width = if length > 0.0 {
                scale.to_pixels(length) as f64 + params.point_diameter
            } else {
                params.point_diameter
            };
            let left_edge = center_x - radius - params.horizontal_margin;

            let start_row = match previous {
                Some((previous_left, previous_row)) if previous_left == left_edge => previous_row,
                _ => 0,
            };
            let row = self.row_right_edges[start_row.min(self.row_right_edges.len())..]
                .iter()
                .position(|right| *right < left_edge)
                .map(|offset| start_row + offset)
                .unwrap_or(self.row_right_edges.len());

            let right = center_x - radius + width;
            match self.row_right_edges.get_mut(row) {
                Some(edge) => *edge = right,
                None => self.row_right_edges.push(right),
            }
            previous = Some((left_edge, row));

            let entry = ItemLayout {
                index,
                center_x,
                center_y: self.row_y(row),
                width,
                height: params.point_diameter,
                radius,
                row,
            };
            match self.entries.get_mut(index) {
                Some(existing) => *existing = entry,
                None => self.entries.push(entry),
            }
        }
    }

    /// Topmost entry under an absolute pixel position.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<&ItemLayout> {
        self.entries.iter().find(|entry| entry.contains(x, y))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{Extent, LayoutParams, TimelineLayout};
    use crate::timeline::scale::Scale;

    #[derive(Clone, Copy, Debug)]
    struct Point(f64, f64);

    impl Extent for Point {
        fn value(&self) -> f64 {
            self.0
        }

        fn length(&self) -> f64 {
            self.1
        }
    }

    fn params() -> LayoutParams {
        LayoutParams {
            point_diameter: 10.0,
            horizontal_margin: 2.0,
            vertical_margin: 3.0,
            top_padding: 20.0,
        }
    }

    fn rows(layout: &TimelineLayout) -> Vec<usize> {
        layout.entries().iter().map(|entry| entry.row).collect()
    }

    #[test]
    fn spaced_items_share_the_first_row() {
        let mut layout = TimelineLayout::new(params());
        layout.update(&[Point(0.0, 0.0), Point(20.0, 0.0), Point(40.0, 0.0)], Scale::UNIT);
        assert_eq!(rows(&layout), vec![0, 0, 0]);
        assert_eq!(layout.entries()[0].center_y, 20.0 + 3.0 + 5.0);
    }

    #[test]
    fn close_items_stack_and_reuse_free_rows() {
        let mut layout = TimelineLayout::new(params());
        layout.update(
            &[Point(0.0, 0.0), Point(5.0, 0.0), Point(10.0, 0.0), Point(30.0, 0.0)],
            Scale::UNIT,
        );
        assert_eq!(rows(&layout), vec![0, 1, 2, 0]);
        assert_eq!(layout.row_count(), 3);
        assert_eq!(layout.entries()[1].center_y - layout.entries()[0].center_y, 13.0);
    }

    #[test]
    fn duplicates_resume_from_the_previous_row() {
        let mut layout = TimelineLayout::new(params());
        layout.update(
            &[Point(0.0, 0.0), Point(100.0, 0.0), Point(100.0, 0.0), Point(100.0, 0.0)],
            Scale::UNIT,
        );
        assert_eq!(rows(&layout), vec![0, 0, 1, 2]);
    }

    #[test]
    fn ranged_items_reserve_their_length() {
        let mut layout = TimelineLayout::new(params());
        let points = [Point(0.0, 100.0), Point(50.0, 0.0), Point(130.0, 0.0)];
        layout.update(&points, Scale::or_unit(2.0));
        let first = layout.entries()[0];
        assert_eq!(first.width, 60.0);
        assert_eq!(first.right(), 55.0);
        assert_eq!(rows(&layout), vec![0, 1, 0]);
    }

    #[test]
    fn reuses_and_truncates_previous_entries() {
        let mut layout = TimelineLayout::new(params());
        layout.update(&[Point(0.0, 0.0), Point(1.0, 0.0), Point(2.0, 0.0)], Scale::UNIT);
        assert_eq!(layout.entries().len(), 3);

        layout.update(&[Point(0.0, 0.0)], Scale::UNIT);
        assert_eq!(layout.entries().len(), 1);
        assert_eq!(layout.row_count(), 1);
        assert!(layout.hit_test(0.0, 28.0).is_some());
        assert!(layout.hit_test(0.0, 0.0).is_none());
    }

    fn sorted_points() -> impl Strategy<Value = Vec<Point>> {
        prop::collection::vec((0u32..2_000, prop_oneof![Just(0u32), 1u32..300]), 0..200).prop_map(
            |mut raw| {
                raw.sort_by_key(|(value, _)| *value);
                raw.into_iter()
                    .map(|(value, length)| Point(f64::from(value), f64::from(length)))
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn rows_never_overlap(points in sorted_points(), ratio in 1u32..20) {
            let params = params();
            let mut layout = TimelineLayout::new(params);
            layout.update(&points, Scale::or_unit(f64::from(ratio)));

            let entries = layout.entries();
            prop_assert_eq!(entries.len(), points.len());
            for (i, a) in entries.iter().enumerate() {
                for b in &entries[i + 1..] {
                    if a.row == b.row {
                        prop_assert!(a.right() + params.horizontal_margin < b.left());
                    }
                }
            }
        }

        #[test]
        fn layout_is_deterministic(points in sorted_points(), ratio in 1u32..20) {
            let scale = Scale::or_unit(f64::from(ratio));
            let mut first = TimelineLayout::new(params());
            first.update(&points, scale);
            let mut second = TimelineLayout::new(params());
            second.update(&points, scale);
            second.update(&points, scale);
            prop_assert_eq!(first.entries(), second.entries());
        }
    }
}
