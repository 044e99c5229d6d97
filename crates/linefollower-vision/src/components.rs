//! Connected-component extraction over the search region of a binary mask.
//!
//! Foreground is any non-zero mask pixel and is 8-connected; background is
//! 4-connected. Only external components are reported: a component sitting
//! inside a hole of another component is skipped, and holes never split a
//! component.
//!
//! Components are numbered in raster order (top row first, left to right)
//! by the first pixel the scan meets, which gives every caller a stable
//! tie-break.

use image::GrayImage;

const UNLABELLED: u32 = 0;

const NEIGHBOURS_8: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

const NEIGHBOURS_4: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

/// One external foreground component.
#[derive(Debug, Clone)]
pub(crate) struct Component {
    /// Position in raster discovery order.
    pub(crate) order: usize,
    /// Foreground pixel count.
    pub(crate) area: usize,
    /// Leftmost and rightmost pixel of each row the component covers.
    pub(crate) row_extremes: Vec<(i32, i32, i32)>,
}

impl Component {
    /// Points sufficient to build the component's convex hull.
    pub(crate) fn hull_candidates(&self) -> Vec<(i64, i64)> {
        let mut points = Vec::with_capacity(self.row_extremes.len() * 2);
        for &(y, min_x, max_x) in &self.row_extremes {
            points.push((min_x as i64, y as i64));
            if max_x != min_x {
                points.push((max_x as i64, y as i64));
            }
        }
        points
    }
}

struct Region<'a> {
    mask: &'a GrayImage,
    width: i32,
    rows: i32,
}

impl Region<'_> {
    fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.rows
    }

    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn is_foreground(&self, x: i32, y: i32) -> bool {
        self.mask.get_pixel(x as u32, y as u32).0[0] != 0
    }

    fn on_border(&self, x: i32, y: i32) -> bool {
        x == 0 || y == 0 || x == self.width - 1 || y == self.rows - 1
    }
}

/// External components of `mask` restricted to rows `[0, rows)`.
pub(crate) fn external_components(mask: &GrayImage, rows: u32) -> Vec<Component> {
    let region = Region {
        mask,
        width: mask.width() as i32,
        rows: rows.min(mask.height()) as i32,
    };
    if region.width == 0 || region.rows == 0 {
        return Vec::new();
    }

    let (labels, count) = label_foreground(&region);
    let outside = outside_background(&region);

    let mut area = vec![0usize; count];
    let mut external = vec![false; count];
    let mut extremes: Vec<Vec<(i32, i32, i32)>> = vec![Vec::new(); count];

    for y in 0..region.rows {
        for x in 0..region.width {
            let label = labels[region.index(x, y)];
            if label == UNLABELLED {
                continue;
            }
            let slot = (label - 1) as usize;
            area[slot] += 1;

            match extremes[slot].last_mut() {
                Some(row) if row.0 == y => row.2 = x,
                _ => extremes[slot].push((y, x, x)),
            }

            if !external[slot] {
                external[slot] = region.on_border(x, y)
                    || NEIGHBOURS_4.iter().any(|&(dx, dy)| {
                        let (nx, ny) = (x + dx, y + dy);
                        region.contains(nx, ny) && outside[region.index(nx, ny)]
                    });
            }
        }
    }

    extremes
        .into_iter()
        .enumerate()
        .filter(|(slot, _)| external[*slot])
        .map(|(slot, row_extremes)| Component {
            order: slot,
            area: area[slot],
            row_extremes,
        })
        .collect()
}

/// Label 8-connected foreground components in raster discovery order.
fn label_foreground(region: &Region<'_>) -> (Vec<u32>, usize) {
    let mut labels = vec![UNLABELLED; (region.width * region.rows) as usize];
    let mut next_label = 0u32;
    let mut stack = Vec::new();

    for y in 0..region.rows {
        for x in 0..region.width {
            let idx = region.index(x, y);
            if labels[idx] != UNLABELLED || !region.is_foreground(x, y) {
                continue;
            }
            next_label += 1;
            labels[idx] = next_label;
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for &(dx, dy) in &NEIGHBOURS_8 {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if !region.contains(nx, ny) {
                        continue;
                    }
                    let nidx = region.index(nx, ny);
                    if labels[nidx] == UNLABELLED && region.is_foreground(nx, ny) {
                        labels[nidx] = next_label;
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }

    (labels, next_label as usize)
}

/// Background pixels 4-connected to the region border.
fn outside_background(region: &Region<'_>) -> Vec<bool> {
    let mut outside = vec![false; (region.width * region.rows) as usize];
    let mut stack = Vec::new();

    for y in 0..region.rows {
        for x in 0..region.width {
            if region.on_border(x, y) && !region.is_foreground(x, y) {
                let idx = region.index(x, y);
                if !outside[idx] {
                    outside[idx] = true;
                    stack.push((x, y));
                }
            }
        }
    }

    while let Some((cx, cy)) = stack.pop() {
        for &(dx, dy) in &NEIGHBOURS_4 {
            let (nx, ny) = (cx + dx, cy + dy);
            if !region.contains(nx, ny) {
                continue;
            }
            let nidx = region.index(nx, ny);
            if !outside[nidx] && !region.is_foreground(nx, ny) {
                outside[nidx] = true;
                stack.push((nx, ny));
            }
        }
    }

    outside
}
