//! External connected-component labeling over a binary mask.
//!
//! A component is a maximal 8-connected set of changed pixels together with
//! everything its outer boundary encloses: holes and any blobs nested inside
//! them belong to the enclosing component and are never reported on their own.

use std::collections::VecDeque;

use crate::frame::BoundingBox;

use super::mask::BinaryMask;

const NEIGHBOURS_4: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const NEIGHBOURS_8: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Component {
    /// Pixels enclosed by the outer boundary, boundary included.
    pub area: u64,
    pub bounds: BoundingBox,
}

/// Inclusive pixel-area window for candidate objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeBounds {
    pub min: u64,
    pub max: u64,
}

impl SizeBounds {
    pub fn contains(&self, area: u64) -> bool {
        area >= self.min && area <= self.max
    }
}

/// Label external components in raster order of their top-left-most pixel.
pub fn external_components(mask: &BinaryMask) -> Vec<Component> {
    let filled = fill_enclosed(mask);
    let (w, h) = (mask.width() as usize, mask.height() as usize);
    let mut visited = vec![false; w * h];
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..w * h {
        if !filled[start] || visited[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);

        let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
        let (mut max_x, mut max_y) = (0usize, 0usize);
        let mut area = 0u64;

        while let Some(index) = queue.pop_front() {
            let (x, y) = (index % w, index / w);
            area += 1;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);

            for next in neighbours(x, y, w, h, &NEIGHBOURS_8) {
                if filled[next] && !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }

        components.push(Component {
            area,
            bounds: BoundingBox {
                x: min_x as u32,
                y: min_y as u32,
                width: (max_x - min_x + 1) as u32,
                height: (max_y - min_y + 1) as u32,
            },
        });
    }

    components
}

/// Mark every pixel not reachable from outside the mask through unchanged
/// pixels. Background uses 4-connectivity, the dual of 8-connected
/// foreground, so a diagonal gap does not leak into a hole.
fn fill_enclosed(mask: &BinaryMask) -> Vec<bool> {
    let (w, h) = (mask.width() as usize, mask.height() as usize);
    let bits = mask.bits();
    let mut outside = vec![false; w * h];
    let mut queue = VecDeque::new();

    let border = (0..w)
        .flat_map(|x| [x, (h - 1) * w + x])
        .chain((0..h).flat_map(|y| [y * w, y * w + w - 1]));
    for index in border {
        if !bits[index] && !outside[index] {
            outside[index] = true;
            queue.push_back(index);
        }
    }

    while let Some(index) = queue.pop_front() {
        for next in neighbours(index % w, index / w, w, h, &NEIGHBOURS_4) {
            if !bits[next] && !outside[next] {
                outside[next] = true;
                queue.push_back(next);
            }
        }
    }

    outside.into_iter().map(|o| !o).collect()
}

fn neighbours<'a>(
    x: usize,
    y: usize,
    w: usize,
    h: usize,
    offsets: &'a [(i64, i64)],
) -> impl Iterator<Item = usize> + 'a {
    offsets.iter().filter_map(move |&(dx, dy)| {
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        (nx >= 0 && ny >= 0 && (nx as usize) < w && (ny as usize) < h)
            .then(|| ny as usize * w + nx as usize)
    })
}
