use rgb::RGB;

use crate::octree::morton_key;
use crate::palette::{CHANNEL_WEIGHTS, Palette};

#[inline]
fn channel(p: &RGB<u8>, axis: usize) -> u8 {
    match axis {
        0 => p.r,
        1 => p.g,
        _ => p.b,
    }
}

/// A contiguous run of pixels in the shared working buffer.
#[derive(Debug, Clone)]
struct ColorBox {
    start: usize,
    end: usize,
    min: [u8; 3],
    max: [u8; 3],
}

impl ColorBox {
    fn new(pixels: &[RGB<u8>], start: usize, end: usize) -> Self {
        let mut min = [u8::MAX; 3];
        let mut max = [u8::MIN; 3];
        for p in &pixels[start..end] {
            for axis in 0..3 {
                let v = channel(p, axis);
                min[axis] = min[axis].min(v);
                max[axis] = max[axis].max(v);
            }
        }
        Self {
            start,
            end,
            min,
            max,
        }
    }

    fn len(&self) -> usize {
        self.end - self.start
    }

    fn ranges(&self) -> [u32; 3] {
        [0, 1, 2].map(|axis| (self.max[axis] - self.min[axis]) as u32)
    }

    /// Split priority: sum of the channel ranges scaled 2:4:3.
    fn weighted_range(&self) -> u32 {
        let r = self.ranges();
        (0..3).map(|axis| r[axis] * CHANNEL_WEIGHTS[axis]).sum()
    }

    fn splittable(&self) -> bool {
        self.len() >= 2 && self.weighted_range() > 0
    }

    /// Channel with the largest unweighted range, R before G before B on ties.
    fn split_axis(&self) -> usize {
        let [r, g, b] = self.ranges();
        if r >= g && r >= b {
            0
        } else if g >= b {
            1
        } else {
            2
        }
    }

    /// Sort on the widest channel and cut at the midpoint index.
    fn split(self, pixels: &mut [RGB<u8>]) -> (ColorBox, ColorBox) {
        let axis = self.split_axis();
        pixels[self.start..self.end].sort_unstable_by_key(|p| (channel(p, axis), p.r, p.g, p.b));
        let mid = self.start + self.len() / 2;
        (
            ColorBox::new(pixels, self.start, mid),
            ColorBox::new(pixels, mid, self.end),
        )
    }

    /// Unweighted channel means, truncated.
    fn mean(&self, pixels: &[RGB<u8>]) -> [u8; 3] {
        let mut sums = [0u64; 3];
        for p in &pixels[self.start..self.end] {
            sums[0] += p.r as u64;
            sums[1] += p.g as u64;
            sums[2] += p.b as u64;
        }
        let n = self.len().max(1) as u64;
        sums.map(|s| (s / n) as u8)
    }
}

/// Median-cut quantization over the full pixel multiset.
///
/// Repeatedly splits the box with the largest weighted channel range until
/// `max_colors` boxes exist or nothing is left to split. Returns one entry
/// per box, ordered by octree leaf order, with no padding.
pub fn median_cut(mut pixels: Vec<RGB<u8>>, max_colors: usize) -> Vec<[u8; 3]> {
    if pixels.is_empty() || max_colors == 0 {
        return Vec::new();
    }

    let mut boxes = Vec::with_capacity(max_colors);
    boxes.push(ColorBox::new(&pixels, 0, pixels.len()));

    while boxes.len() < max_colors {
        let best_idx = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.splittable())
            .fold(None::<(usize, u32)>, |best, (i, b)| {
                let range = b.weighted_range();
                match best {
                    Some((_, r)) if r >= range => best,
                    _ => Some((i, range)),
                }
            })
            .map(|(i, _)| i);

        let Some(idx) = best_idx else {
            break;
        };

        // Keep the remaining boxes in order; ties go to the earliest one.
        let to_split = boxes.remove(idx);
        let (left, right) = to_split.split(&mut pixels);
        boxes.push(left);
        boxes.push(right);
    }

    let mut colors: Vec<[u8; 3]> = boxes.iter().map(|b| b.mean(&pixels)).collect();
    colors.sort_by_key(|c| morton_key(RGB::new(c[0], c[1], c[2])));
    log::debug!(
        "median cut: {} pixels split into {} boxes",
        pixels.len(),
        colors.len()
    );
    colors
}

/// Build an unpadded palette from `pixels`.
pub fn build_palette(pixels: &[RGB<u8>], max_colors: usize) -> Palette {
    let mut colors = median_cut(pixels.to_vec(), max_colors);
    if colors.is_empty() {
        colors.push([0, 0, 0]);
    }
    Palette::new(colors)
}
