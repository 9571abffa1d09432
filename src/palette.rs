use std::collections::HashMap;

use rgb::RGB;

use crate::histogram::pack;

/// Channel weights for the nearest-color metric, in R, G, B order.
pub const CHANNEL_WEIGHTS: [u32; 3] = [2, 4, 3];

/// Weighted squared RGB distance, `2*dr^2 + 4*dg^2 + 3*db^2`.
#[inline]
pub fn weighted_distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    let dr = a[0] as i32 - b[0] as i32;
    let dg = a[1] as i32 - b[1] as i32;
    let db = a[2] as i32 - b[2] as i32;
    (CHANNEL_WEIGHTS[0] as i32 * dr * dr
        + CHANNEL_WEIGHTS[1] as i32 * dg * dg
        + CHANNEL_WEIGHTS[2] as i32 * db * db) as u32
}

/// An ordered color table of 1 to 256 entries.
///
/// `used` entries were produced by a quantizer; any trailing entries are
/// black padding and are never selected by [`Palette::nearest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<[u8; 3]>,
    used: usize,
}

impl Palette {
    pub fn new(entries: Vec<[u8; 3]>) -> Self {
        debug_assert!(!entries.is_empty() && entries.len() <= 256);
        let used = entries.len();
        Self { entries, used }
    }

    /// Pad `colors` with black up to `size` entries.
    pub fn padded(mut colors: Vec<[u8; 3]>, size: usize) -> Self {
        debug_assert!(!colors.is_empty() && colors.len() <= size && size <= 256);
        let used = colors.len();
        colors.resize(size.max(used), [0, 0, 0]);
        Self {
            entries: colors,
            used,
        }
    }

    pub fn entries(&self) -> &[[u8; 3]] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries produced by the quantizer, excluding padding.
    pub fn used_len(&self) -> usize {
        self.used
    }

    /// Flattened `r, g, b` bytes, the layout GIF color tables use.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.entries.iter().flatten().copied().collect()
    }

    /// Index of the closest entry under [`weighted_distance`].
    ///
    /// Ties go to the lowest index and an exact match stops the scan.
    pub fn nearest(&self, color: RGB<u8>) -> u8 {
        let target = [color.r, color.g, color.b];
        let mut best_idx = 0usize;
        let mut best_dist = u32::MAX;
        for (i, entry) in self.entries[..self.used].iter().enumerate() {
            let d = weighted_distance(target, *entry);
            if d < best_dist {
                best_dist = d;
                best_idx = i;
                if d == 0 {
                    break;
                }
            }
        }
        best_idx as u8
    }
}

/// Memoizes [`Palette::nearest`] per distinct input color.
pub struct NearestCache<'a> {
    palette: &'a Palette,
    cache: HashMap<u32, u8>,
}

impl<'a> NearestCache<'a> {
    pub fn new(palette: &'a Palette) -> Self {
        Self {
            palette,
            cache: HashMap::new(),
        }
    }

    #[inline]
    pub fn lookup(&mut self, color: RGB<u8>) -> u8 {
        let palette = self.palette;
        *self
            .cache
            .entry(pack(color))
            .or_insert_with(|| palette.nearest(color))
    }

    pub fn palette(&self) -> &'a Palette {
        self.palette
    }
}
