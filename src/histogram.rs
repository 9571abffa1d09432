use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

use rgb::RGB;

#[inline]
pub(crate) fn pack(p: RGB<u8>) -> u32 {
    (p.r as u32) << 16 | (p.g as u32) << 8 | p.b as u32
}

#[inline]
pub(crate) fn unpack(k: u32) -> RGB<u8> {
    RGB {
        r: (k >> 16) as u8,
        g: (k >> 8) as u8,
        b: k as u8,
    }
}

/// Exact-color frequency table.
///
/// Keys are packed `0xRRGGBB`, so iteration order is deterministic and
/// independent of pixel order.
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    counts: BTreeMap<u32, u64>,
    total: u64,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pixels(pixels: &[RGB<u8>]) -> Self {
        let mut hist = Self::new();
        hist.add_pixels(pixels);
        hist
    }

    /// Accumulate more pixels, e.g. successive animation frames.
    pub fn add_pixels(&mut self, pixels: &[RGB<u8>]) {
        for &p in pixels {
            *self.counts.entry(pack(p)).or_insert(0) += 1;
        }
        self.total += pixels.len() as u64;
    }

    /// Number of distinct colors.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total pixel count across all entries.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count(&self, color: RGB<u8>) -> u64 {
        self.counts.get(&pack(color)).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.counts.iter(),
        }
    }

    /// Distinct colors, if there are no more than `max_colors` of them.
    pub fn distinct_colors(&self, max_colors: usize) -> Option<Vec<RGB<u8>>> {
        if self.counts.len() > max_colors {
            return None;
        }
        Some(self.counts.keys().map(|&k| unpack(k)).collect())
    }

    /// Expand back into one pixel per counted occurrence.
    pub fn expand(&self) -> Vec<RGB<u8>> {
        let mut out = Vec::with_capacity(self.total as usize);
        for (color, count) in self.iter() {
            out.extend(std::iter::repeat(color).take(count as usize));
        }
        out
    }
}

pub struct Iter<'a> {
    inner: btree_map::Iter<'a, u32, u64>,
}

impl Iterator for Iter<'_> {
    type Item = (RGB<u8>, u64);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(&k, &n)| (unpack(k), n))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Detect if an image uses at most `max_colors` unique colors.
/// Returns the distinct colors if so, `None` if more colors exist.
/// Scans only until `max_colors + 1` unique colors are found.
pub(crate) fn detect_exact_palette(pixels: &[RGB<u8>], max_colors: usize) -> Option<Vec<RGB<u8>>> {
    let mut seen = BTreeSet::new();
    for &p in pixels {
        seen.insert(pack(p));
        if seen.len() > max_colors {
            return None;
        }
    }
    Some(seen.into_iter().map(unpack).collect())
}
