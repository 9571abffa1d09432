use rgb::RGB;

use crate::palette::{NearestCache, Palette};

/// Map each pixel to the index of its nearest palette entry.
///
/// Lookups are memoized per distinct color, so cost scales with the number
/// of unique colors rather than the pixel count.
pub fn remap_pixels(pixels: &[RGB<u8>], palette: &Palette) -> Vec<u8> {
    let mut cache = NearestCache::new(palette);
    pixels.iter().map(|&p| cache.lookup(p)).collect()
}

/// Expand indices back to colors through `palette`.
pub fn reconstruct(indices: &[u8], palette: &Palette) -> Vec<RGB<u8>> {
    let entries = palette.entries();
    indices
        .iter()
        .map(|&i| {
            let [r, g, b] = entries[i as usize];
            RGB::new(r, g, b)
        })
        .collect()
}
