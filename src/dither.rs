use rgb::RGB;

use crate::palette::{NearestCache, Palette};

/// Dithering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DitherMode {
    /// No dithering, nearest color only.
    #[default]
    None,
    /// Classic Floyd-Steinberg error diffusion.
    FloydSteinberg,
}

/// Floyd-Steinberg taps as `(dx, dy, numerator)` over a denominator of 16.
const KERNEL: [(isize, usize, i32); 4] = [(1, 0, 7), (-1, 1, 3), (0, 1, 5), (1, 1, 1)];

/// Apply Floyd-Steinberg error diffusion against a fixed palette.
///
/// The accumulator is `i32` per channel and is clamped to `0..=255` before
/// each lookup. Error shares use integer division, truncating toward zero.
/// Pixels that already match a palette entry carry no error, so an image made
/// only of palette colors maps exactly as it would without dithering.
pub fn dither_image(
    pixels: &[RGB<u8>],
    width: usize,
    height: usize,
    palette: &Palette,
) -> Vec<u8> {
    assert_eq!(pixels.len(), width * height);

    let mut acc: Vec<[i32; 3]> = pixels
        .iter()
        .map(|p| [p.r as i32, p.g as i32, p.b as i32])
        .collect();
    let mut indices = vec![0u8; pixels.len()];
    let mut cache = NearestCache::new(palette);
    let entries = palette.entries();

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let old = acc[idx].map(|c| c.clamp(0, 255));
            let chosen = cache.lookup(RGB::new(old[0] as u8, old[1] as u8, old[2] as u8));
            indices[idx] = chosen;

            let entry = entries[chosen as usize];
            let err = [
                old[0] - entry[0] as i32,
                old[1] - entry[1] as i32,
                old[2] - entry[2] as i32,
            ];
            if err == [0, 0, 0] {
                continue;
            }

            for &(dx, dy, weight) in &KERNEL {
                let nx = x as isize + dx;
                let ny = y + dy;
                if nx < 0 || nx as usize >= width || ny >= height {
                    continue;
                }
                let target = &mut acc[ny * width + nx as usize];
                for c in 0..3 {
                    target[c] += err[c] * weight / 16;
                }
            }
        }
    }

    indices
}
