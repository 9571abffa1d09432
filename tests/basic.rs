use webp2gifjpeg::{DitherMode, QuantizeConfig, QuantizeError, Quantizer};

fn gradient(width: usize, height: usize) -> Vec<rgb::RGB<u8>> {
    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / width) as u8;
            let g = (y * 255 / height) as u8;
            let b = ((x + y) * 255 / (width + height)) as u8;
            pixels.push(rgb::RGB { r, g, b });
        }
    }
    pixels
}

/// xorshift32, so runs are reproducible without a rand dependency.
fn noise(n: usize, mut state: u32) -> Vec<rgb::RGB<u8>> {
    (0..n)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            rgb::RGB {
                r: state as u8,
                g: (state >> 8) as u8,
                b: (state >> 16) as u8,
            }
        })
        .collect()
}

#[test]
fn smoke_test_rgb() {
    let (width, height) = (32, 32);
    let pixels = gradient(width, height);

    let config = QuantizeConfig::default();
    let result = webp2gifjpeg::quantize(&pixels, width, height, &config).unwrap();

    assert_eq!(result.palette_len(), 256);
    assert_eq!(result.indices().len(), width * height);
    for &idx in result.indices() {
        assert!((idx as usize) < result.palette_len());
    }
}

#[test]
fn totality_across_modes() {
    let (width, height) = (24, 20);
    let pixels = noise(width * height, 0x1234_5678);

    for quantizer in [Quantizer::Octree, Quantizer::MedianCut] {
        for dither in [DitherMode::None, DitherMode::FloydSteinberg] {
            for max_colors in [1u32, 2, 3, 8, 16, 100, 255, 256] {
                let config = QuantizeConfig::new()
                    .max_colors(max_colors)
                    .quantizer(quantizer)
                    .dither(dither);
                let result = webp2gifjpeg::quantize(&pixels, width, height, &config).unwrap();
                let len = result.palette_len();
                assert!(
                    (1..=max_colors as usize).contains(&len),
                    "{quantizer:?}/{dither:?}/{max_colors}: palette len {len}"
                );
                assert_eq!(result.indices().len(), width * height);
                assert!(result.indices().iter().all(|&i| (i as usize) < len));
            }
        }
    }
}

#[test]
fn exact_palette_is_lossless() {
    let colors = [
        rgb::RGB { r: 255, g: 0, b: 0 },
        rgb::RGB { r: 0, g: 255, b: 0 },
        rgb::RGB { r: 0, g: 0, b: 255 },
        rgb::RGB {
            r: 12,
            g: 34,
            b: 56,
        },
    ];
    let pixels: Vec<rgb::RGB<u8>> = (0..64).map(|i| colors[i % colors.len()]).collect();

    for quantizer in [Quantizer::Octree, Quantizer::MedianCut] {
        let config = QuantizeConfig::new().max_colors(16).quantizer(quantizer);
        let result = webp2gifjpeg::quantize(&pixels, 8, 8, &config).unwrap();
        for (p, &idx) in pixels.iter().zip(result.indices()) {
            assert_eq!(result.palette()[idx as usize], [p.r, p.g, p.b]);
        }
    }
}

#[test]
fn octree_pads_median_cut_does_not() {
    let pixels = vec![rgb::RGB { r: 7, g: 7, b: 7 }; 16];

    let octree = webp2gifjpeg::quantize(
        &pixels,
        4,
        4,
        &QuantizeConfig::new().max_colors(32).quantizer(Quantizer::Octree),
    )
    .unwrap();
    assert_eq!(octree.palette_len(), 32);
    assert_eq!(octree.palette()[0], [7, 7, 7]);
    assert!(octree.palette()[1..].iter().all(|&c| c == [0, 0, 0]));

    let median = webp2gifjpeg::quantize(
        &pixels,
        4,
        4,
        &QuantizeConfig::new().max_colors(32).quantizer(Quantizer::MedianCut),
    )
    .unwrap();
    assert_eq!(median.palette_len(), 1);
    assert!(median.indices().iter().all(|&i| i == 0));
}

#[test]
fn deterministic_output() {
    let pixels = noise(64 * 64, 42);
    for quantizer in [Quantizer::Octree, Quantizer::MedianCut] {
        let config = QuantizeConfig::new()
            .max_colors(64)
            .quantizer(quantizer)
            .dither(DitherMode::FloydSteinberg);
        let a = webp2gifjpeg::quantize(&pixels, 64, 64, &config).unwrap();
        let b = webp2gifjpeg::quantize(&pixels, 64, 64, &config).unwrap();
        assert_eq!(a.palette(), b.palette());
        assert_eq!(a.indices(), b.indices());
    }
}

#[test]
fn dither_keeps_exact_members() {
    // Every pixel is a palette member, so there is no error to diffuse.
    let pixels: Vec<rgb::RGB<u8>> = (0..100)
        .map(|i| {
            if (i / 3) % 2 == 0 {
                rgb::RGB { r: 0, g: 0, b: 0 }
            } else {
                rgb::RGB {
                    r: 250,
                    g: 240,
                    b: 230,
                }
            }
        })
        .collect();
    let base = QuantizeConfig::new().max_colors(8);
    let plain = webp2gifjpeg::quantize(&pixels, 10, 10, &base.clone()).unwrap();
    let dithered =
        webp2gifjpeg::quantize(&pixels, 10, 10, &base.dither(DitherMode::FloydSteinberg))
            .unwrap();
    assert_eq!(plain.palette(), dithered.palette());
    assert_eq!(plain.indices(), dithered.indices());
}

#[test]
fn dithering_never_changes_the_palette() {
    let pixels = gradient(40, 30);
    for quantizer in [Quantizer::Octree, Quantizer::MedianCut] {
        let base = QuantizeConfig::new().max_colors(12).quantizer(quantizer);
        let plain = webp2gifjpeg::quantize(&pixels, 40, 30, &base.clone()).unwrap();
        let dithered =
            webp2gifjpeg::quantize(&pixels, 40, 30, &base.dither(DitherMode::FloydSteinberg))
                .unwrap();
        assert_eq!(plain.palette(), dithered.palette());
    }
}

#[test]
fn median_cut_million_random_pixels() {
    let (width, height) = (1000, 1000);
    let pixels = noise(width * height, 0xDEAD_BEEF);
    let config = QuantizeConfig::new()
        .max_colors(16)
        .quantizer(Quantizer::MedianCut);
    let result = webp2gifjpeg::quantize(&pixels, width, height, &config).unwrap();

    assert_eq!(result.palette_len(), 16);

    // Re-running nearest match over the returned palette is a fixed point.
    let again = webp2gifjpeg::remap_with_palette(
        &pixels,
        width,
        height,
        result.as_palette(),
        DitherMode::None,
    )
    .unwrap();
    assert_eq!(again.as_slice(), result.indices());
}

#[test]
fn error_zero_dimension() {
    let pixels: Vec<rgb::RGB<u8>> = vec![];
    let config = QuantizeConfig::default();
    let result = webp2gifjpeg::quantize(&pixels, 0, 0, &config);
    assert!(matches!(result, Err(QuantizeError::ZeroDimension)));
}

#[test]
fn error_dimension_mismatch() {
    let pixels = vec![rgb::RGB { r: 0, g: 0, b: 0 }; 10];
    let config = QuantizeConfig::default();
    let result = webp2gifjpeg::quantize(&pixels, 5, 5, &config);
    assert!(matches!(
        result,
        Err(QuantizeError::DimensionMismatch {
            len: 10,
            width: 5,
            height: 5
        })
    ));
}

#[test]
fn error_invalid_max_colors() {
    let pixels = vec![rgb::RGB { r: 0, g: 0, b: 0 }; 4];
    for bad in [0u32, 257, 1000] {
        let config = QuantizeConfig::new().max_colors(bad);
        let result = webp2gifjpeg::quantize(&pixels, 2, 2, &config);
        assert!(matches!(result, Err(QuantizeError::InvalidMaxColors(n)) if n == bad));
    }
}

#[test]
fn single_pixel_image() {
    let pixels = vec![rgb::RGB {
        r: 42,
        g: 128,
        b: 200,
    }];
    for quantizer in [Quantizer::Octree, Quantizer::MedianCut] {
        let config = QuantizeConfig::new().max_colors(1).quantizer(quantizer);
        let result = webp2gifjpeg::quantize(&pixels, 1, 1, &config).unwrap();
        assert_eq!(result.palette(), &[[42, 128, 200]]);
        assert_eq!(result.indices(), &[0]);
    }
}
