//! Fixture builders shared by the integration tests.
#![allow(dead_code)]

use std::path::Path;

use image_webp::{ColorType, WebPEncoder};

/// Lossless still WebP from packed pixels.
pub fn still_webp(width: u32, height: u32, data: &[u8], color: ColorType) -> Vec<u8> {
    let mut out = Vec::new();
    WebPEncoder::new(&mut out)
        .encode(data, width, height, color)
        .unwrap();
    out
}

pub fn solid_still(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let data: Vec<u8> = (0..width * height).flat_map(|_| rgb).collect();
    still_webp(width, height, &data, ColorType::Rgb8)
}

fn push_u24(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes()[..3]);
}

fn push_chunk(out: &mut Vec<u8>, fourcc: &[u8; 4], payload: &[u8]) {
    out.extend_from_slice(fourcc);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
}

/// The raw `VP8L` chunk (header included) of a simple-format lossless file.
fn vp8l_chunk(webp: &[u8]) -> &[u8] {
    assert_eq!(&webp[12..16], b"VP8L", "encoder produced an extended file");
    &webp[12..]
}

/// One animation frame: full-canvas RGBA pixels and a duration.
pub struct FrameSpec {
    pub rgba: Vec<u8>,
    pub duration_ms: u32,
}

impl FrameSpec {
    pub fn solid(width: u32, height: u32, rgba: [u8; 4], duration_ms: u32) -> Self {
        Self {
            rgba: (0..width * height).flat_map(|_| rgba).collect(),
            duration_ms,
        }
    }
}

/// Mux full-canvas frames into an animated WebP (VP8X + ANIM + ANMF).
pub fn animated_webp(width: u32, height: u32, frames: &[FrameSpec]) -> Vec<u8> {
    let has_alpha = frames
        .iter()
        .any(|f| f.rgba.chunks_exact(4).any(|p| p[3] != 255));

    let mut body = Vec::new();

    let mut vp8x = Vec::with_capacity(10);
    vp8x.push(0x02 | if has_alpha { 0x10 } else { 0 });
    vp8x.extend_from_slice(&[0, 0, 0]);
    push_u24(&mut vp8x, width - 1);
    push_u24(&mut vp8x, height - 1);
    push_chunk(&mut body, b"VP8X", &vp8x);

    // White background, loop forever.
    let mut anim = vec![0xFF, 0xFF, 0xFF, 0xFF];
    anim.extend_from_slice(&0u16.to_le_bytes());
    push_chunk(&mut body, b"ANIM", &anim);

    for frame in frames {
        let still = still_webp(width, height, &frame.rgba, ColorType::Rgba8);
        let mut anmf = Vec::new();
        push_u24(&mut anmf, 0);
        push_u24(&mut anmf, 0);
        push_u24(&mut anmf, width - 1);
        push_u24(&mut anmf, height - 1);
        push_u24(&mut anmf, frame.duration_ms);
        // No blending, no dispose.
        anmf.push(0x02);
        anmf.extend_from_slice(vp8l_chunk(&still));
        push_chunk(&mut body, b"ANMF", &anmf);
    }

    let mut out = Vec::with_capacity(body.len() + 12);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(body.len() as u32 + 4).to_le_bytes());
    out.extend_from_slice(b"WEBP");
    out.extend_from_slice(&body);
    out
}

/// Byte offset of the VP8L signature inside each ANMF chunk, found by
/// walking the RIFF chunk list.
pub fn frame_signature_offsets(webp: &[u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut pos = 12;
    while pos + 8 <= webp.len() {
        let size = u32::from_le_bytes(webp[pos + 4..pos + 8].try_into().unwrap()) as usize;
        if &webp[pos..pos + 4] == b"ANMF" {
            // 16 bytes of frame fields, then the VP8L chunk header.
            let sub = pos + 8 + 16;
            assert_eq!(&webp[sub..sub + 4], b"VP8L");
            offsets.push(sub + 8);
        }
        pos += 8 + size + (size & 1);
    }
    offsets
}

/// `count` solid frames cycling through a few distinct colors.
pub fn color_cycle(width: u32, height: u32, count: usize, duration_ms: u32) -> Vec<u8> {
    const COLORS: [[u8; 4]; 5] = [
        [255, 0, 0, 255],
        [0, 255, 0, 255],
        [0, 0, 255, 255],
        [255, 255, 0, 255],
        [40, 40, 40, 255],
    ];
    let frames: Vec<FrameSpec> = (0..count)
        .map(|i| FrameSpec::solid(width, height, COLORS[i % COLORS.len()], duration_ms))
        .collect();
    animated_webp(width, height, &frames)
}

pub fn write(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

/// Block-level GIF census.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct GifBlocks {
    pub width: u16,
    pub height: u16,
    pub global_table: bool,
    pub netscape_loops: Option<u16>,
    pub images: usize,
    /// Image descriptors directly preceded by a Graphics Control Extension.
    pub images_with_gce: usize,
    pub local_tables: usize,
    pub interlaced: usize,
    pub delays: Vec<u16>,
    pub disposals: Vec<u8>,
}

fn skip_sub_blocks(data: &[u8], mut pos: usize) -> usize {
    loop {
        let len = data[pos] as usize;
        pos += 1;
        if len == 0 {
            return pos;
        }
        pos += len;
    }
}

/// Walk a GIF stream without decoding image data.
pub fn gif_blocks(data: &[u8]) -> GifBlocks {
    assert_eq!(&data[..6], b"GIF89a");
    let mut info = GifBlocks {
        width: u16::from_le_bytes([data[6], data[7]]),
        height: u16::from_le_bytes([data[8], data[9]]),
        ..Default::default()
    };
    let flags = data[10];
    let mut pos = 13;
    if flags & 0x80 != 0 {
        info.global_table = true;
        pos += 3 * (1 << ((flags & 0x07) + 1));
    }

    let mut pending_gce = false;
    loop {
        match data[pos] {
            0x21 => {
                let label = data[pos + 1];
                if label == 0xF9 {
                    let block = &data[pos + 2..pos + 8];
                    info.disposals.push((block[1] >> 2) & 0x07);
                    info.delays.push(u16::from_le_bytes([block[2], block[3]]));
                    pending_gce = true;
                } else if label == 0xFF && &data[pos + 3..pos + 14] == b"NETSCAPE2.0" {
                    let sub = &data[pos + 14..];
                    info.netscape_loops = Some(u16::from_le_bytes([sub[2], sub[3]]));
                }
                pos = skip_sub_blocks(data, pos + 2);
            }
            0x2C => {
                info.images += 1;
                if pending_gce {
                    info.images_with_gce += 1;
                }
                pending_gce = false;
                let flags = data[pos + 9];
                pos += 10;
                if flags & 0x40 != 0 {
                    info.interlaced += 1;
                }
                if flags & 0x80 != 0 {
                    info.local_tables += 1;
                    pos += 3 * (1 << ((flags & 0x07) + 1));
                }
                // LZW minimum code size, then the data sub-blocks.
                pos = skip_sub_blocks(data, pos + 1);
            }
            0x3B => break,
            other => panic!("unexpected GIF block 0x{other:02X} at {pos}"),
        }
    }
    info
}
