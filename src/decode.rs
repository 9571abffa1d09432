//! Thin wrapper over `image_webp` producing owned RGBA buffers.
//!
//! Frame compositing (blend and dispose against the previous canvas) is left
//! to the decoder; every frame handed out here is a full canvas.

use std::io::Cursor;

use image_webp::{DecodingError, WebPDecoder};

use crate::error::ConvertError;
use crate::gif_assembler::Disposal;
use crate::pixel::RgbaBuffer;

pub(crate) fn open(bytes: &[u8]) -> Result<WebPDecoder<Cursor<&[u8]>>, DecodingError> {
    WebPDecoder::new(Cursor::new(bytes))
}

fn buffer_size(decoder: &WebPDecoder<Cursor<&[u8]>>) -> Result<usize, ConvertError> {
    decoder
        .output_buffer_size()
        .ok_or(ConvertError::Decode(DecodingError::ImageTooLarge))
}

/// Decode a still image. For animated input this yields the first frame.
pub fn decode_still(bytes: &[u8]) -> Result<RgbaBuffer, ConvertError> {
    let mut decoder = open(bytes)?;
    let (width, height) = decoder.dimensions();
    let has_alpha = decoder.has_alpha();
    let mut buf = vec![0u8; buffer_size(&decoder)?];
    decoder.read_image(&mut buf)?;
    Ok(RgbaBuffer::from_packed(
        width as usize,
        height as usize,
        &buf,
        has_alpha,
    )?)
}

/// One fully composited animation frame.
#[derive(Debug, Clone)]
pub struct AnimationFrame {
    pub index: u32,
    pub image: RgbaBuffer,
    /// Display time as stored in the container.
    pub duration_ms: u32,
    /// The decoder does not surface per-frame disposal, so this is always
    /// [`Disposal::Unspecified`].
    pub disposal: Disposal,
}

/// Streams composited frames out of an animated WebP.
pub struct FrameReader<'a> {
    decoder: WebPDecoder<Cursor<&'a [u8]>>,
    width: u32,
    height: u32,
    has_alpha: bool,
    frame_count: u32,
    next: u32,
    scratch: Vec<u8>,
}

impl<'a> FrameReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self, ConvertError> {
        let decoder = open(bytes)?;
        let (width, height) = decoder.dimensions();
        let scratch = vec![0u8; buffer_size(&decoder)?];
        Ok(Self {
            has_alpha: decoder.has_alpha(),
            frame_count: if decoder.is_animated() {
                decoder.num_frames()
            } else {
                1
            },
            decoder,
            width,
            height,
            next: 0,
            scratch,
        })
    }

    pub fn canvas_width(&self) -> u32 {
        self.width
    }

    pub fn canvas_height(&self) -> u32 {
        self.height
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    fn read_next(&mut self) -> Result<AnimationFrame, ConvertError> {
        let duration_ms = if self.decoder.is_animated() {
            self.decoder.read_frame(&mut self.scratch)?
        } else {
            self.decoder.read_image(&mut self.scratch)?;
            0
        };
        let image = RgbaBuffer::from_packed(
            self.width as usize,
            self.height as usize,
            &self.scratch,
            self.has_alpha,
        )?;
        let index = self.next;
        self.next += 1;
        Ok(AnimationFrame {
            index,
            image,
            duration_ms,
            disposal: Disposal::Unspecified,
        })
    }
}

impl Iterator for FrameReader<'_> {
    type Item = Result<AnimationFrame, ConvertError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.frame_count {
            return None;
        }
        match self.read_next() {
            Err(ConvertError::Decode(DecodingError::NoMoreFrames)) => {
                log::warn!(
                    "container announced {} frames but ended after {}",
                    self.frame_count,
                    self.next
                );
                self.next = self.frame_count;
                None
            }
            Err(e) => {
                // Stop after the first failure.
                self.next = self.frame_count;
                Some(Err(e))
            }
            ok => Some(ok),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.frame_count - self.next) as usize;
        (0, Some(left))
    }
}
