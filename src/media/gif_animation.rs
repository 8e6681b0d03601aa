use std::borrow::Cow;
use std::io::Cursor;

use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use thiserror::Error;

use super::palette::Palette;
use super::raster::{Canvas, IndexedFrame};

/// Errors returned when encoding or validating GIF payloads.
#[derive(Debug, Error)]
pub enum GifAnimationError {
    /// The payload is empty.
    #[error("gif payload cannot be empty")]
    EmptyPayload,
    /// The payload cannot be decoded as a GIF stream.
    #[error("invalid gif payload")]
    InvalidGif { source: gif::DecodingError },
    /// GIF dimensions are invalid for panel representation.
    #[error("gif payload has invalid logical dimensions: {width}x{height}")]
    InvalidDimensions { width: u16, height: u16 },
    /// There were no frames to encode.
    #[error("cannot encode an animation without frames")]
    NoFrames,
    /// The GIF encoder failed.
    #[error("failed to encode gif")]
    Encoding { source: gif::EncodingError },
    /// The PNG encoder failed.
    #[error("failed to encode png")]
    Png { source: image::ImageError },
}

/// One frame handed to the GIF encoder.
pub(crate) struct GifFrame<'a> {
    pub(crate) pixels: &'a IndexedFrame,
    pub(crate) palette: Palette,
    pub(crate) duration_ms: u16,
}

/// Writes an indexed GIF; each frame carries its own local palette.
///
/// `play_once` adds a NETSCAPE loop count of one.
pub(crate) fn encode_gif(
    canvas: Canvas,
    global_palette: Palette,
    frames: &[GifFrame<'_>],
    play_once: bool,
) -> Result<Vec<u8>, GifAnimationError> {
    if frames.is_empty() {
        return Err(GifAnimationError::NoFrames);
    }

    let mut bytes = Vec::new();
    {
        let mut encoder = gif::Encoder::new(
            &mut bytes,
            canvas.width(),
            canvas.height(),
            &global_palette.to_bytes(),
        )
        .map_err(|source| GifAnimationError::Encoding { source })?;

        if play_once {
            encoder
                .set_repeat(gif::Repeat::Finite(1))
                .map_err(|source| GifAnimationError::Encoding { source })?;
        }

        for frame in frames {
            let gif_frame = gif::Frame {
                width: canvas.width(),
                height: canvas.height(),
                delay: frame.duration_ms / 10,
                buffer: Cow::Borrowed(frame.pixels.pixels()),
                palette: Some(frame.palette.to_bytes()),
                ..gif::Frame::default()
            };
            encoder
                .write_frame(&gif_frame)
                .map_err(|source| GifAnimationError::Encoding { source })?;
        }
    }

    Ok(bytes)
}

/// Writes one indexed frame as an RGB PNG.
pub(crate) fn encode_png(frame: &IndexedFrame, palette: Palette) -> Result<Vec<u8>, GifAnimationError> {
    let canvas = frame.canvas();
    let rgb: Vec<u8> = frame
        .pixels()
        .iter()
        .flat_map(|index| {
            let colour = palette.colour(*index);
            [colour.r, colour.g, colour.b]
        })
        .collect();

    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            &rgb,
            u32::from(canvas.width()),
            u32::from(canvas.height()),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|source| GifAnimationError::Png { source })?;
    Ok(bytes)
}

/// Validated GIF payload with parsed logical dimensions.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GifAnimation {
    canvas: Canvas,
    payload: Vec<u8>,
}

impl GifAnimation {
    /// Returns the logical GIF size parsed from the payload.
    ///
    /// ```
    /// use ipixel::GifAnimation;
    ///
    /// let bytes = vec![
    ///     0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00,
    ///     0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00,
    ///     0x00, 0x2C, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02,
    ///     0x44, 0x01, 0x00, 0x3B,
    /// ];
    /// let gif = GifAnimation::try_from(bytes)?;
    /// assert_eq!("1x1", gif.canvas().to_string());
    /// # Ok::<(), ipixel::GifAnimationError>(())
    /// ```
    #[must_use]
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Returns the validated GIF bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn parse_canvas(payload: &[u8]) -> Result<Canvas, GifAnimationError> {
        let mut options = gif::DecodeOptions::new();
        options.check_frame_consistency(true);
        let reader = options
            .read_info(Cursor::new(payload))
            .map_err(|source| GifAnimationError::InvalidGif { source })?;
        let width = reader.width();
        let height = reader.height();
        Canvas::new(width, height).ok_or(GifAnimationError::InvalidDimensions { width, height })
    }
}

impl TryFrom<Vec<u8>> for GifAnimation {
    type Error = GifAnimationError;

    fn try_from(payload: Vec<u8>) -> Result<Self, Self::Error> {
        if payload.is_empty() {
            return Err(GifAnimationError::EmptyPayload);
        }
        let canvas = Self::parse_canvas(&payload)?;
        Ok(Self { canvas, payload })
    }
}
