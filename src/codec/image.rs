use crc32fast::hash;

use super::CommandError;
use super::frame_codec::{Opcode, encode_bounded};
use super::upload::{ChunkFlag, UploadHeader, windows};

/// Media container carried by an image upload.
#[derive(Debug, Clone, Copy, Eq, PartialEq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    /// Still PNG image.
    Png,
    /// Animated GIF.
    Gif,
}

impl MediaKind {
    /// Returns the upload opcode for this container.
    #[must_use]
    pub fn opcode(self) -> Opcode {
        match self {
            Self::Png => Opcode::IMAGE,
            Self::Gif => Opcode::GIF,
        }
    }
}

/// One upload window of an image body.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ImageChunk {
    kind: MediaKind,
    header: UploadHeader,
    data: Vec<u8>,
}

impl ImageChunk {
    /// Splits an encoded image into upload windows sharing one length and CRC.
    ///
    /// ```
    /// use ipixel::{ImageChunk, MediaKind};
    ///
    /// let chunks = ImageChunk::split(MediaKind::Gif, &[0u8; 5000], 0)?;
    /// assert_eq!(2, chunks.len());
    /// # Ok::<(), ipixel::CommandError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when `bytes` is empty or larger than a 32-bit length.
    pub fn split(kind: MediaKind, bytes: &[u8], save_slot: u8) -> Result<Vec<Self>, CommandError> {
        if bytes.is_empty() {
            return Err(CommandError::EmptyImage);
        }
        let total_len =
            u32::try_from(bytes.len()).map_err(|_overflow| CommandError::ImageTooLarge {
                len: bytes.len(),
            })?;
        let crc32 = hash(bytes);

        Ok(windows(bytes)
            .map(|(flag, window)| Self {
                kind,
                header: UploadHeader {
                    flag,
                    total_len,
                    crc32,
                    save_slot,
                },
                data: window.to_vec(),
            })
            .collect())
    }

    /// Returns the media container.
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Returns whether this is the first window of its body.
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.header.flag == ChunkFlag::First
    }

    /// Returns the window bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn frame(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(UploadHeader::LEN + self.data.len());
        payload.extend_from_slice(&self.header.to_bytes());
        payload.extend_from_slice(&self.data);
        encode_bounded(self.kind.opcode(), &payload)
    }
}
