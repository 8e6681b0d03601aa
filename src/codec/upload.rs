/// Size of one upload window of a logical body.
pub const UPLOAD_WINDOW_SIZE: usize = 4096;

/// Marks a window as the start or a continuation of a logical body.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ChunkFlag {
    /// First window of the body.
    First,
    /// Any later window.
    Continuation,
}

impl ChunkFlag {
    fn as_byte(self) -> u8 {
        match self {
            Self::First => 0x00,
            Self::Continuation => 0x02,
        }
    }
}

/// Window header shared by text and image uploads.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct UploadHeader {
    pub(crate) flag: ChunkFlag,
    pub(crate) total_len: u32,
    pub(crate) crc32: u32,
    pub(crate) save_slot: u8,
}

impl UploadHeader {
    pub(crate) const LEN: usize = 11;

    pub(crate) fn to_bytes(self) -> [u8; Self::LEN] {
        let mut bytes = [0u8; Self::LEN];
        bytes[0] = self.flag.as_byte();
        bytes[1..5].copy_from_slice(&self.total_len.to_le_bytes());
        bytes[5..9].copy_from_slice(&self.crc32.to_le_bytes());
        bytes[9] = 0x00;
        bytes[10] = self.save_slot;
        bytes
    }
}

/// Splits a body into flagged upload windows.
pub(crate) fn windows(body: &[u8]) -> impl Iterator<Item = (ChunkFlag, &[u8])> {
    body.chunks(UPLOAD_WINDOW_SIZE)
        .enumerate()
        .map(|(index, window)| {
            let flag = if index == 0 {
                ChunkFlag::First
            } else {
                ChunkFlag::Continuation
            };
            (flag, window)
        })
}
