use tracing::{debug, instrument, warn};

use crate::codec::{Command, ImageChunk, MediaKind};
use crate::hw::DeviceSession;
use crate::media::GifAnimation;

/// Handler for image and animation uploads.
pub struct ImageUploadHandler;

impl ImageUploadHandler {
    /// Validates a GIF, splits it into upload windows and sends them in order.
    #[instrument(skip(session, bytes), level = "debug", fields(len = bytes.len()))]
    pub async fn send_gif(session: &DeviceSession, bytes: Vec<u8>) -> bool {
        let gif = match GifAnimation::try_from(bytes) {
            Ok(gif) => gif,
            Err(error) => {
                warn!(error = %error, "refusing to upload invalid gif");
                return false;
            }
        };
        debug!(canvas = %gif.canvas(), "uploading gif");
        Self::send_media(session, MediaKind::Gif, gif.payload()).await
    }

    /// Splits already-encoded media into upload windows and sends them in order.
    #[instrument(skip(session, bytes), level = "debug", fields(%kind, len = bytes.len()))]
    pub async fn send_media(session: &DeviceSession, kind: MediaKind, bytes: &[u8]) -> bool {
        let chunks = match ImageChunk::split(kind, bytes, 0) {
            Ok(chunks) => chunks,
            Err(error) => {
                warn!(error = %error, "failed to split media upload");
                return false;
            }
        };
        let frames: Vec<Vec<u8>> = chunks
            .into_iter()
            .flat_map(|chunk| Command::ImageChunk(chunk).frames())
            .collect();
        let frame_count = frames.len();
        let sent = session.send_frames(&frames).await;
        if sent {
            debug!(frame_count, "media uploaded");
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::codec::{FrameCodec, Opcode};
    use crate::handlers::test_support::connected_session;
    use crate::hw::FakeLinkConfig;
    use crate::media::TimerAnimation;
    use crate::media::TimerSpec;

    #[tokio::test]
    async fn send_gif_rejects_non_gif_bytes() {
        let (session, link) = connected_session(FakeLinkConfig::default()).await;

        assert!(!ImageUploadHandler::send_gif(&session, b"not a gif".to_vec()).await);
        assert!(link.writes().is_empty());
    }

    #[tokio::test]
    async fn send_gif_writes_gif_windows() {
        let (session, link) = connected_session(FakeLinkConfig::default()).await;
        let spec = TimerSpec::builder().duration_seconds(3).width(32).height(16).build();
        let gif = TimerAnimation::build(&spec)
            .and_then(|animation| animation.encode_gif())
            .expect("timer gif should encode");

        assert!(ImageUploadHandler::send_gif(&session, gif.clone()).await);
        let writes = link.writes();
        let expected_windows = gif.len().div_ceil(4096);
        assert_eq!(expected_windows, writes.len());
        for write in &writes {
            let frame = FrameCodec::decode(write).expect("write should be a wire frame");
            assert_eq!(Opcode::GIF, frame.opcode());
        }
    }
}
