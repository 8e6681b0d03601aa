use bon::Builder;
use tracing::{info, instrument, warn};

use super::ImageUploadHandler;
use crate::codec::MediaKind;
use crate::hw::DeviceSession;
use crate::media::{BitmapFont, Rgb, TimerAnimation, TimerSpec, longest_countdown_chars};

/// Countdown shown on the display itself.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Builder)]
pub struct TimerRequest {
    duration_seconds: u32,
    #[builder(default = Rgb::GREEN)]
    foreground: Rgb,
    #[builder(default = Rgb::BLACK)]
    background: Rgb,
    /// Glyph scale; picked from the panel size when unset.
    scale: Option<u32>,
    #[builder(default)]
    static_frame: bool,
}

impl TimerRequest {
    /// Explicit scale, or the largest one that fits every frame on the panel.
    fn font_for(&self, width: u16, height: u16) -> BitmapFont {
        self.scale.map_or_else(
            || BitmapFont::fitting(width, height, longest_countdown_chars(self.duration_seconds)),
            BitmapFont::new,
        )
    }
}

/// Handler that renders and uploads countdown animations.
pub struct TimerHandler;

impl TimerHandler {
    /// Builds a countdown sized to the panel and uploads it as a GIF.
    ///
    /// The panel size comes from the device-info query, so a display that
    /// does not answer gets the fallback 64x16 canvas.
    #[instrument(skip(session), level = "debug", fields(duration = request.duration_seconds))]
    pub async fn display_timer(session: &DeviceSession, request: TimerRequest) -> bool {
        let info = session.query_device_info().await;
        let font = request.font_for(info.width, info.height);
        let spec = TimerSpec::builder()
            .duration_seconds(request.duration_seconds)
            .foreground(request.foreground)
            .background(request.background)
            .font(font)
            .width(info.width)
            .height(info.height)
            .static_frame(request.static_frame)
            .build();

        let gif = match TimerAnimation::build(&spec).and_then(|animation| animation.encode_gif()) {
            Ok(gif) => gif,
            Err(error) => {
                warn!(error = %error, "failed to build timer animation");
                return false;
            }
        };

        let sent = ImageUploadHandler::send_media(session, MediaKind::Gif, &gif).await;
        if sent {
            info!(
                width = info.width,
                height = info.height,
                scale = font.scale(),
                bytes = gif.len(),
                "timer uploaded"
            );
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
    use crate::media::{FOREGROUND_INDEX, GlyphFont};

    #[tokio::test(start_paused = true)]
    async fn display_timer_uses_fallback_canvas_on_silent_display() {
        let (session, link) = connected_session(FakeLinkConfig::default()).await;
        let request = TimerRequest::builder().duration_seconds(2).build();

        assert!(TimerHandler::display_timer(&session, request).await);
        let resolved = session
            .resolved_device_info()
            .expect("timer should have queried device info");
        assert!(resolved.is_fallback());

        let uploads: Vec<Vec<u8>> = link
            .writes()
            .into_iter()
            .filter(|write| {
                FrameCodec::decode(write).is_ok_and(|frame| frame.opcode() == Opcode::GIF)
            })
            .collect();
        assert_eq!(1, uploads.len());
        assert!(link.active_subscriptions().is_empty());
    }

    #[tokio::test]
    async fn display_timer_sizes_to_reported_panel() {
        let reply = vec![0x06, 0x00, 0x01, 0x80, 0x01, 0x06];
        let (session, link) =
            connected_session(FakeLinkConfig::builder().device_info_reply(reply).build()).await;
        let request = TimerRequest::builder()
            .duration_seconds(1)
            .static_frame(true)
            .build();

        assert!(TimerHandler::display_timer(&session, request).await);
        let info = session.query_device_info().await;
        assert_eq!((128, 32), (info.width, info.height));

        let upload = link
            .writes()
            .into_iter()
            .find(|write| {
                FrameCodec::decode(write).is_ok_and(|frame| frame.opcode() == Opcode::GIF)
            })
            .expect("timer should upload a gif");
        let frame = FrameCodec::decode(&upload).expect("upload should decode");
        let gif = &frame.payload()[11..];
        assert_eq!(b"GIF89a", &gif[..6]);
        assert_eq!([128, 0, 32, 0], gif[6..10]);
    }

    #[test]
    fn long_countdown_on_small_panel_is_never_clipped() {
        let request = TimerRequest::builder().duration_seconds(600).build();
        let font = request.font_for(48, 24);
        let spec = TimerSpec::builder()
            .duration_seconds(600)
            .font(font)
            .width(48)
            .height(24)
            .build();

        let animation = TimerAnimation::build(&spec).expect("animation should build");

        assert_eq!(1, font.scale());
        for frame in animation.frames() {
            let ink: usize = frame.text().chars().map(|ch| font.ink(ch).len()).sum();
            assert_eq!(
                ink,
                frame.pixels().count(FOREGROUND_INDEX),
                "frame {}",
                frame.text()
            );
        }
    }

    #[tokio::test]
    async fn display_timer_uploads_long_countdown_to_small_panel() {
        let reply = vec![0x06, 0x00, 0x01, 0x80, 0x00, 0x09];
        let (session, link) =
            connected_session(FakeLinkConfig::builder().device_info_reply(reply).build()).await;
        let request = TimerRequest::builder()
            .duration_seconds(600)
            .static_frame(true)
            .build();

        assert!(TimerHandler::display_timer(&session, request).await);
        let info = session.query_device_info().await;
        assert_eq!((48, 24), (info.width, info.height));
        assert_eq!(1, request.font_for(info.width, info.height).scale());
        assert!(
            link.writes()
                .iter()
                .any(|write| FrameCodec::decode(write)
                    .is_ok_and(|frame| frame.opcode() == Opcode::GIF))
        );
    }
}
