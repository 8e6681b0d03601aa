use tracing::{debug, instrument};

use crate::codec::{Command, TextCommand};
use crate::hw::DeviceSession;

/// Handler for scrolling text uploads.
pub struct TextHandler;

impl TextHandler {
    /// Uploads text as one or more text windows.
    ///
    /// ```
    /// # async fn demo(session: ipixel::DeviceSession) -> Result<(), ipixel::CommandError> {
    /// use ipixel::{TextCommand, TextHandler, TextOptions};
    ///
    /// let text = TextCommand::new("hello", TextOptions::default().with_speed(50)?)?;
    /// TextHandler::send_text(&session, text).await;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(session, text), level = "debug", fields(chars = text.text().chars().count()))]
    pub async fn send_text(session: &DeviceSession, text: TextCommand) -> bool {
        let command = Command::Text(text);
        let sent = session.send_command(&command).await;
        if sent {
            debug!(frames = command.frames().len(), "text uploaded");
        }
        sent
    }
}
