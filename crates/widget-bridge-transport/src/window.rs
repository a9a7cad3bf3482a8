//! Cross-frame message channel between the widget and its parent frame.

use tokio::sync::mpsc;

/// Outbound side of the host window: post a message to the parent frame.
pub trait HostWindow: Send + Sync {
    /// Post `message` to the parent frame.
    fn post_to_parent(&self, message: &str);
}

/// Frame channel error.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Frame closed")]
    Closed,
}

/// Widget side of an in-process frame pair.
///
/// The inbound receiver is consumed by [`crate::InboundDispatcher::attach`].
pub struct WidgetWindow {
    /// Messages posted by the parent, in arrival order.
    pub messages: mpsc::UnboundedReceiver<String>,
    /// Handle for posting back to the parent.
    pub parent: ParentPort,
}

/// Cloneable handle that posts messages to the parent frame.
#[derive(Clone)]
pub struct ParentPort {
    tx: mpsc::UnboundedSender<String>,
}

impl HostWindow for ParentPort {
    fn post_to_parent(&self, message: &str) {
        if self.tx.send(message.to_owned()).is_err() {
            tracing::debug!("parent frame gone, message dropped");
        }
    }
}

/// Parent side of an in-process frame pair.
pub struct ParentFrame {
    to_widget: mpsc::UnboundedSender<String>,
    from_widget: mpsc::UnboundedReceiver<String>,
}

impl ParentFrame {
    /// Post raw message text to the widget.
    ///
    /// # Errors
    /// Returns error if the widget side was dropped.
    pub fn post_message(&self, data: impl Into<String>) -> Result<(), FrameError> {
        self.to_widget
            .send(data.into())
            .map_err(|_| FrameError::Closed)
    }

    /// Receive the next message the widget posted.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_widget.recv().await
    }

    /// Receive a posted message (non-blocking).
    pub fn try_recv(&mut self) -> Option<String> {
        self.from_widget.try_recv().ok()
    }
}

/// Create a connected widget/parent pair.
#[must_use]
pub fn frame_pair() -> (WidgetWindow, ParentFrame) {
    let (to_widget, messages) = mpsc::unbounded_channel();
    let (tx, from_widget) = mpsc::unbounded_channel();

    let widget = WidgetWindow {
        messages,
        parent: ParentPort { tx },
    };

    let parent = ParentFrame {
        to_widget,
        from_widget,
    };

    (widget, parent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_carries_both_directions() {
        let (mut widget, mut parent) = frame_pair();

        parent.post_message("hello").unwrap();
        assert_eq!(widget.messages.recv().await.as_deref(), Some("hello"));

        widget.parent.post_to_parent("ready");
        assert_eq!(parent.recv().await.as_deref(), Some("ready"));
        assert_eq!(parent.try_recv(), None);
    }

    #[test]
    fn test_post_after_widget_dropped_fails() {
        let (widget, parent) = frame_pair();
        drop(widget);
        assert!(matches!(parent.post_message("x"), Err(FrameError::Closed)));
    }
}
