//! Connection lifecycle and cross-frame message routing for the widget.
//!
//! Provides:
//! - Cross-frame wire protocol and the inbound dispatcher
//! - Credential-gated outbound guard
//! - Store mutation listener
//! - WebSocket connection manager and bridge bootstrap (feature: websocket)

pub mod dispatcher;
pub mod guard;
pub mod listener;
pub mod protocol;
pub mod window;

#[cfg(feature = "websocket")]
pub mod bridge;
#[cfg(feature = "websocket")]
pub mod websocket;

#[cfg(feature = "websocket")]
pub use bridge::{Bridge, init};
pub use dispatcher::{InboundDispatcher, dispatch};
pub use guard::{OutboundGuard, RawSend, SendOutcome, TransportError};
pub use listener::{LISTENER_NAME, mutation_listener};
pub use protocol::{InboundMessage, OutboundMessage, READY_SENTINEL};
#[cfg(feature = "websocket")]
pub use websocket::{ConnectionManager, ConnectionState, init_socket};
pub use window::{FrameError, HostWindow, ParentFrame, ParentPort, WidgetWindow, frame_pair};
