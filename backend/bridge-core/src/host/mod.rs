//! Bridge host: the editor side of the webview boundary.
//!
//! Provides:
//!
//! - WebSocket server (localhost-only, token checked during the upgrade)
//! - Routing by `destination` to the creator and settings handlers
//! - Heartbeat pings and host-initiated pushes (`tab`, `themeColors`)
//! - Actor-owned host state (creator mode, credentials)
//!
//! # Architecture
//!
//! [`start_bridge_host`] binds the listener and spawns the accept loop. Each
//! authenticated connection becomes a [`HostSession`]; its frames are decoded
//! as [`OutgoingMessage`](crate::protocol::OutgoingMessage)s and handed to the
//! [`HostRouter`] one at a time.

pub mod creator;
mod handle;
mod handshake;
mod router;
mod server;
mod session;
pub mod settings;
mod state;

pub use creator::{
    CreatorEvent, CreatorHandler, CreatorModeState, ExecutePlanRequest, PlanGenerator,
    SubmissionCache, UnconfiguredPlanGenerator,
};
pub use handle::BridgeHostHandle;
pub use router::HostRouter;
pub use server::start_bridge_host;
pub use session::HostSession;
pub use settings::{Credentials, SettingsHandler};
pub use state::{HostState, StateCommand};

#[cfg(test)]
pub(crate) use handshake::{HandshakeState, token_from_query};
