//! Domain layer: identities and the wire frame envelope.
//!
//! These types are shared by the registry, the upgrade entrypoint, and the
//! REST dispatch surface.

pub mod connection_id;
pub mod frame;
pub mod user_id;

pub use connection_id::{ConnectionId, ConnectionIdAllocator};
pub use frame::{Frame, FrameKind};
pub use user_id::UserId;
