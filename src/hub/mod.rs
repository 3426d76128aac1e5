//! Connection hub: the registry of live connections and its dispatch API.
//!
//! ```text
//! upgrade entrypoint ──connect──┐
//! read loops ─────────broadcast─┤
//! REST login/logout ─────────────┼──► mpsc<HubEvent> ──► Registry loop
//! shutdown ──────────────────────┘                          │
//!                                      try_send per member  ▼
//!                                   bounded outbound queues ──► write loops
//! ```
//!
//! Only the registry task touches the member table. Producers hold a
//! [`HubHandle`]; each connection holds the [`Mailbox`] returned from
//! [`HubHandle::connect`].

mod event;
pub mod handle;
pub mod member;
pub mod registry;

pub use handle::{HubConfig, HubHandle};
pub use member::{DrainGuard, Mailbox, MemberInfo, Registration};
pub use registry::HubExit;
