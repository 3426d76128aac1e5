//! Session stores backing [`crate::auth::SessionLookup`].
//!
//! The forum's CRUD layer owns the `sessions` table; this crate only reads
//! it. [`postgres::PgSessionStore`] is used in production and
//! [`memory::MemorySessionStore`] when persistence is disabled and in tests.

pub mod memory;
pub mod postgres;

pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;
