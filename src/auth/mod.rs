//! Authentication boundary: session lookup and the request extractor.
//!
//! Concrete session stores live in [`crate::persistence`].

pub mod extractor;
pub mod session;

pub use extractor::AuthUser;
pub use session::SessionLookup;
