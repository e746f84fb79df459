//! Credential models: redacted token secrets, decoded JWT claims, and the token store.

pub mod claims;
pub mod secret;
pub mod tokens;

pub use claims::*;
pub use secret::*;
pub use tokens::*;
