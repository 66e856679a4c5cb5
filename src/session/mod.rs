//! Session context: who showed which object, and what they asked last

pub mod followup;
pub mod keys;
pub mod store;

pub use followup::FollowUpPolicy;
pub use keys::{IssuedKey, SessionKeyStrategy};
pub use store::{SessionEntry, SessionSlot, SessionStore};
