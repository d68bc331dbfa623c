//! Session identifiers.
//!
//! The engine only adopts or mints an ID and re-issues it as a cookie; what
//! is stored under that ID belongs to the application's session store.

use uuid::Uuid;

/// Cookie carrying the session identifier.
pub const SESSION_COOKIE: &str = "SESSION-ID";

/// Source of fresh session identifiers.
pub trait SessionIdSource: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs in simple (hyphen-less) form.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidSessionIds;

impl SessionIdSource for UuidSessionIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique() {
        let ids = UuidSessionIds;
        let a = ids.next_id();
        assert_eq!(a.len(), 32);
        assert_ne!(a, ids.next_id());
    }
}
