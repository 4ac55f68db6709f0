//! Unique identifiers for new stereogram directories.

use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

/// Source of candidate directory names.
///
/// Callers check each candidate against the file system, so a generator is
/// allowed to repeat itself; it just must not repeat forever.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs in upper-case hyphenated form.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().hyphenated().to_string().to_uppercase()
    }
}

/// Hands out a scripted sequence of ids, then falls back to UUIDs.
#[derive(Debug, Default)]
pub struct FixedIds {
    queue: Mutex<VecDeque<String>>,
}

impl FixedIds {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(ids.into_iter().map(Into::into).collect()),
        }
    }
}

impl IdGenerator for FixedIds {
    fn next_id(&self) -> String {
        self.queue
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .pop_front()
            .unwrap_or_else(|| UuidGenerator.next_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique_and_uppercase() {
        let a = UuidGenerator.next_id();
        let b = UuidGenerator.next_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
        assert_eq!(a, a.to_uppercase());
    }

    #[test]
    fn fixed_ids_replay_then_fall_back() {
        let ids = FixedIds::new(["A", "A", "B"]);
        assert_eq!(ids.next_id(), "A");
        assert_eq!(ids.next_id(), "A");
        assert_eq!(ids.next_id(), "B");
        assert_eq!(ids.next_id().len(), 36);
    }
}
