use bson::Document;

/// Process-wide cache collaborator for per-item metadata.
///
/// Keys are namespaced: the loader asks for [`prefix`](Cache::prefix) once
/// per priming pass and prepends it to every key it writes.
pub trait Cache {
    /// Namespace prefix for cache keys in `group`.
    fn prefix(&self, group: &str) -> String;

    /// Store `value` under `key` within `group`.
    fn set(&self, key: &str, value: Document, group: &str);
}

/// Discards every write. Use when cache priming is not wanted.
pub struct NoopCache;

impl Cache for NoopCache {
    fn prefix(&self, _group: &str) -> String {
        String::new()
    }

    fn set(&self, _key: &str, _value: Document, _group: &str) {}
}
