//! Registry of tracked method paths.

use crate::extractor::UsageExtractor;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps dotted method paths (e.g. `"messages.create"`) to the extractor that
/// handles them.
///
/// Built once when a proxy is constructed and immutable afterward. Nested
/// namespaces are served by [`MethodRegistry::scoped`], which peels one path
/// segment off every key so a sub-proxy only sees the suffixes that concern
/// it.
#[derive(Default, Clone)]
pub struct MethodRegistry {
    entries: HashMap<String, Arc<dyn UsageExtractor>>,
}

impl MethodRegistry {
    /// Empty registry (a proxy with one is a pure passthrough).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration. Paths are unique; registering the same
    /// path twice keeps the latest extractor.
    pub fn with(mut self, path: impl Into<String>, extractor: Arc<dyn UsageExtractor>) -> Self {
        self.entries.insert(path.into(), extractor);
        self
    }

    /// Extractor for an exact path, if one is registered.
    pub fn get(&self, path: &str) -> Option<Arc<dyn UsageExtractor>> {
        self.entries.get(path).cloned()
    }

    /// Whether any registered path is rooted at this segment (i.e. a nested
    /// proxy for the segment would have work to do).
    pub fn has_root(&self, segment: &str) -> bool {
        self.entries
            .keys()
            .any(|k| k.strip_prefix(segment).is_some_and(|rest| rest.starts_with('.')))
    }

    /// Registry for the namespace under `segment`, with the segment stripped
    /// from every key.
    pub fn scoped(&self, segment: &str) -> Self {
        let entries = self
            .entries
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(segment)
                    .and_then(|rest| rest.strip_prefix('.'))
                    .map(|suffix| (suffix.to_string(), Arc::clone(v)))
            })
            .collect();
        Self { entries }
    }

    /// All registered paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("paths", &self.paths())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::CallOutcome;
    use clawmeter_core::{CallContext, ExtractError};
    use clawmeter_tracker::UsageTracker;

    struct NoopExtractor;

    impl UsageExtractor for NoopExtractor {
        fn record(
            &self,
            _outcome: CallOutcome<'_>,
            _customer_id: Option<&str>,
            _ctx: &CallContext,
            _tracker: &UsageTracker,
        ) -> Result<(), ExtractError> {
            Ok(())
        }
    }

    fn registry() -> MethodRegistry {
        MethodRegistry::new()
            .with("messages.create", Arc::new(NoopExtractor))
            .with("completions.create", Arc::new(NoopExtractor))
            .with("ping", Arc::new(NoopExtractor))
    }

    #[test]
    fn exact_lookup() {
        let reg = registry();
        assert!(reg.get("messages.create").is_some());
        assert!(reg.get("ping").is_some());
        assert!(reg.get("messages").is_none());
        assert!(reg.get("create").is_none());
    }

    #[test]
    fn root_detection() {
        let reg = registry();
        assert!(reg.has_root("messages"));
        assert!(reg.has_root("completions"));
        // "ping" is a flat method, not a namespace.
        assert!(!reg.has_root("ping"));
        assert!(!reg.has_root("mess"));
        assert!(!reg.has_root("models"));
    }

    #[test]
    fn scoped_strips_segment() {
        let reg = registry();
        let scoped = reg.scoped("messages");
        assert_eq!(scoped.len(), 1);
        assert!(scoped.get("create").is_some());
        assert!(scoped.get("messages.create").is_none());
    }

    #[test]
    fn scoped_on_unknown_segment_is_empty() {
        let reg = registry();
        assert!(reg.scoped("models").is_empty());
    }

    #[test]
    fn paths_are_sorted() {
        let reg = registry();
        assert_eq!(
            reg.paths(),
            vec!["completions.create", "messages.create", "ping"]
        );
    }
}
