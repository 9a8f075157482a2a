//! Reference lookup capability and an in-memory reference store.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::types::{
    LookupError, PolicyError, PolicyResult, ReferenceLocation, ReferenceSource, StoredReference,
    VisualTarget,
};

/// Read side of the reference memory, as seen by the policy.
///
/// Implementations may do network or disk I/O; the policy bounds every call
/// with its configured timeout.
#[async_trait]
pub trait ReferenceLookup: Send + Sync {
    /// Return every stored reference matching any of `targets`.
    async fn lookup(&self, targets: &[VisualTarget]) -> Result<Vec<StoredReference>, LookupError>;
}

/// A reference to be saved, before the store assigns an id and timestamp.
#[derive(Debug, Clone, Default)]
pub struct NewReference {
    pub label: String,
    pub locations: Vec<ReferenceLocation>,
    pub source: ReferenceSource,
}

#[derive(Debug)]
struct StoreInner {
    references: Vec<StoredReference>,
    next_id: u64,
}

/// Process-local reference memory.
///
/// A lookup observes every save that returned before it was issued.
#[derive(Debug)]
pub struct InMemoryReferenceStore {
    inner: RwLock<StoreInner>,
    created_at: i64,
}

impl Default for InMemoryReferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryReferenceStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                references: Vec::new(),
                next_id: 1,
            }),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Save a reference and return it with its assigned id.
    pub fn save(&self, reference: NewReference) -> PolicyResult<StoredReference> {
        let label = normalize_label(&reference.label);
        if label.is_empty() {
            return Err(PolicyError::InvalidReference(
                "label must not be empty".to_string(),
            ));
        }
        if reference.locations.is_empty() {
            return Err(PolicyError::InvalidReference(
                "at least one location is required".to_string(),
            ));
        }
        if let Some(bad) = reference
            .locations
            .iter()
            .find(|l| l.storage_key.trim().is_empty() || l.url.trim().is_empty())
        {
            return Err(PolicyError::InvalidReference(format!(
                "location has an empty storage key or url: {bad:?}"
            )));
        }

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let stored = StoredReference {
            id: inner.next_id,
            label,
            locations: reference.locations,
            source: reference.source,
            created_at: chrono::Utc::now().timestamp(),
        };
        inner.next_id += 1;
        inner.references.push(stored.clone());

        tracing::debug!(
            "Saved reference {} under '{}' ({} locations)",
            stored.id,
            stored.label,
            stored.locations.len()
        );
        Ok(stored)
    }

    /// Get a reference by id.
    pub fn get(&self, id: u64) -> Option<StoredReference> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.references.iter().find(|r| r.id == id).cloned()
    }

    /// References whose label matches any of `targets`, newest first.
    pub fn matching(&self, targets: &[VisualTarget]) -> Vec<StoredReference> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut found: Vec<StoredReference> = inner
            .references
            .iter()
            .filter(|r| targets.iter().any(|t| label_matches(&r.label, t)))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        found
    }

    /// The most recent references.
    pub fn recent(&self, limit: usize) -> Vec<StoredReference> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut sorted = inner.references.clone();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        sorted.truncate(limit);
        sorted
    }

    /// Distinct labels in insertion order.
    pub fn labels(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut labels: Vec<String> = Vec::new();
        for r in &inner.references {
            if !labels.contains(&r.label) {
                labels.push(r.label.clone());
            }
        }
        labels
    }

    pub fn count(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .references
            .len()
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }
}

#[async_trait]
impl ReferenceLookup for InMemoryReferenceStore {
    async fn lookup(&self, targets: &[VisualTarget]) -> Result<Vec<StoredReference>, LookupError> {
        Ok(self.matching(targets))
    }
}

fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A label matches a target when one is a whole-word sub-phrase of the other.
pub fn label_matches(label: &str, target: &VisualTarget) -> bool {
    let label = normalize_label(label);
    let label_words: Vec<&str> = label.split(' ').collect();
    let target_words: Vec<&str> = target.words().collect();
    contains_phrase(&label_words, &target_words) || contains_phrase(&target_words, &label_words)
}

fn contains_phrase(haystack: &[&str], needle: &[&str]) -> bool {
    !needle.is_empty()
        && needle.len() <= haystack.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(s: &str) -> VisualTarget {
        VisualTarget::new(s).unwrap()
    }

    fn new_ref(label: &str) -> NewReference {
        NewReference {
            label: label.to_string(),
            locations: vec![ReferenceLocation {
                storage_key: format!("refs/{label}/0.png"),
                url: format!("https://cdn.example.com/{label}/0.png"),
            }],
            source: ReferenceSource::default(),
        }
    }

    #[test]
    fn test_label_matching() {
        assert!(label_matches("Duck Lamp", &target("duck lamp")));
        assert!(label_matches("duck", &target("duck lamp")));
        assert!(label_matches("rubber duck lamp", &target("duck lamp")));
        assert!(!label_matches("ducky", &target("duck")));
        assert!(!label_matches("lamp duck", &target("duck lamp")));
    }

    #[test]
    fn test_save_assigns_ids() {
        let store = InMemoryReferenceStore::new();
        let a = store.save(new_ref("chair")).unwrap();
        let b = store.save(new_ref("  Duck   Lamp ")).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(b.label, "duck lamp");
        assert_eq!(store.count(), 2);
        assert_eq!(store.get(2).unwrap().label, "duck lamp");
        assert!(store.get(99).is_none());
    }

    #[test]
    fn test_save_rejects_invalid() {
        let store = InMemoryReferenceStore::new();
        assert!(store.save(new_ref("  ")).is_err());

        let mut no_locations = new_ref("chair");
        no_locations.locations.clear();
        assert!(store.save(no_locations).is_err());

        let mut empty_url = new_ref("chair");
        empty_url.locations[0].url = String::new();
        assert!(store.save(empty_url).is_err());

        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_matching_newest_first() {
        let store = InMemoryReferenceStore::new();
        store.save(new_ref("duck")).unwrap();
        store.save(new_ref("chair")).unwrap();
        store.save(new_ref("duck lamp")).unwrap();

        let found = store.matching(&[target("duck lamp")]);
        let ids: Vec<u64> = found.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1]);

        assert!(store.matching(&[]).is_empty());
    }

    #[test]
    fn test_labels_and_recent() {
        let store = InMemoryReferenceStore::new();
        store.save(new_ref("duck")).unwrap();
        store.save(new_ref("chair")).unwrap();
        store.save(new_ref("duck")).unwrap();
        assert_eq!(store.labels(), vec!["duck".to_string(), "chair".to_string()]);
        let recent: Vec<u64> = store.recent(2).iter().map(|r| r.id).collect();
        assert_eq!(recent, vec![3, 2]);
    }

    #[tokio::test]
    async fn test_lookup_reads_own_writes() {
        let store = InMemoryReferenceStore::new();
        assert!(store.lookup(&[target("chair")]).await.unwrap().is_empty());
        store.save(new_ref("chair")).unwrap();
        assert_eq!(store.lookup(&[target("chair")]).await.unwrap().len(), 1);
    }
}
