// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Degradation policy: the thresholds and ordering rules the snapshot shim
//! consults when a snapshot does not fit the local store.

use mohtasib_config::model::DegradationConfig;

/// An inline payload the emergency pass may drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionCandidate {
    /// Position of the owning record in the list (0 = newest).
    pub position: usize,
    /// Payload slot name on the record.
    pub slot: &'static str,
    /// Inline size in bytes.
    pub size: u64,
}

/// Decides when and how a snapshot is reduced.
pub trait DegradationPolicy: Send + Sync {
    /// Whether a snapshot of `size_estimate` bytes must go through the
    /// size-reduction pass before being written.
    fn should_offload(&self, size_estimate: u64) -> bool;

    /// Order in which inline payloads are dropped, first to go first.
    fn eviction_order(&self, candidates: Vec<EvictionCandidate>) -> Vec<EvictionCandidate>;

    /// Most records of `category` a reduced snapshot may keep, if capped.
    fn category_cap(&self, category: &str) -> Option<usize>;

    /// Inline payloads larger than this never stay in a snapshot.
    fn inline_item_limit(&self) -> u64;

    /// Largest payload written as a single small-store fallback entry.
    fn fallback_item_limit(&self) -> u64;

    /// Whether a small-store key holds disposable data.
    fn is_temporary_key(&self, key: &str) -> bool;
}

/// Size-threshold policy configured from `[degradation]`.
#[derive(Debug, Clone)]
pub struct ThresholdPolicy {
    offload_threshold: u64,
    inline_item_limit: u64,
    fallback_item_limit: u64,
    max_videos: usize,
    max_photos: usize,
    temp_key_prefixes: Vec<String>,
}

impl ThresholdPolicy {
    pub fn from_config(config: &DegradationConfig) -> Self {
        Self {
            offload_threshold: config.offload_threshold_bytes,
            inline_item_limit: config.inline_item_limit_bytes,
            fallback_item_limit: config.fallback_item_limit_bytes,
            max_videos: config.max_videos,
            max_photos: config.max_photos,
            temp_key_prefixes: config.temp_key_prefixes.clone(),
        }
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::from_config(&DegradationConfig::default())
    }
}

impl DegradationPolicy for ThresholdPolicy {
    fn should_offload(&self, size_estimate: u64) -> bool {
        size_estimate > self.offload_threshold
    }

    /// Largest first; among equal sizes the oldest record goes first.
    fn eviction_order(&self, mut candidates: Vec<EvictionCandidate>) -> Vec<EvictionCandidate> {
        candidates.sort_by(|a, b| b.size.cmp(&a.size).then(b.position.cmp(&a.position)));
        candidates
    }

    fn category_cap(&self, category: &str) -> Option<usize> {
        match category {
            "video" => Some(self.max_videos),
            "photo" => Some(self.max_photos),
            _ => None,
        }
    }

    fn inline_item_limit(&self) -> u64 {
        self.inline_item_limit
    }

    fn fallback_item_limit(&self) -> u64 {
        self.fallback_item_limit
    }

    fn is_temporary_key(&self, key: &str) -> bool {
        self.temp_key_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && key.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(position: usize, size: u64) -> EvictionCandidate {
        EvictionCandidate {
            position,
            slot: "payload",
            size,
        }
    }

    #[test]
    fn offloads_only_above_threshold() {
        let policy = ThresholdPolicy::default();
        assert!(!policy.should_offload(2 * 1024 * 1024));
        assert!(policy.should_offload(2 * 1024 * 1024 + 1));
    }

    #[test]
    fn eviction_is_largest_first_then_oldest() {
        let policy = ThresholdPolicy::default();
        let ordered = policy.eviction_order(vec![
            candidate(0, 10),
            candidate(1, 50),
            candidate(2, 10),
            candidate(3, 5),
        ]);
        let positions: Vec<usize> = ordered.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![1, 2, 0, 3]);
    }

    #[test]
    fn caps_apply_to_media_categories_only() {
        let config = DegradationConfig {
            max_videos: 2,
            max_photos: 7,
            ..DegradationConfig::default()
        };
        let policy = ThresholdPolicy::from_config(&config);
        assert_eq!(policy.category_cap("video"), Some(2));
        assert_eq!(policy.category_cap("photo"), Some(7));
        assert_eq!(policy.category_cap("press"), None);
    }

    #[test]
    fn temporary_keys_match_configured_prefixes() {
        let policy = ThresholdPolicy::default();
        assert!(policy.is_temporary_key("temp-upload"));
        assert!(policy.is_temporary_key("cache-gallery"));
        assert!(!policy.is_temporary_key("media-items"));
        assert!(!policy.is_temporary_key("media-items-image-media-1"));
    }
}
