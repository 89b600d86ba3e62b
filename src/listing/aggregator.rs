use futures::future::join_all;
use tracing::{debug, info};

use crate::metadata::MetadataSource;

use super::{FilterMode, Listing, ListingWithMetadata};

/// Merges on-chain listings with the metadata their token URIs point at.
pub struct ListingAggregator<S> {
    source: S,
    mode: FilterMode,
}

impl<S: MetadataSource> ListingAggregator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            mode: FilterMode::Strict,
        }
    }

    pub fn with_filter_mode(mut self, mode: FilterMode) -> Self {
        self.mode = mode;
        self
    }

    #[cfg(test)]
    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    /// Splits `listings` into those worth fetching (true) and, in permissive
    /// mode, those kept without metadata (false). Rejected listings are
    /// dropped in strict mode.
    fn classify(&self, listings: Vec<Listing>) -> Vec<(Listing, bool)> {
        listings
            .into_iter()
            .filter_map(|listing| {
                let accepted = self.source.accepts(&listing.token_uri);
                if !accepted {
                    debug!(
                        "Token {} has a non-conforming URI: {}",
                        listing.token_id, listing.token_uri
                    );
                    if self.mode == FilterMode::Strict {
                        return None;
                    }
                }
                Some((listing, accepted))
            })
            .collect()
    }

    /// The view to render while metadata is in flight: every fetchable
    /// listing is marked as loading.
    pub fn loading_snapshot(&self, listings: &[Listing]) -> Vec<ListingWithMetadata> {
        self.classify(listings.to_vec())
            .into_iter()
            .map(|(listing, fetch)| {
                if fetch {
                    ListingWithMetadata::loading(listing)
                } else {
                    ListingWithMetadata::resolved(listing, None)
                }
            })
            .collect()
    }

    /// Fetches metadata for every surviving listing concurrently and waits
    /// for all of them. A failed fetch only affects its own listing. Output
    /// keeps input order and nothing in it is still loading.
    pub async fn attach_metadata(&self, listings: Vec<Listing>) -> Vec<ListingWithMetadata> {
        let candidates = self.classify(listings);
        if candidates.is_empty() {
            return Vec::new();
        }

        info!("Loading metadata for {} listings", candidates.len());
        let fetches = candidates.into_iter().map(|(listing, fetch)| async move {
            let metadata = if fetch {
                self.source.fetch_metadata(&listing.token_uri).await
            } else {
                None
            };
            ListingWithMetadata::resolved(listing, metadata)
        });
        let resolved = join_all(fetches).await;

        let loaded = resolved
            .iter()
            .filter(|l| l.metadata.as_loaded().is_some())
            .count();
        info!(
            "Loaded metadata for {}/{} listings",
            loaded,
            resolved.len()
        );
        resolved
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::ipfs::is_valid_metadata_uri;
    use crate::listing::test_support::listing;
    use crate::listing::MetadataState;
    use crate::metadata::NftMetadata;

    /// Serves canned documents; URIs absent from the map fail. Earlier
    /// entries answer more slowly so completion order differs from input
    /// order.
    struct FakeSource {
        documents: HashMap<String, NftMetadata>,
        delays: HashMap<String, Duration>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                documents: HashMap::new(),
                delays: HashMap::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn with(mut self, uri: &str, name: &str, delay_ms: u64) -> Self {
            self.documents.insert(
                uri.to_string(),
                NftMetadata {
                    name: name.to_string(),
                    ..Default::default()
                },
            );
            self.delays
                .insert(uri.to_string(), Duration::from_millis(delay_ms));
            self
        }
    }

    #[async_trait]
    impl MetadataSource for FakeSource {
        fn accepts(&self, uri: &str) -> bool {
            is_valid_metadata_uri(uri)
        }

        async fn fetch_metadata(&self, uri: &str) -> Option<NftMetadata> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(uri) {
                tokio::time::sleep(*delay).await;
            }
            self.documents.get(uri).cloned()
        }
    }

    fn uri(n: u32) -> String {
        format!("ipfs://bafkrei{n:052}")
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let aggregator = ListingAggregator::new(FakeSource::new());
        assert!(aggregator.attach_metadata(vec![]).await.is_empty());
        assert!(aggregator.loading_snapshot(&[]).is_empty());
    }

    #[tokio::test]
    async fn all_valid_listings_resolve() {
        let source = FakeSource::new()
            .with(&uri(1), "One", 30)
            .with(&uri(2), "Two", 10)
            .with(&uri(3), "Three", 0);
        let aggregator = ListingAggregator::new(source);
        let listings = vec![listing(1, &uri(1)), listing(2, &uri(2)), listing(3, &uri(3))];

        let result = aggregator.attach_metadata(listings).await;
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|l| !l.is_loading_metadata));
        let names: Vec<String> = result.iter().map(|l| l.display_name()).collect();
        assert_eq!(names, vec!["One", "Two", "Three"]);
    }

    #[tokio::test]
    async fn one_failure_does_not_affect_siblings() {
        let source = FakeSource::new()
            .with(&uri(1), "One", 0)
            .with(&uri(3), "Three", 0);
        let aggregator = ListingAggregator::new(source);
        let listings = vec![listing(1, &uri(1)), listing(2, &uri(2)), listing(3, &uri(3))];

        let result = aggregator.attach_metadata(listings).await;
        assert_eq!(result.len(), 3);
        assert!(result[0].metadata.as_loaded().is_some());
        assert_eq!(result[1].metadata, MetadataState::Unavailable);
        assert!(result[2].metadata.as_loaded().is_some());
    }

    #[tokio::test]
    async fn strict_mode_drops_non_conforming_uris() {
        let source = FakeSource::new().with(&uri(1), "One", 0);
        let aggregator = ListingAggregator::new(source);
        let listings = vec![
            listing(1, &uri(1)),
            listing(2, "https://example.com/2.json"),
            listing(3, "ipfs://QmXoypizjW3WknFiJnKLwHCnL72vedxjQkDDP1mXWo6uco"),
        ];

        let snapshot = aggregator.loading_snapshot(&listings);
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].is_loading_metadata);
        assert_eq!(snapshot[0].metadata, MetadataState::NotLoaded);

        let result = aggregator.attach_metadata(listings).await;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].listing.token_id, alloy::primitives::U256::from(1u64));
        assert_eq!(aggregator.source().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn permissive_mode_keeps_them_without_fetching() {
        let source = FakeSource::new().with(&uri(1), "One", 0);
        let aggregator = ListingAggregator::new(source).with_filter_mode(FilterMode::Permissive);
        let listings = vec![listing(1, &uri(1)), listing(2, "https://example.com/2.json")];

        let snapshot = aggregator.loading_snapshot(&listings);
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot[0].is_loading_metadata);
        assert!(!snapshot[1].is_loading_metadata);
        assert_eq!(snapshot[1].metadata, MetadataState::Unavailable);

        let result = aggregator.attach_metadata(listings).await;
        assert_eq!(result.len(), 2);
        assert_eq!(result[1].metadata, MetadataState::Unavailable);
        assert!(result.iter().all(|l| !l.is_loading_metadata));
        assert_eq!(aggregator.source().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetches_run_concurrently() {
        let source = (1..=5).fold(FakeSource::new(), |s, n| {
            s.with(&uri(n), &format!("#{n}"), 200)
        });
        let aggregator = ListingAggregator::new(source);
        let listings = (1..=5).map(|n| listing(n as u64, &uri(n))).collect();

        let start = std::time::Instant::now();
        let result = aggregator.attach_metadata(listings).await;
        assert_eq!(result.len(), 5);
        // Sequential fetching would take at least 1s
        assert!(start.elapsed() < Duration::from_millis(900));
    }
}
