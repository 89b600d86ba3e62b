use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::debug;

use crate::metadata::MetadataSource;

use super::{Listing, ListingAggregator, ListingWithMetadata};

/// Snapshot published by a [`ListingView`].
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// Refresh that produced this state; 0 before the first refresh
    pub generation: u64,
    pub listings: Vec<ListingWithMetadata>,
    pub is_loading: bool,
}

/// Owns the listing collection shown by one view and publishes every state
/// change through a watch channel.
///
/// Each refresh takes a new generation. A refresh only publishes while its
/// generation is the newest one, so results of a superseded refresh that
/// arrive late are discarded instead of overwriting newer state.
pub struct ListingView<S> {
    aggregator: ListingAggregator<S>,
    generation: AtomicU64,
    state: watch::Sender<ViewState>,
}

impl<S: MetadataSource> ListingView<S> {
    pub fn new(aggregator: ListingAggregator<S>) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self {
            aggregator,
            generation: AtomicU64::new(0),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Publish the loading snapshot for `listings`, resolve their metadata
    /// and publish the result. Returns false when a newer refresh started in
    /// the meantime and this result was dropped.
    pub async fn refresh(&self, listings: Vec<Listing>) -> bool {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let snapshot = self.aggregator.loading_snapshot(&listings);
        self.publish(generation, snapshot, true);

        let resolved = self.aggregator.attach_metadata(listings).await;
        let published = self.publish(generation, resolved, false);
        if !published {
            debug!(
                "Discarding stale listing results from refresh {} (latest is {})",
                generation,
                self.generation.load(Ordering::SeqCst)
            );
        }
        published
    }

    // The generation check runs under the channel lock, so an older refresh
    // can never replace the state of a newer one.
    fn publish(&self, generation: u64, listings: Vec<ListingWithMetadata>, is_loading: bool) -> bool {
        self.state.send_if_modified(|state| {
            if state.generation > generation {
                return false;
            }
            *state = ViewState {
                generation,
                listings,
                is_loading,
            };
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::ipfs::is_valid_metadata_uri;
    use crate::listing::test_support::{listing, VALID_URI};
    use crate::metadata::NftMetadata;

    /// Names every document after its URI; URIs containing "slow" take a
    /// while to answer.
    struct EchoSource;

    #[async_trait]
    impl MetadataSource for EchoSource {
        fn accepts(&self, uri: &str) -> bool {
            is_valid_metadata_uri(uri)
        }

        async fn fetch_metadata(&self, uri: &str) -> Option<NftMetadata> {
            if uri.contains("slow") {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            Some(NftMetadata {
                name: uri.to_string(),
                ..Default::default()
            })
        }
    }

    fn view() -> ListingView<EchoSource> {
        ListingView::new(ListingAggregator::new(EchoSource))
    }

    #[tokio::test]
    async fn starts_empty() {
        let state = view().current();
        assert_eq!(state.generation, 0);
        assert!(state.listings.is_empty());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn publishes_loading_then_resolved_state() {
        let view = Arc::new(view());
        let mut rx = view.subscribe();

        let task = {
            let view = view.clone();
            tokio::spawn(async move {
                view.refresh(vec![listing(1, "ipfs://bafkreislow")]).await
            })
        };

        rx.changed().await.unwrap();
        let loading = rx.borrow_and_update().clone();
        assert!(loading.is_loading);
        assert_eq!(loading.generation, 1);
        assert!(loading.listings[0].is_loading_metadata);

        assert!(task.await.unwrap());
        let done = view.current();
        assert!(!done.is_loading);
        assert_eq!(done.listings[0].display_name(), "ipfs://bafkreislow");
    }

    #[tokio::test]
    async fn stale_refresh_does_not_overwrite_newer_state() {
        let view = Arc::new(view());

        let slow = {
            let view = view.clone();
            tokio::spawn(async move {
                view.refresh(vec![listing(1, "ipfs://bafkreislow")]).await
            })
        };
        // Let the slow refresh publish its loading snapshot first
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(view.refresh(vec![listing(2, VALID_URI)]).await);

        assert!(!slow.await.unwrap());
        let state = view.current();
        assert_eq!(state.generation, 2);
        assert_eq!(state.listings.len(), 1);
        assert_eq!(state.listings[0].display_name(), VALID_URI);
    }
}
