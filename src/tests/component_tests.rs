//! tests/component_tests.rs - Naive and cache-backed lists side by side

#[cfg(test)]
mod tests {
    use crate::{
        cache::CacheConfig,
        demo::{CacheEnvironment, NaiveEnvironment},
        metrics::NetworkTracker,
        models::Item,
        tests::support::{
            alpha_items, base_url, beta_items, error_response, items_response, FakeItemsBackend,
            MockFetcher, ScriptedFetcher,
        },
    };
    use reqwest::StatusCode;
    use std::sync::Arc;
    use std::time::Duration;

    fn backend_items() -> Vec<Item> {
        let mut items = alpha_items();
        items.extend(beta_items());
        items
    }

    fn backend_fetcher() -> Arc<MockFetcher> {
        let backend = FakeItemsBackend::new(backend_items());
        MockFetcher::new(move |request| backend.handle(request))
    }

    fn cache_env(fetcher: Arc<MockFetcher>) -> CacheEnvironment {
        CacheEnvironment::new(NetworkTracker::new(), fetcher, base_url(), CacheConfig::default())
    }

    #[tokio::test]
    async fn test_naive_lists_fetch_independently() {
        let fetcher = backend_fetcher();
        let env = NaiveEnvironment::new(NetworkTracker::new(), fetcher.clone(), base_url());

        let mut first = env.list().with_delay(0);
        let mut second = env.list().with_delay(0);
        first.set_filter("alpha");
        second.set_filter("alpha");

        let a = first.settled().await;
        let b = second.settled().await;
        assert_eq!(a.items, Some(alpha_items()));
        assert_eq!(b.items, Some(alpha_items()));
        assert_eq!(a.status_line(), "Loaded 2 items");

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(env.tracker.snapshot().total_requests, 2);
        assert_eq!(env.tracker.snapshot().unique_urls, 1);
    }

    #[tokio::test]
    async fn test_naive_list_refetches_on_every_filter_change() {
        let fetcher = backend_fetcher();
        let env = NaiveEnvironment::new(NetworkTracker::new(), fetcher.clone(), base_url());
        let mut list = env.list().with_delay(0);

        for filter in ["alpha", "beta", "alpha"] {
            list.set_filter(filter);
            list.settled().await;
        }
        // Same filter again is not a change
        list.set_filter("alpha");

        assert_eq!(fetcher.calls(), 3);
        assert_eq!(list.filter(), Some("alpha"));
        assert_eq!(env.tracker.snapshot().cache_hits, 0);
    }

    #[tokio::test]
    async fn test_naive_list_ignores_superseded_response() {
        let (fetcher, mut responders) = ScriptedFetcher::new(2);
        let env = NaiveEnvironment::new(NetworkTracker::new(), fetcher, base_url());
        let mut metrics = env.tracker.subscribe();
        let mut list = env.list();

        list.set_filter("alpha");
        list.set_filter("beta");
        assert!(list.state().loading);
        assert_eq!(list.state().status_line(), "Fetching…");

        let respond_beta = responders.pop().unwrap();
        let respond_alpha = responders.pop().unwrap();

        respond_beta.send(items_response(&beta_items())).unwrap();
        let state = list.settled().await;
        assert_eq!(state.items, Some(beta_items()));

        respond_alpha.send(items_response(&alpha_items())).unwrap();
        metrics.wait_for(|m| m.in_flight == 0).await.unwrap();
        tokio::task::yield_now().await;

        assert_eq!(list.state().items, Some(beta_items()));
        assert_eq!(list.filter(), Some("beta"));
    }

    #[tokio::test]
    async fn test_naive_list_reports_http_status() {
        let fetcher = MockFetcher::new(|_| error_response(StatusCode::INTERNAL_SERVER_ERROR, "Random demo error"));
        let env = NaiveEnvironment::new(NetworkTracker::new(), fetcher, base_url());
        let mut list = env.list();

        list.set_filter("alpha");
        let state = list.settled().await;
        assert_eq!(state.error.as_deref(), Some("HTTP 500"));
        assert_eq!(state.items, None);
        assert_eq!(state.status_line(), "Loaded 0 items");
    }

    #[tokio::test]
    async fn test_cached_lists_share_one_fetch() {
        let fetcher = backend_fetcher();
        let env = cache_env(fetcher.clone());

        let mut first = env.list().with_delay(0);
        let mut second = env.list().with_delay(0);
        first.set_filter("alpha");
        second.set_filter("alpha");
        first.settled().await;
        second.settled().await;

        assert_eq!(first.items(), alpha_items());
        assert_eq!(second.items(), alpha_items());
        assert_eq!(first.status_line(), "Loaded 2 items");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_filter_round_trip_naive_vs_cached() {
        let naive_fetcher = backend_fetcher();
        let naive = NaiveEnvironment::new(NetworkTracker::new(), naive_fetcher.clone(), base_url());
        let mut naive_lists = [naive.list().with_delay(0), naive.list().with_delay(0)];

        let cached_fetcher = backend_fetcher();
        let cached = cache_env(cached_fetcher.clone());
        let mut cached_lists = [cached.list().with_delay(0), cached.list().with_delay(0)];

        for filter in ["alpha", "beta", "alpha"] {
            for list in naive_lists.iter_mut() {
                list.set_filter(filter);
            }
            for list in naive_lists.iter() {
                list.settled().await;
            }

            for list in cached_lists.iter_mut() {
                list.set_filter(filter);
            }
            for list in cached_lists.iter_mut() {
                list.settled().await;
            }
        }

        assert_eq!(naive_fetcher.calls(), 6);
        assert_eq!(naive.tracker.snapshot().total_requests, 6);

        // alpha and beta once each, the return to alpha is served warm
        assert_eq!(cached_fetcher.calls(), 2);
        let metrics = cached.tracker.snapshot();
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.cache_hits, 2);
        assert_eq!(metrics.unique_urls, 2);
        for list in cached_lists.iter() {
            assert_eq!(list.items(), alpha_items());
        }
    }

    #[tokio::test]
    async fn test_mutate_first_refreshes_every_list_once() {
        let fetcher = backend_fetcher();
        let env = cache_env(fetcher.clone());

        let mut first = env.list().with_delay(0);
        let mut second = env.list().with_delay(0);
        first.set_filter("alpha");
        second.set_filter("alpha");
        first.settled().await;
        second.settled().await;

        let saved = first.mutate_first().await.unwrap().unwrap();
        assert_eq!(saved.id, "1");
        assert_eq!(saved.name, "Alpha One ✨");

        first.settled().await;
        second.settled().await;
        assert_eq!(first.items()[0].name, "Alpha One ✨");
        assert_eq!(second.items()[0].name, "Alpha One ✨");

        // GET, PUT, one refetch for the shared query
        assert_eq!(fetcher.calls(), 3);
        assert!(!first.is_saving());
    }

    #[tokio::test(start_paused = true)]
    async fn test_saving_flag_blocks_concurrent_mutations() {
        let backend = FakeItemsBackend::new(backend_items());
        let fetcher = MockFetcher::with_latency(Duration::from_millis(100), move |request| backend.handle(request));
        let env = cache_env(fetcher.clone());

        let mut list = env.list();
        list.set_filter("alpha");
        list.settled().await;
        assert_eq!(list.button_label(), "Mutate first item (invalidates cache)");

        let mut saving = list.subscribe_saving();
        let (first, second) = tokio::join!(list.mutate_first(), async {
            saving.changed().await.unwrap();
            assert!(*saving.borrow());
            assert!(list.is_saving());
            assert_eq!(list.button_label(), "Saving…");
            list.mutate_first().await
        });

        assert!(first.unwrap().is_some());
        assert_eq!(second.unwrap(), None);
        assert!(!list.is_saving());
        assert_eq!(list.button_label(), "Mutate first item (invalidates cache)");

        list.settled().await;
        // GET, one PUT, one refetch
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_mutate_first_on_empty_list_does_nothing() {
        let fetcher = MockFetcher::new(|_| items_response(&[]));
        let env = cache_env(fetcher.clone());
        let mut list = env.list().with_delay(0);
        list.set_filter("zeta");
        list.settled().await;

        assert_eq!(list.mutate_first().await.unwrap(), None);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_cached_list_surfaces_errors() {
        let fetcher = MockFetcher::new(|_| error_response(StatusCode::INTERNAL_SERVER_ERROR, "Random demo error"));
        let env = cache_env(fetcher);
        let mut list = env.list().with_delay(0);
        list.set_filter("alpha");
        list.settled().await;

        assert_eq!(list.error_message().as_deref(), Some("Random demo error"));
        assert!(list.items().is_empty());
    }
}
