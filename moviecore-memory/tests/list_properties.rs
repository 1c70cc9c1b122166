//! Property tests for paging through an in-memory store.

use std::collections::BTreeSet;

use moviecore_memory::InMemoryMovieStore;
use moviecore_types::{MovieDetails, MovieId, MovieRecord, MovieStore, MovieWrite};
use proptest::prelude::*;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("current-thread runtime")
        .block_on(future)
}

fn seeded_store(ids: &BTreeSet<String>) -> InMemoryMovieStore {
    let store = InMemoryMovieStore::new();
    block_on(async {
        for raw in ids {
            let id = MovieId::try_new(raw.as_str()).expect("generated ids are valid");
            store
                .put(&MovieWrite::new(MovieRecord::new(id, raw.as_str(), "d", "x")))
                .await
                .expect("put succeeds");
        }
    });
    store
}

fn ids_of(page: &[MovieDetails]) -> Vec<String> {
    page.iter().map(|details| details.id().to_string()).collect()
}

proptest! {
    #[test]
    fn list_pages_are_ordered_and_bounded(
        ids in prop::collection::btree_set("[a-z][a-z0-9]{0,8}", 0..20),
        skip in 0i64..25,
        take in 0i64..25,
    ) {
        let store = seeded_store(&ids);

        let page = block_on(store.list(skip, take)).expect("valid page");

        let expected: Vec<String> = ids
            .iter()
            .skip(usize::try_from(skip).expect("small skip"))
            .take(usize::try_from(take).expect("small take"))
            .cloned()
            .collect();
        prop_assert_eq!(ids_of(&page), expected);
    }

    #[test]
    fn unchanged_store_lists_the_same_page_twice(
        ids in prop::collection::btree_set("[a-z][a-z0-9]{0,8}", 1..20),
        skip in 0i64..20,
        take in 1i64..20,
    ) {
        let store = seeded_store(&ids);

        let first = block_on(store.list(skip, take)).expect("valid page");
        let second = block_on(store.list(skip, take)).expect("valid page");

        prop_assert_eq!(first, second);
    }

    #[test]
    fn consecutive_pages_cover_every_movie_once(
        ids in prop::collection::btree_set("[a-z][a-z0-9]{0,8}", 0..30),
        take in 1i64..7,
    ) {
        let store = seeded_store(&ids);

        let mut seen = Vec::new();
        let mut skip = 0;
        loop {
            let page = block_on(store.list(skip, take)).expect("valid page");
            if page.is_empty() {
                break;
            }
            seen.extend(ids_of(&page));
            skip += take;
        }

        prop_assert_eq!(seen, ids.into_iter().collect::<Vec<_>>());
    }
}
