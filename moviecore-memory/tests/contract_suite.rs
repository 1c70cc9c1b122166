//! Runs the shared `MovieStore` contract against the in-memory store.

use moviecore_testing::contract::movie_store_contract_tests;

movie_store_contract_tests! {
    suite = in_memory,
    make_store = moviecore_memory::InMemoryMovieStore::new,
}
