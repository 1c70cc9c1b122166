mod common;

mod postgres_contract_suite {
    use moviecore_testing::contract::movie_store_contract_tests;

    movie_store_contract_tests! {
        suite = postgres_contract,
        make_store = || {
            crate::common::make_store()
        },
    }
}
