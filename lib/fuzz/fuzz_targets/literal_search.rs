#![no_main]
use libfuzzer_sys::fuzz_target;
use retrack::{LiteralSearcher, SearchConfig};

fuzz_target!(|data: &[u8]| {
    let Some((&len, data)) = data.split_first() else {
        return;
    };
    let len = (len as usize).min(data.len());
    let (literal, haystack) = data.split_at(len);

    let configs = [
        SearchConfig::default(),
        SearchConfig { simd: false, ..Default::default() },
        SearchConfig {
            dfa_max_len: 0,
            horspool_min_len: 2,
            ..Default::default()
        },
        SearchConfig {
            dfa_max_len: 0,
            horspool_min_len: usize::MAX,
            ..Default::default()
        },
    ];

    for config in &configs {
        let searcher = LiteralSearcher::with_config(literal, config);
        assert_eq!(
            searcher.find(haystack),
            searcher.find_naive(haystack),
            "strategy: {:?}",
            searcher.strategy()
        );
    }
});
