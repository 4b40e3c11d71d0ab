use std::sync::Mutex;

use async_trait::async_trait;
use chatlog_core::flatten::{flatten, FlattenOptions, Flattened};
use chatlog_core::model::{Cursor, LogPage, RawLogEntry};
use chatlog_core::paginator::{count_entries, fetch_all, PageOptions};
use chatlog_core::source::LogSource;
use chatlog_core::Result;
use proptest::prelude::*;
use serde_json::json;

/// Serves pages of the given sizes, chained by cursor.
struct SizedSource {
    sizes: Vec<usize>,
    fetches: Mutex<usize>,
}

#[async_trait]
impl LogSource for SizedSource {
    async fn fetch_page(&self, _: &str, cursor: Option<&Cursor>, _: u32) -> Result<LogPage> {
        *self.fetches.lock().unwrap() += 1;
        let index: usize = cursor.map(|c| c.as_str().parse().unwrap()).unwrap_or(0);
        let entries = (0..self.sizes[index])
            .map(|n| {
                RawLogEntry::new(json!({
                    "request_timestamp": format!("2020-04-01T10:{:02}:{:02}Z", n % 60, index % 60),
                    "response_timestamp": "2020-04-01T11:00:00Z",
                    "response": {
                        "context": { "conversation_id": format!("conv-{}", n % 3) }
                    }
                }))
            })
            .collect();
        let next = (index + 1 < self.sizes.len()).then(|| Cursor::new((index + 1).to_string()));
        Ok(LogPage::new(entries, next))
    }
}

fn run<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(fut)
}

proptest! {
    /// Property: without a cap, every served page comes back once, in order
    #[test]
    fn prop_fetches_each_page_once(sizes in prop::collection::vec(0usize..5, 1..20)) {
        let source = SizedSource { sizes: sizes.clone(), fetches: Mutex::new(0) };
        let pages = run(fetch_all(&source, "f", &PageOptions::default(), |_, _| {})).unwrap();

        prop_assert_eq!(pages.len(), sizes.len());
        prop_assert_eq!(*source.fetches.lock().unwrap(), sizes.len());
        let got: Vec<usize> = pages.iter().map(|p| p.entries.len()).collect();
        prop_assert_eq!(got, sizes);
    }

    /// Property: a cap of k stops after exactly min(k, available) fetches
    #[test]
    fn prop_cap_truncates(available in 1usize..30, cap in 1u32..30) {
        let source = SizedSource { sizes: vec![1; available], fetches: Mutex::new(0) };
        let options = PageOptions { page_size: 10, max_pages: cap };
        let pages = run(fetch_all(&source, "f", &options, |_, _| {})).unwrap();

        let expected = available.min(cap as usize);
        prop_assert_eq!(pages.len(), expected);
        prop_assert_eq!(*source.fetches.lock().unwrap(), expected);
    }

    /// Property: one row per entry, grouped by conversation in time order
    #[test]
    fn prop_rows_match_entries(sizes in prop::collection::vec(0usize..8, 1..10)) {
        let source = SizedSource { sizes, fetches: Mutex::new(0) };
        let pages = run(fetch_all(&source, "f", &PageOptions::default(), |_, _| {})).unwrap();
        let total = count_entries(&pages);

        match flatten(&pages, &FlattenOptions::default()).unwrap() {
            Flattened::NoRecords => prop_assert_eq!(total, 0),
            Flattened::Rows(rows) => {
                prop_assert_eq!(rows.len(), total);
                for pair in rows.windows(2) {
                    let key_a = (&pair[0].conversation_id, pair[0].request_timestamp);
                    let key_b = (&pair[1].conversation_id, pair[1].request_timestamp);
                    prop_assert!(key_a <= key_b);
                }
            }
        }
    }
}

#[test]
fn cap_of_five_over_ten_available() {
    let source = SizedSource {
        sizes: vec![2; 10],
        fetches: Mutex::new(0),
    };
    let options = PageOptions {
        page_size: 2,
        max_pages: 5,
    };
    let pages = run(fetch_all(&source, "f", &options, |_, _| {})).unwrap();
    assert_eq!(pages.len(), 5);
    assert_eq!(count_entries(&pages), 10);
}
