use chrono::{NaiveDate, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;
use std::sync::Arc;
use zerospoil_core::config::NEAR_EXPIRY_DAYS;
use zerospoil_core::{derive_status, ItemDraft};
use zerospoil_engine::{claim, post_for_redistribution, InventoryQuery, InventorySession, Ledger};
use zerospoil_store::MemoryStore;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn draft(i: usize) -> ItemDraft {
    ItemDraft {
        store_id: format!("S-{:03}", i % 7),
        store_name: format!("Store {}", i % 7),
        store_address: "1 High St".into(),
        product: format!("Product {i}"),
        qty: Some(Decimal::new(1_000 + i as i64, 1)),
        expiry_date: NaiveDate::from_ymd_opt(2026, 10, 1 + (i % 28) as u32),
        category: Some(["Fruit", "Dairy", "Bakery"][i % 3].into()),
    }
}

/// A board of `posts` offers by alice, each with a matching inventory item.
fn seeded(posts: usize) -> (Ledger, Vec<zerospoil_core::PostId>) {
    let ledger = Ledger::new(Arc::new(MemoryStore::new()));
    let mut session = InventorySession::load(&ledger, "alice").unwrap();
    let mut ids = Vec::with_capacity(posts);
    for i in 0..posts {
        let item = session.add_item(&ledger, draft(i), Utc::now()).unwrap();
        let post = post_for_redistribution(&ledger, &mut session, &item, Utc::now()).unwrap();
        ids.push(post.post_id);
    }
    (ledger, ids)
}

// ---------------------------------------------------------------------------
// Benchmark: claim settlement
// ---------------------------------------------------------------------------

fn bench_claim(c: &mut Criterion) {
    let mut group = c.benchmark_group("claim");
    for posts in [1, 50, 200] {
        group.bench_with_input(BenchmarkId::from_parameter(posts), &posts, |b, &posts| {
            b.iter_batched(
                || seeded(posts),
                |(ledger, ids)| {
                    let receipt = claim(
                        &ledger,
                        "bob",
                        &ids[ids.len() / 2],
                        Decimal::new(25, 1),
                        Utc::now(),
                    )
                    .unwrap();
                    black_box(receipt)
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: status derivation and inventory query
// ---------------------------------------------------------------------------

fn bench_status(c: &mut Criterion) {
    let now = NaiveDate::from_ymd_opt(2026, 10, 16)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let expiry = NaiveDate::from_ymd_opt(2026, 10, 17);
    c.bench_function("derive_status", |b| {
        b.iter(|| derive_status(black_box(false), black_box(expiry), black_box(now), NEAR_EXPIRY_DAYS))
    });

    let ledger = Ledger::new(Arc::new(MemoryStore::new()));
    let mut session = InventorySession::load(&ledger, "alice").unwrap();
    for i in 0..500 {
        session.add_item(&ledger, draft(i), Utc::now()).unwrap();
    }
    let query = InventoryQuery {
        search: Some("store 3".into()),
        sort: Some((
            zerospoil_engine::SortKey::Expiry,
            zerospoil_engine::SortDirection::Descending,
        )),
        ..Default::default()
    };
    c.bench_function("inventory_query_500", |b| {
        b.iter(|| black_box(query.apply(session.items(), now).len()))
    });
}

criterion_group!(benches, bench_claim, bench_status);
criterion_main!(benches);
