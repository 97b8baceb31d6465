use bson::doc;
use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use tally_collection::Collection;

// ── Helpers ─────────────────────────────────────────────────

fn parents(n: usize) -> Collection {
    Collection::new((0..n).map(|i| {
        doc! {
            "ID": i as i64,
            "status": if i % 2 == 0 { "completed" } else { "pending" },
        }
    }))
}

/// Four children per parent, in parent order.
fn children(n: usize) -> Collection {
    Collection::new((0..n).flat_map(|i| {
        (0..4).map(move |j| {
            doc! {
                "order_id": i as i64,
                "order_item_id": (i * 4 + j) as i64,
                "order_item_name": format!("Item {j}"),
            }
        })
    }))
}

// ── Bulk attach ─────────────────────────────────────────────

fn bench_attach(c: &mut Criterion) {
    let mut group = c.benchmark_group("attach");
    for n in [100, 1_000, 10_000] {
        let parents = parents(n);
        let children = children(n);
        group.bench_with_input(
            BenchmarkId::from_parameter(n),
            &(parents, children),
            |b, (parents, children)| {
                b.iter_batched(
                    || (parents.clone(), children.clone()),
                    |(mut parents, children)| {
                        parents.add_relation("items", children, "order_id", "ID");
                        parents
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }
    group.finish();
}

fn bench_group_by(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_by");
    for n in [100, 1_000, 10_000] {
        let children = children(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &children, |b, children| {
            b.iter(|| children.group_by("order_id"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_attach, bench_group_by);
criterion_main!(benches);
