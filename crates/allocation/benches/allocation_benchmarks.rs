use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, Utc};
use wms_allocation::{AllocationEngine, CancellationCoordinator};
use wms_core::{LineItemId, OrderId, ProductNumber, SkuId};
use wms_infra::{InMemoryStores, OrderStore, SkuStore};
use wms_inventory::Sku;
use wms_orders::{Order, OrderPriority};

const PRODUCTS: usize = 20;
const SKUS_PER_PRODUCT: usize = 5;

/// Stores seeded with `orders` released orders of two lines each, against
/// roughly enough stock to cover three quarters of the demand.
fn backlog(orders: usize) -> InMemoryStores {
    let mem = InMemoryStores::new();
    let per_sku = (orders * 2 * 10 * 3 / 4 / (PRODUCTS * SKUS_PER_PRODUCT)).max(1) as i64;
    for p in 0..PRODUCTS {
        for s in 0..SKUS_PER_PRODUCT {
            let sku = Sku::new(
                SkuId::new(format!("SKU-{p:02}-{s}")),
                ProductNumber::new(format!("P{p:02}")),
                per_sku,
                format!("L{s}-{p:02}"),
            )
            .expect("valid sku");
            mem.skus.save(&sku).expect("seed sku");
        }
    }

    let start = Utc::now() - Duration::hours(1);
    for i in 0..orders {
        let priority = match i % 3 {
            0 => OrderPriority::Low,
            1 => OrderPriority::Normal,
            _ => OrderPriority::High,
        };
        let mut order = Order::new(
            OrderId::new(format!("ORD{i:06}")),
            priority,
            start + Duration::milliseconds(i as i64),
            i % 5 == 0,
        );
        for k in 0..2 {
            order
                .add_line_item(
                    LineItemId::new(format!("ORD{i:06}-L{k}")),
                    ProductNumber::new(format!("P{:02}", (i + k * 7) % PRODUCTS)),
                    10,
                )
                .expect("valid line");
        }
        mem.orders.save(&order).expect("seed order");
    }
    mem
}

fn bench_process_released_orders(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_released_orders");
    for orders in [100usize, 1_000] {
        group.throughput(Throughput::Elements(orders as u64));
        group.bench_with_input(BenchmarkId::from_parameter(orders), &orders, |b, &orders| {
            b.iter_batched(
                || backlog(orders),
                |mem| {
                    let engine = AllocationEngine::new(mem.stores("bench"));
                    black_box(engine.process_released_orders().expect("process"))
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_cancel_after_allocation(c: &mut Criterion) {
    c.bench_function("cancel_order_after_allocation", |b| {
        b.iter_batched(
            || {
                let mem = backlog(100);
                AllocationEngine::new(mem.stores("bench"))
                    .process_released_orders()
                    .expect("process");
                mem
            },
            |mem| {
                let coordinator = CancellationCoordinator::new(mem.stores("bench"));
                for i in (0..100).step_by(3) {
                    black_box(
                        coordinator
                            .cancel_order(&OrderId::new(format!("ORD{i:06}")))
                            .expect("cancel"),
                    );
                }
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_process_released_orders, bench_cancel_after_allocation);
criterion_main!(benches);
