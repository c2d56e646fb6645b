//! # Elastic-KV Block Benchmarks
//!
//! | Group | Measures |
//! |-------|----------|
//! | ekv-01-write-path | client write on a singleton and on a 3-replica chain |
//! | ekv-01-migration | `export_slots` of a populated range |
//! | ekv-01-snapshot | snapshot encode / decode |
//! | ekv-02-allocator | allocate + free round |

use std::sync::Arc;
use std::time::Duration;

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use ekv_01_storage_block::{BlockConfig, BlockContents, BlockSnapshot};
use ekv_02_block_allocator::{AllocatorConfig, BlockAllocationApi, BlockAllocator};
use ekv_tests::integration::fixtures::Cluster;
use rand::Rng;
use shared_types::SLOT_MAX;
use tokio::runtime::Runtime;

fn bench_config() -> BlockConfig {
    BlockConfig {
        capacity_bytes: 1 << 30,
        ..BlockConfig::default()
    }
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn bench_write_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("ekv-01-write-path");
    group.measurement_time(Duration::from_secs(5));
    let rt = runtime();

    let single = Cluster::with_config(bench_config(), &[&["s"]]);
    single.setup_singleton("s", 0, SLOT_MAX);
    let chain = Cluster::with_config(bench_config(), &[&["a"], &["b"], &["c"]]);
    chain.setup_chain(&["a", "b", "c"], 0, SLOT_MAX);

    for (label, cluster, head) in [("singleton", &single, "s"), ("chain3", &chain, "a")] {
        let mut i = 0u32;
        group.bench_function(label, |b| {
            b.iter(|| {
                i = i.wrapping_add(1);
                let slot = i % SLOT_MAX;
                rt.block_on(cluster.put(head, slot, &format!("k{}", i % 4096), "value"))
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_migration(c: &mut Criterion) {
    let mut group = c.benchmark_group("ekv-01-migration");
    group.sample_size(20);
    let rt = runtime();

    for keys in [100u32, 1_000, 10_000] {
        group.throughput(Throughput::Elements(keys as u64));
        group.bench_with_input(BenchmarkId::new("export_slots", keys), &keys, |b, &keys| {
            b.iter_batched(
                || {
                    let cluster = Cluster::with_config(bench_config(), &[&["src"], &["dst"]]);
                    cluster.setup_singleton("src", 0, SLOT_MAX);
                    rt.block_on(async {
                        for i in 0..keys {
                            cluster
                                .put("src", i % 1000, &format!("k{}", i), "value")
                                .await
                                .unwrap();
                        }
                    });
                    cluster.prepare_migration("src", &["dst"], 0, 1000);
                    cluster
                },
                |cluster| rt.block_on(cluster.export("src")).unwrap(),
                BatchSize::PerIteration,
            )
        });
    }
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("ekv-01-snapshot");
    let mut rng = rand::thread_rng();

    for entries in [1_000usize, 50_000] {
        let contents = BlockContents::from_entries((0..entries).map(|i| {
            let value: Vec<u8> = (0..64).map(|_| rng.gen()).collect();
            (rng.gen_range(0..SLOT_MAX), format!("key-{}", i).into_bytes(), value)
        }));
        let encoded = BlockSnapshot::capture(&contents).encode().unwrap();

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", entries), &contents, |b, contents| {
            b.iter(|| black_box(BlockSnapshot::capture(contents).encode().unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("decode", entries), &encoded, |b, encoded| {
            b.iter(|| black_box(BlockSnapshot::decode(encoded).unwrap()))
        });
    }
    group.finish();
}

fn bench_allocator(c: &mut Criterion) {
    let mut group = c.benchmark_group("ekv-02-allocator");
    let names: Vec<String> = (0..1024).map(|i| format!("host:9090:{}", i)).collect();
    let allocator = Arc::new(BlockAllocator::new(AllocatorConfig::with_blocks(names)).unwrap());

    group.bench_function("allocate_free", |b| {
        b.iter(|| {
            let name = allocator.allocate().unwrap();
            allocator.free(&name).unwrap();
        })
    });
    group.bench_function("allocate_many_3", |b| {
        b.iter(|| {
            let chain = allocator.allocate_many(3, &[]).unwrap();
            for name in &chain {
                allocator.free(name).unwrap();
            }
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_write_path,
    bench_migration,
    bench_snapshot,
    bench_allocator
);
criterion_main!(benches);
