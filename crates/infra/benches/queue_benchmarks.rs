use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;
use std::thread;

use taskq_core::JobRecord;
use taskq_infra::jobs::JobQueue;

fn records(n: usize) -> Vec<JobRecord> {
    (0..n)
        .map(|i| JobRecord::new("bench", format!(r#"{{"n":{i}}}"#)))
        .collect()
}

fn bench_enqueue_dequeue(c: &mut Criterion) {
    let mut group = c.benchmark_group("enqueue_dequeue");

    for batch_size in [1, 100, 10_000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let batch = records(batch_size);
                let queue = JobQueue::new();
                b.iter(|| {
                    for record in batch.iter().cloned() {
                        queue.enqueue(record);
                    }
                    while let Some(record) = queue.dequeue() {
                        black_box(record);
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_concurrent_producers(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_producers");
    let per_producer = 1_000;

    for producers in [2, 8].iter() {
        group.throughput(Throughput::Elements((*producers * per_producer) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(producers),
            producers,
            |b, &producers| {
                let batch = Arc::new(records(per_producer));
                b.iter(|| {
                    let queue = Arc::new(JobQueue::new());
                    let handles: Vec<_> = (0..producers)
                        .map(|_| {
                            let queue = queue.clone();
                            let batch = batch.clone();
                            thread::spawn(move || {
                                for record in batch.iter().cloned() {
                                    queue.enqueue(record);
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }
                    assert_eq!(queue.len(), producers * per_producer);
                });
            },
        );
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for depth in [10, 1_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, &depth| {
            let queue = JobQueue::new();
            for record in records(depth) {
                queue.enqueue(record);
            }
            b.iter(|| black_box(queue.snapshot()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_enqueue_dequeue,
    bench_concurrent_producers,
    bench_snapshot
);
criterion_main!(benches);
