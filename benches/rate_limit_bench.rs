use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use learndev::middleware::rate_limit::RateLimiter;

fn benchmark_single_key(c: &mut Criterion) {
    // High limit so the hot path stays in the increment branch
    let limiter = RateLimiter::new(u32::MAX, 60);

    c.bench_function("admit_single_key", |b| {
        b.iter(|| {
            let decision = limiter.admit(black_box("203.0.113.1"), black_box("/challenge/available"));
            black_box(decision.unwrap());
        })
    });
}

fn benchmark_many_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("admit_many_keys");
    for key_count in [16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(key_count), &key_count, |b, &n| {
            let limiter = RateLimiter::new(u32::MAX, 60);
            // Pre-populate the counter table
            for i in 0..n {
                limiter.admit(&format!("10.0.{}.{}", i / 256, i % 256), "/healthz").unwrap();
            }
            let mut i = 0usize;
            b.iter(|| {
                i = (i + 1) % n;
                let client = format!("10.0.{}.{}", i / 256, i % 256);
                black_box(limiter.admit(black_box(&client), "/healthz").unwrap());
            })
        });
    }
    group.finish();
}

fn benchmark_contention(c: &mut Criterion) {
    let limiter = RateLimiter::new(u32::MAX, 60);

    c.bench_function("admit_under_contention", |b| {
        b.iter_custom(|iters| {
            let threads = 4;
            let per_thread = iters / threads + 1;
            let start = std::time::Instant::now();
            let handles: Vec<_> = (0..threads)
                .map(|t| {
                    let limiter = limiter.clone();
                    std::thread::spawn(move || {
                        let client = format!("10.1.0.{}", t);
                        for _ in 0..per_thread {
                            let _ = black_box(limiter.admit(&client, "/challenge/available"));
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            start.elapsed()
        })
    });
}

criterion_group!(benches, benchmark_single_key, benchmark_many_keys, benchmark_contention);
criterion_main!(benches);
