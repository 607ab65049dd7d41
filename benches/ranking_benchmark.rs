use banco_raices::models::{Profile, Role};
use banco_raices::services::leaderboard::rank_students;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn synthetic_students(count: u32) -> Vec<Profile> {
    (0..count)
        .map(|i| {
            let mut profile = Profile::new(
                format!("student-{i:06}"),
                format!("Student {i}"),
                format!("{}A", i % 6 + 1),
                Role::Student,
                None,
                "2024-01-01T00:00:00Z",
            );
            // Spread balances with plenty of ties to exercise the tie-break
            profile.balance = (i * 37) % 500;
            profile
        })
        .collect()
}

fn benchmark_rank_students(c: &mut Criterion) {
    let small = synthetic_students(100);
    let large = synthetic_students(10_000);

    let mut group = c.benchmark_group("rank_students");

    group.bench_function("top10_of_100", |b| {
        b.iter(|| rank_students(black_box(small.clone()), 10))
    });

    group.bench_function("top10_of_10000", |b| {
        b.iter(|| rank_students(black_box(large.clone()), 10))
    });

    group.bench_function("full_ranking_of_10000", |b| {
        b.iter(|| rank_students(black_box(large.clone()), 10_000))
    });

    group.finish();
}

criterion_group!(benches, benchmark_rank_students);
criterion_main!(benches);
