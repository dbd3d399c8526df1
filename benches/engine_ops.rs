use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;
use succinct_2048::engine::{Direction, Grid};
use succinct_2048::report::{DigestProver, ProofService, ProveFinalRequest};
use succinct_2048::session::Session;

fn corpus() -> Vec<Grid> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut grids = vec![Grid::EMPTY];
    let mut g = Grid::EMPTY;
    g.spawn_tile(&mut rng);
    g.spawn_tile(&mut rng);
    grids.push(g);
    // Walk a fixed move cycle to get a spread of densities
    for i in 0..40 {
        let (next, _) = g.shift(Direction::ALL[i % 4]);
        if next != g {
            g = next;
            g.spawn_tile(&mut rng);
        }
        grids.push(g);
    }
    grids
}

fn bench_shift(c: &mut Criterion) {
    let grids = corpus();
    for dir in Direction::ALL {
        c.bench_function(&format!("shift/{dir}"), |bch| {
            bch.iter(|| {
                let mut acc = 0u64;
                for g in &grids {
                    acc = acc.wrapping_add(g.shift(dir).1);
                }
                black_box(acc)
            })
        });
    }
}

fn bench_terminal(c: &mut Criterion) {
    let grids = corpus();
    let full = Grid::from_rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
    c.bench_function("is_terminal/corpus", |bch| {
        bch.iter(|| grids.iter().filter(|g| g.is_terminal()).count())
    });
    c.bench_function("is_terminal/full", |bch| bch.iter(|| black_box(full).is_terminal()));
}

fn bench_session(c: &mut Criterion) {
    c.bench_function("session/play_out", |bch| {
        bch.iter_batched(
            || StdRng::seed_from_u64(7),
            |mut rng| {
                let mut session = Session::new(&mut rng);
                let mut i = 0;
                while !session.is_terminal() {
                    session.apply(Direction::ALL[i % 4], &mut rng);
                    i += 1;
                }
                black_box(session.score())
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_digest(c: &mut Criterion) {
    let mut prover = DigestProver::new();
    let request = ProveFinalRequest { username: "alice".into(), final_point: 20_480 };
    c.bench_function("digest/prove_final", |bch| {
        bch.iter(|| black_box(prover.prove_final(&request)).is_ok())
    });
}

criterion_group!(benches, bench_shift, bench_terminal, bench_session, bench_digest);
criterion_main!(benches);
