use criterion::{criterion_group, criterion_main, Criterion};
use rand::Rng;

use ruppert::{triangulate, Options, Point, TriangulateInput};

fn cloud<R: Rng + ?Sized>(rng: &mut R, n: usize) -> TriangulateInput {
  TriangulateInput {
    points: (0..n)
      .map(|_| {
        Point::new(
          rng.gen_range(-100.0..100.0),
          rng.gen_range(-100.0..100.0),
        )
      })
      .collect(),
    ..TriangulateInput::default()
  }
}

/// Regular polygon with every boundary edge constrained.
fn disc(n: usize) -> TriangulateInput {
  let step = std::f64::consts::TAU / (n as f64);
  let points: Vec<Point> = (0..n)
    .map(|i| {
      let t = (i as f64) * step;
      Point::new(100.0 * t.cos(), 100.0 * t.sin())
    })
    .collect();
  let segments = (0..n).map(|i| [i, (i + 1) % n]).collect();
  TriangulateInput {
    points,
    segments,
    ..TriangulateInput::default()
  }
}

pub fn criterion_benchmark(c: &mut Criterion) {
  let mut rng = rand::thread_rng();
  let plain = Options::default();
  let quality = match Options::from_switches("pq25a50") {
    Ok(options) => options,
    Err(err) => panic!("bad switches: {}", err),
  };

  let small = cloud(&mut rng, 1_000);
  let large = cloud(&mut rng, 10_000);
  c.bench_function("triangulate(1e3)", |b| {
    b.iter(|| triangulate(&small, &plain))
  });
  c.bench_function("triangulate(1e4)", |b| {
    b.iter(|| triangulate(&large, &plain))
  });

  let ring = disc(100);
  c.bench_function("refine(disc, pq25a50)", |b| {
    b.iter(|| triangulate(&ring, &quality))
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
