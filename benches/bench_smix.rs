use criterion::{Criterion, criterion_group, criterion_main};

use scrypt_smix::{ScryptCore, ScryptRoutines};

fn bench_smix(c: &mut Criterion) {
    let mut group = c.benchmark_group("smix");

    for (n, r) in [(1024u32, 1usize), (1024, 8), (16384, 8)] {
        // table fill plus table lookup both touch 128 * r * N bytes
        group.throughput(criterion::Throughput::Bytes(2 * 128 * r as u64 * n as u64));

        let mut counter = 0u64;
        let mut data = vec![0u8; 128 * r];
        group.bench_function(format!("detected/n={n}/r={r}"), |b| {
            b.iter(|| {
                data[..8].copy_from_slice(&counter.to_le_bytes());
                counter += 1;
                ScryptCore::new(&mut data, 1, n).unwrap().smix(0).unwrap();
                core::hint::black_box(&data);
            });
        });

        let mut counter = 0u64;
        let mut data = vec![0u8; 128 * r];
        group.bench_function(format!("portable/n={n}/r={r}"), |b| {
            b.iter(|| {
                data[..8].copy_from_slice(&counter.to_le_bytes());
                counter += 1;
                ScryptCore::with_routines(&mut data, 1, n, ScryptRoutines::portable())
                    .unwrap()
                    .smix(0)
                    .unwrap();
                core::hint::black_box(&data);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_smix);
criterion_main!(benches);
