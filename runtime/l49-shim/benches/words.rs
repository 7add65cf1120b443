use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use l49_shim::sys::{MsgRegs, MSG_MAX_BYTES};
use l49_shim::words::{pack, unpack};

fn bench_pack_unpack(c: &mut Criterion) {
    let mut group = c.benchmark_group("words");
    let mut regs = MsgRegs::new();
    let mut dst = [0u8; MSG_MAX_BYTES];

    for len in [4, 64, MSG_MAX_BYTES] {
        let src = vec![0x42u8; len];
        group.throughput(Throughput::Bytes(len as u64));

        group.bench_with_input(BenchmarkId::new("pack", len), &src, |b, src| {
            b.iter(|| pack(&mut regs, black_box(src)).unwrap())
        });

        let words = pack(&mut regs, &src).unwrap();
        group.bench_with_input(BenchmarkId::new("unpack", len), &words, |b, &words| {
            b.iter(|| unpack(&regs, words, black_box(&mut dst)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pack_unpack);
criterion_main!(benches);
