use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gfstripe::{engine, Block, BlockBuffer, BlockFlag, BlockRole};

const BLOCK_SIZE: usize = 64 * 1024;

fn make_blocks(num_data: usize, num_parity: usize) -> Vec<Block> {
    let mut blocks: Vec<Block> = (0..num_data)
        .map(|i| {
            let data: Vec<u8> = (0..BLOCK_SIZE).map(|j| (i * 31 + j) as u8).collect();
            Block::new(i, BlockRole::Data, BlockBuffer::from_vec(data))
        })
        .collect();
    for i in num_data..num_data + num_parity {
        blocks.push(Block::needs_generating(
            i,
            BlockRole::Parity,
            BlockBuffer::new(BLOCK_SIZE),
        ));
    }
    blocks
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_parity");
    for (num_data, num_parity) in [(4, 2), (10, 4), (20, 8)] {
        group.throughput(Throughput::Bytes((num_data * BLOCK_SIZE) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{num_data}+{num_parity}")),
            &(num_data, num_parity),
            |b, &(num_data, num_parity)| {
                let info = engine::begin_generate(num_data, num_parity, None).unwrap();
                let mut blocks = make_blocks(num_data, num_parity);
                b.iter(|| {
                    engine::zero_fill_targets(&mut blocks);
                    engine::generate_blocks(&mut blocks, &info);
                });
            },
        );
    }
    group.finish();
}

fn bench_recover(c: &mut Criterion) {
    let mut group = c.benchmark_group("recover");
    for (num_data, num_parity) in [(4, 2), (10, 4)] {
        group.throughput(Throughput::Bytes((num_parity * BLOCK_SIZE) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{num_data}+{num_parity}")),
            &(num_data, num_parity),
            |b, &(num_data, num_parity)| {
                let mut blocks = make_blocks(num_data, num_parity);
                engine::generate_parity(&mut blocks, None).unwrap();
                for block in &mut blocks {
                    block.set_flag(BlockFlag::NeedsGenerating, false);
                }
                // Lose the first num_parity data blocks.
                let mut have = vec![true; num_data + num_parity];
                for block in blocks.iter_mut().take(num_parity) {
                    block.set_flag(BlockFlag::NeedsGenerating, true);
                    have[block.index()] = false;
                }
                let info =
                    engine::begin_recover(&have, num_data, num_parity, None, false).unwrap();
                b.iter(|| {
                    engine::zero_fill_targets(&mut blocks);
                    engine::recover_blocks(&mut blocks, &info);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_generate, bench_recover);
criterion_main!(benches);
