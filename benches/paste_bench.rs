use criterion::{black_box, criterion_group, criterion_main, Criterion};
use schempaste::formats::anvil::{pack_block_states, unpack_block_states, ChunkData};
use schempaste::{paste, BlockState, Dimension, PasteOptions, Schematic, SchematicLevel};
use std::time::Duration;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_tile(size: i32) -> SchematicLevel {
    let mut schematic = Schematic::new("bench", (size, size, size));
    let blocks = [
        BlockState::new("minecraft:stone"),
        BlockState::new("minecraft:dirt"),
        BlockState::new("minecraft:grass_block"),
    ];
    let mut counter = 0i32;
    for y in 0..size {
        for z in 0..size {
            for x in 0..size {
                counter = counter.wrapping_mul(1103515245).wrapping_add(12345);
                let block = &blocks[(counter.unsigned_abs() % 3) as usize];
                schematic.set_block(x, y, z, block);
            }
        }
    }
    SchematicLevel::new("bench.schematic", schematic)
}

// ── Benchmarks ───────────────────────────────────────────────────────────────

fn bench_paste(c: &mut Criterion) {
    let mut group = c.benchmark_group("paste");
    group.measurement_time(Duration::from_secs(3));

    for &size in &[16, 32] {
        group.bench_function(&format!("schematic_to_schematic_{}", size), |b| {
            let mut source = make_tile(size);
            let selection = source.schematic().selection();
            b.iter(|| {
                let mut destination =
                    SchematicLevel::new("dst", Schematic::new("dst", (size * 2, size * 2, size * 2)));
                let summary = paste(
                    &mut source,
                    &Dimension::structure(),
                    &selection,
                    &mut destination,
                    &Dimension::structure(),
                    (size, size, size),
                    &PasteOptions::default(),
                )
                .unwrap();
                black_box(summary);
            });
        });
    }
    group.finish();
}

fn bench_chunk_set_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk");
    let stone = BlockState::new("minecraft:stone");

    group.bench_function("set_block_full_column", |b| {
        b.iter(|| {
            let mut chunk = ChunkData::new_empty(0, 0, 3700, -4);
            for y in -64..320 {
                for z in 0..16 {
                    for x in 0..16 {
                        chunk.set_block(x, y, z, &stone).unwrap();
                    }
                }
            }
            black_box(chunk.to_nbt());
        });
    });

    let indices: Vec<u16> = (0..4096).map(|i| (i % 40) as u16).collect();
    group.bench_function("pack_unpack_6bit", |b| {
        b.iter(|| {
            let packed = pack_block_states(black_box(&indices), 40);
            black_box(unpack_block_states(&packed, 40));
        });
    });
    group.finish();
}

criterion_group!(benches, bench_paste, bench_chunk_set_block);
criterion_main!(benches);
