use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use kbin::{Document, TypeCode};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

/// A score list response: a few thousand records, each a mix of small integers, strings and
/// arrays, which exercises every data segment bucket.
fn score_list(records: usize) -> Document {
    let mut rng = StdRng::seed_from_u64(0x42);
    let mut doc = Document::new();
    let root = doc.create_root("response");
    let game = doc.add_child(root, "game");
    doc.node_mut(game).set_attr("status", "0");
    for i in 0..records {
        let info = doc.add_child(game, "info");
        doc.add_leaf(info, "music_id", TypeCode::U32, rng.gen_range(0..2000u32).to_string());
        doc.add_leaf(info, "music_type", TypeCode::U8, rng.gen_range(0..5u8).to_string());
        doc.add_leaf(info, "score", TypeCode::U32, rng.gen_range(0..10_000_000u32).to_string());
        doc.add_leaf(info, "clear_type", TypeCode::U8, rng.gen_range(0..6u8).to_string());
        doc.add_leaf(info, "btn_rate", TypeCode::U16, rng.gen::<u16>().to_string());
        doc.add_leaf(info, "name", TypeCode::Str, format!("PLAYER{:04}", i));
        let hist: Vec<String> = (0..8).map(|_| rng.gen::<i16>().to_string()).collect();
        doc.add_leaf(info, "history", TypeCode::S16, hist.join(" "));
        doc.add_leaf(info, "rate", TypeCode::Float, format!("{}.{:06}", rng.gen_range(0..100), rng.gen_range(0..1_000_000)));
        doc.add_leaf(info, "flags", TypeCode::Boolx4, "1 0 0 1");
    }
    doc
}

fn codec(c: &mut Criterion) {
    let doc = score_list(2000);
    let bytes = kbin::encode(&doc).unwrap();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("decode", |b| {
        b.iter(|| kbin::decode(black_box(&bytes)).unwrap())
    });
    group.bench_function("encode", |b| {
        b.iter(|| kbin::encode(black_box(&doc)).unwrap())
    });
    group.bench_function("to_xml", |b| {
        b.iter(|| black_box(&doc).to_xml().unwrap())
    });
    let xml = doc.to_xml().unwrap();
    group.bench_function("from_xml_encode", |b| {
        b.iter_batched(
            || xml.clone(),
            |xml| kbin::encode(&Document::from_xml(&xml).unwrap()).unwrap(),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, codec);
criterion_main!(benches);
