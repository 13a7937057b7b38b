use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use field_pack::{
    compress_fields, decompress_fields, marker::encode_array_marker, Algorithm, Arena, FieldSchema,
    Registry,
};
use rand::prelude::*;

/// A record of `[id, name, body]` where the body is `len` bytes of loosely repetitive text.
fn record(len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(len as u64);
    let words = ["alpha ", "beta ", "gamma ", "delta ", "epsilon "];
    let mut body = Vec::with_capacity(len);
    while body.len() < len {
        body.extend_from_slice(words.choose(&mut rng).unwrap().as_bytes());
    }
    body.truncate(len);

    let mut rec = Vec::new();
    encode_array_marker(&mut rec, 3).unwrap();
    rec.extend_from_slice(&[0xce, 0x07, 0x5b, 0xcd, 0x15]);
    rec.extend_from_slice(&[0xa4, b'n', b'a', b'm', b'e']);
    rec.push(0xdb);
    rec.extend_from_slice(&(len as u32).to_be_bytes());
    rec.extend_from_slice(&body);
    rec
}

fn bench_compress(c: &mut Criterion) {
    let registry = Registry::default();
    for alg in [Algorithm::Zstd, Algorithm::Lz4] {
        let mut group = c.benchmark_group(format!("compress_fields/{}", alg));
        let schema = FieldSchema::new(vec![Algorithm::None, alg, alg]);
        for len in [256usize, 4096, 65536] {
            let rec = record(len);
            group.throughput(Throughput::Bytes(rec.len() as u64));
            group.bench_with_input(BenchmarkId::from_parameter(len), &rec, |b, rec| {
                let mut arena = Arena::new();
                b.iter(|| {
                    compress_fields(&registry, &schema, black_box(rec), &mut arena)
                        .unwrap()
                        .len()
                })
            });
        }
        group.finish();
    }
}

fn bench_decompress(c: &mut Criterion) {
    let registry = Registry::default();
    for alg in [Algorithm::Zstd, Algorithm::Lz4] {
        let mut group = c.benchmark_group(format!("decompress_fields/{}", alg));
        let schema = FieldSchema::new(vec![Algorithm::None, alg, alg]);
        for len in [256usize, 4096, 65536] {
            let rec = record(len);
            let mut arena = Arena::new();
            let packed = compress_fields(&registry, &schema, &rec, &mut arena)
                .unwrap()
                .into_owned();
            group.throughput(Throughput::Bytes(rec.len() as u64));
            group.bench_with_input(BenchmarkId::from_parameter(len), &packed, |b, packed| {
                b.iter(|| decompress_fields(&registry, black_box(packed), &mut arena).unwrap())
            });
        }
        group.finish();
    }
}

criterion_group!(benches, bench_compress, bench_decompress);
criterion_main!(benches);
