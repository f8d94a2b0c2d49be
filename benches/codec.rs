use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde::{Deserialize, Serialize};
use serde_ion::binary_writer::BinaryWriter;
use serde_ion::writer::copy_values;
use serde_ion::{from_slice, from_str, to_binary, to_string, Reader};

#[derive(Serialize, Deserialize, Clone)]
struct User {
    id: u32,
    name: String,
    email: String,
    active: bool,
}

#[derive(Serialize, Deserialize, Clone)]
struct Product {
    sku: String,
    name: String,
    price: f64,
    quantity: u32,
}

fn products(size: u32) -> Vec<Product> {
    (0..size)
        .map(|i| Product {
            sku: format!("SKU{}", i),
            name: format!("Product {}", i),
            price: 9.99 + f64::from(i),
            quantity: i,
        })
        .collect()
}

fn benchmark_simple(c: &mut Criterion) {
    let user = User {
        id: 123,
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        active: true,
    };
    let text = to_string(&user).unwrap();
    let bytes = to_binary(&user).unwrap();

    c.bench_function("serialize_simple_text", |b| {
        b.iter(|| to_string(black_box(&user)))
    });
    c.bench_function("serialize_simple_binary", |b| {
        b.iter(|| to_binary(black_box(&user)))
    });
    c.bench_function("deserialize_simple_text", |b| {
        b.iter(|| from_str::<User>(black_box(&text)))
    });
    c.bench_function("deserialize_simple_binary", |b| {
        b.iter(|| from_slice::<User>(black_box(&bytes)))
    });
}

fn benchmark_arrays(c: &mut Criterion) {
    let mut group = c.benchmark_group("deserialize_array");

    for size in [10, 100, 500].iter() {
        let items = products(*size);
        let text = to_string(&items).unwrap();
        let bytes = to_binary(&items).unwrap();

        group.bench_with_input(BenchmarkId::new("text", size), &text, |b, text| {
            b.iter(|| from_str::<Vec<Product>>(black_box(text)))
        });
        group.bench_with_input(BenchmarkId::new("binary", size), &bytes, |b, bytes| {
            b.iter(|| from_slice::<Vec<Product>>(black_box(bytes)))
        });
    }
    group.finish();
}

fn benchmark_skip(c: &mut Criterion) {
    let mut items = to_binary(&products(500)).unwrap();
    // A trailing value behind one large container.
    items.extend(to_binary(&1).unwrap());

    c.bench_function("binary_skip_container", |b| {
        b.iter(|| {
            let mut reader = Reader::new(black_box(&items));
            let mut count = 0;
            while reader.next().unwrap().is_some() {
                count += 1;
            }
            count
        })
    });
}

fn benchmark_transcode(c: &mut Criterion) {
    let text = to_string(&products(100)).unwrap();

    c.bench_function("transcode_text_to_binary", |b| {
        b.iter(|| {
            let mut reader = Reader::new(black_box(text.as_bytes()));
            let mut writer = BinaryWriter::new();
            copy_values(&mut reader, &mut writer).unwrap();
            writer.finish().unwrap()
        })
    });
}

criterion_group!(
    benches,
    benchmark_simple,
    benchmark_arrays,
    benchmark_skip,
    benchmark_transcode
);
criterion_main!(benches);
