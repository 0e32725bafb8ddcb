//! Encode/decode throughput for a representative telemetry message, with
//! and without body encryption.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use acomms_codec::{
    Codec, FieldDescriptor, FieldValue, MessageDescriptor, TriggerRule, ValueMap,
};

fn nav_message() -> MessageDescriptor {
    MessageDescriptor::new(
        "NAV",
        7,
        TriggerRule::OnTime { interval_secs: 10 },
        vec![
            FieldDescriptor::float("lat", -90.0, 90.0, 5),
            FieldDescriptor::float("lon", -180.0, 180.0, 5),
            FieldDescriptor::float("heading", 0.0, 360.0, 1),
            FieldDescriptor::int("depth", 0, 6000),
            FieldDescriptor::int("battery", 0, 100),
            FieldDescriptor::enumeration("mode", &["idle", "transit", "survey", "surface"]),
            FieldDescriptor::int("ranges", 0, 10000).with_array_length(4),
        ],
    )
}

fn nav_values() -> ValueMap {
    let mut vals = ValueMap::new();
    vals.insert("lat".into(), vec![FieldValue::Float(42.35001)]);
    vals.insert("lon".into(), vec![FieldValue::Float(-70.94999)]);
    vals.insert("heading".into(), vec![FieldValue::Float(197.5)]);
    vals.insert("depth".into(), vec![FieldValue::Int(1250)]);
    vals.insert("battery".into(), vec![FieldValue::Int(87)]);
    vals.insert("mode".into(), vec![FieldValue::String("survey".into())]);
    vals.insert(
        "ranges".into(),
        vec![
            FieldValue::Int(120),
            FieldValue::Int(124),
            FieldValue::Int(131),
            FieldValue::Int(140),
        ],
    );
    vals
}

fn codec(passphrase: &str) -> Codec {
    let mut codec = Codec::new();
    codec.set_node_id(3);
    codec.set_passphrase(passphrase);
    codec.load(vec![nav_message()]).unwrap();
    codec
}

fn bench_encode(c: &mut Criterion) {
    let plain = codec("");
    let encrypted = codec("shared secret");
    let vals = nav_values();

    c.bench_function("encode_nav", |b| {
        b.iter(|| plain.encode("NAV", black_box(&vals)).unwrap())
    });
    c.bench_function("encode_nav_encrypted", |b| {
        b.iter(|| encrypted.encode("NAV", black_box(&vals)).unwrap())
    });
}

fn bench_decode(c: &mut Criterion) {
    let plain = codec("");
    let encrypted = codec("shared secret");
    let plain_wire = plain.encode("NAV", &nav_values()).unwrap();
    let encrypted_wire = encrypted.encode("NAV", &nav_values()).unwrap();

    c.bench_function("decode_nav", |b| {
        b.iter(|| plain.decode(black_box(&plain_wire)).unwrap())
    });
    c.bench_function("decode_nav_encrypted", |b| {
        b.iter(|| encrypted.decode(black_box(&encrypted_wire)).unwrap())
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
