//! Benchmark for schema-driven payload decoding.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use omron_2jcie_bu01::schema::{LATEST_DATA_LONG, LATEST_SENSING_DATA};
use omron_2jcie_bu01::{decode, schema_for_address};

/// Latest sensing data payload: seq plus seven sensing fields.
fn sensing_payload() -> Vec<u8> {
    vec![
        0x2A, // seq
        0xE9, 0x0A, // temperature 27.93 degC
        0x2D, 0x15, // humidity 54.21 %RH
        0xE8, 0x03, // light 1000 lx
        0x02, 0x76, 0x0F, 0x00, // pressure 1013.250 hPa
        0xAF, 0x0F, // noise 40.15 dB
        0x14, 0x00, // eTVOC 20 ppb
        0xF4, 0x01, // eCO2 500 ppm
    ]
}

/// Latest data long payload: sensing + calculation + validity flags.
fn long_payload() -> Vec<u8> {
    let mut payload = sensing_payload();
    payload.extend_from_slice(&[
        0x52, 0x1C, // thi
        0xCE, 0x09, // wbgt
        0x00, // vibration
        0x7B, 0x00, // si
        0xC8, 0x01, // pga
        0xD2, 0x04, // seismic_intensity
    ]);
    payload.extend_from_slice(&[0u8; 14]); // sensing flags
    payload.extend_from_slice(&[0u8; 7]); // calculation flags
    payload
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for (name, address, payload) in [
        ("latest_sensing_data", LATEST_SENSING_DATA, sensing_payload()),
        ("latest_data_long", LATEST_DATA_LONG, long_payload()),
    ] {
        let schema = schema_for_address(address).unwrap();
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &payload,
            |b, payload| {
                b.iter(|| decode(schema, black_box(payload)).unwrap());
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
