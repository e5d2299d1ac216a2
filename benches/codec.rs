//! Benchmarks for the pixel stream codecs.

use std::num::NonZeroU8;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use pixelstream::{
    Frame, PixelStream,
    container::{PIXEL_COUNT, Pixel},
};

fn gradient_stream(frames: usize) -> PixelStream {
    let frames = (0..frames)
        .map(|f| {
            let mut pixels = [Pixel::default(); PIXEL_COUNT];
            for (i, p) in pixels.iter_mut().enumerate() {
                *p = Pixel::new(i as u8, f as u8, (i ^ f) as u8);
            }
            Frame::from_pixels(pixels)
        })
        .collect();
    PixelStream::new(NonZeroU8::new(16).unwrap(), frames)
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    // One minute of video at 16 fps is 960 frames
    for frames in [16, 960, 9600] {
        let stream = gradient_stream(frames);
        group.throughput(Throughput::Bytes(stream.encoded_len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(frames), &stream, |b, stream| {
            b.iter(|| black_box(stream).to_bytes());
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for frames in [16, 960, 9600] {
        let bytes = gradient_stream(frames).to_bytes();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(frames), &bytes, |b, bytes| {
            b.iter(|| PixelStream::from_bytes(black_box(bytes)).unwrap());
        });
    }

    group.finish();
}

fn bench_frame_lookup(c: &mut Criterion) {
    let stream = gradient_stream(960);
    let step = stream.interval() / 3;

    c.bench_function("frame_at", |b| {
        b.iter(|| {
            let mut elapsed = std::time::Duration::ZERO;
            while elapsed <= stream.duration() {
                black_box(stream.frame_at(elapsed));
                elapsed += step;
            }
        });
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_frame_lookup);
criterion_main!(benches);
