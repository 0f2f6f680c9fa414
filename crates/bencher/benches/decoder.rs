use std::hint::black_box;

use bencher::{Fixture, frame_fixtures, request_fixtures};
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use nio_http::codec::RequestDecoder;
use nio_http::websocket::FrameCodec;
use tokio_util::bytes::BytesMut;
use tokio_util::codec::Decoder;

fn remote_addr() -> std::net::SocketAddr {
    std::net::SocketAddr::from(([127, 0, 0, 1], 40000))
}

fn bench_fixtures<D, F>(criterion: &mut Criterion, group_name: &str, fixtures: Vec<Fixture>, new_decoder: F)
where
    D: Decoder,
    D::Error: std::fmt::Debug,
    F: Fn() -> D,
{
    let mut group = criterion.benchmark_group(group_name);

    for fixture in fixtures {
        group.throughput(Throughput::Bytes(fixture.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(fixture.name()), &fixture, |b, fixture| {
            let mut decoder = new_decoder();
            b.iter_batched_ref(
                || BytesMut::from(fixture.bytes()),
                |bytes_mut| {
                    let item = decoder.decode(bytes_mut).expect("fixture should be valid").expect("fixture should be complete");
                    black_box(item);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_request_decoder(criterion: &mut Criterion) {
    bench_fixtures(criterion, "request_decoder", request_fixtures(), || RequestDecoder::new(remote_addr()));
}

fn benchmark_frame_decoder(criterion: &mut Criterion) {
    bench_fixtures(criterion, "frame_decoder", frame_fixtures(), FrameCodec::server);
}

criterion_group!(decoder, benchmark_request_decoder, benchmark_frame_decoder);
criterion_main!(decoder);
