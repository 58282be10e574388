use std::hint::black_box;
use bencher::{TestCase, TestFile};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use micro_http_client::codec::ResponseDecoder;
use micro_http_client::protocol::Message;
use tokio_util::bytes::BytesMut;
use tokio_util::codec::Decoder;

static SMALL_RESPONSE: TestFile = TestFile::new("ok_small.txt", include_str!("../resources/response/ok_small.txt"));
static LARGE_HEADER: TestFile = TestFile::new("ok_large_header.txt", include_str!("../resources/response/ok_large_header.txt"));
static CHUNKED: TestFile = TestFile::new("chunked.txt", include_str!("../resources/response/chunked.txt"));

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::new("small_response", SMALL_RESPONSE),
        TestCase::new("large_header_response", LARGE_HEADER),
        TestCase::new("chunked_response", CHUNKED),
    ]
}

fn benchmark_response_decoder(criterion: &mut Criterion) {
    let test_cases = create_test_cases();
    let mut group = criterion.benchmark_group("response_decoder");

    for case in test_cases {
        group.throughput(Throughput::Bytes(case.len()));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            b.iter_batched_ref(
                || (ResponseDecoder::new(), BytesMut::from(case.file().content())),
                |(decoder, bytes_mut)| {
                    let head = decoder.decode(bytes_mut).expect("input should be a valid http response head").unwrap();
                    black_box(head);
                    while let Some(message) = decoder.decode(bytes_mut).expect("input should be a valid http response body") {
                        let done = matches!(&message, Message::Payload(item) if item.is_eof());
                        black_box(message);
                        if done {
                            break;
                        }
                    }
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(decoder, benchmark_response_decoder);
criterion_main!(decoder);
