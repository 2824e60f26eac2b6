//! Benchmarks for POP3 command parsing and reply rendering.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use slpop_proto::{encode_plain, PlainCredentials, Reply, Request, RespCode};

/// Bare verb, the hot path during a transaction.
const BARE_COMMAND: &str = "STAT";

/// Verb with a message index argument.
const INDEXED_COMMAND: &str = "RETR 42";

/// AUTH line with an inline PLAIN payload.
const AUTH_COMMAND: &str = "AUTH PLAIN AGpkb2UAc3VwZXJzZWNyZXQ=";

fn benchmark_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Request Parsing");

    group.bench_function("bare_verb", |b| {
        b.iter(|| {
            let req = Request::parse(black_box(BARE_COMMAND)).unwrap();
            black_box(req.verb())
        })
    });

    group.bench_function("with_index", |b| {
        b.iter(|| {
            let req = Request::parse(black_box(INDEXED_COMMAND)).unwrap();
            black_box((req.verb(), req.args()))
        })
    });

    group.bench_function("auth_line", |b| {
        b.iter(|| {
            let req = Request::parse(black_box(AUTH_COMMAND)).unwrap();
            black_box(req.args())
        })
    });

    group.finish();
}

fn benchmark_plain_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("PLAIN Decoding");
    let payload = encode_plain("jdoe", "supersecret");

    group.bench_function("decode", |b| {
        b.iter(|| PlainCredentials::parse(black_box(&payload)).unwrap())
    });

    group.finish();
}

fn benchmark_rendering(c: &mut Criterion) {
    let mut group = c.benchmark_group("Reply Rendering");

    group.bench_function("status", |b| {
        b.iter(|| black_box(Reply::ok("You are now logged in")).to_string())
    });

    group.bench_function("coded", |b| {
        b.iter(|| {
            black_box(Reply::coded(RespCode::InUse, "You already have a POP session running"))
                .to_string()
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_parsing,
    benchmark_plain_decoding,
    benchmark_rendering
);
criterion_main!(benches);
