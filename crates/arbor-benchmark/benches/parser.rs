use std::hint::black_box;

use arbor_parse::Parser;
use codspeed_criterion_compat::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

fn benchmark_parser(c: &mut Criterion) {
    let sources = [
        (
            "Simple",
            r#"
            POLICY base 1 {
                ALLOW { read, write, close }
            }
            "#
            .to_owned(),
        ),
        (
            "Medium",
            r#"
            // Filesystem access.
            POLICY files 2 {
                USE base 1
                ALLOW { openat(dirfd, path, flags) { flags & 3 == 0 }, fstat, lseek }
                ERRNO(13) { unlink, rename }
            }

            POLICY process {
                ALLOW { personality(persona) { persona == 0 || persona == 0x0020000 } }
                KILL_PROCESS { ptrace }
            }

            USE files 2
            DEFAULT KILL_THREAD
            "#
            .to_owned(),
        ),
        (
            "Broken",
            r#"
            POLICY broken {
                ALLOW { read(fd) { fd == }, write
                TRAP(3) { kill
            }
            "#
            .to_owned(),
        ),
    ];

    let mut group = c.benchmark_group("Parser Benchmark");
    for (name, text) in &sources {
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse_code", name), text, |b, text| {
            let mut parser = Parser::new(arbor_fekal::language().clone());
            b.iter(|| black_box(parser.parse(text.as_str())));
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_parser);
criterion_main!(benches);
