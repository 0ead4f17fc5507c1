use std::hint::black_box;

use arbor_parse::Parser;
use arbor_tree::InputEdit;
use codspeed_criterion_compat::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use text_size::{TextRange, TextSize};

static POLICY: &str = "
POLICY network {
    ALLOW { socket(domain, kind) { domain == 2 || domain == 10 }, connect, sendto }
    ERRNO(1) { bind, listen }
}
";

fn benchmark_reparse(c: &mut Criterion) {
    let text = POLICY.repeat(64);
    let mut parser = Parser::new(arbor_fekal::language().clone());
    let old = parser.parse(text.as_str());

    // Renames the last `connect` and replaces the last `listen` with a new filter.
    let connect = text.rfind("connect").unwrap_or_default();
    let listen = text.rfind("listen").unwrap_or_default();
    let edits = [
        ("rename", vec![(connect, connect + "connect".len(), "accept")]),
        ("rewrite", vec![(listen, listen + "listen".len(), "listen(fd, backlog) { backlog < 128 }")]),
    ];

    let mut group = c.benchmark_group("Reparse Benchmark");
    for (name, edits) in &edits {
        let mut new_text = text.clone();
        for &(start, end, insert) in edits.iter().rev() {
            new_text.replace_range(start..end, insert);
        }
        let input_edits: Vec<_> = edits
            .iter()
            .map(|&(start, end, insert)| {
                let range = TextRange::new(TextSize::new(start as u32), TextSize::new(end as u32));
                InputEdit::replace(text.as_bytes(), range, insert.as_bytes())
            })
            .collect();
        let Ok(edited) = old.edit(&input_edits) else { continue };

        group.throughput(Throughput::Bytes(new_text.len() as u64));
        group.bench_with_input(BenchmarkId::new("reparse", name), &new_text, |b, new_text| {
            b.iter(|| black_box(parser.reparse(&edited, new_text.as_str())));
        });
        group.bench_with_input(BenchmarkId::new("parse", name), &new_text, |b, new_text| {
            b.iter(|| black_box(parser.parse(new_text.as_str())));
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_reparse);
criterion_main!(benches);
