use codspeed_criterion_compat::{Criterion, Throughput, black_box, criterion_group, criterion_main};

static POLICY: &str = "
POLICY network 1 {
    ALLOW { socket(domain, kind) { domain == 2 || domain == 10, kind & 0x80000 == 0 }, connect, sendto }
    ERRNO(1) { bind, listen, accept4 }
}
";

static IDENTIFIERS: &str = "read write openat close fstat mmap mprotect munmap brk rt_sigaction \
     rt_sigprocmask ioctl pread64 pwrite64 readv writev access pipe select sched_yield mremap \
     msync mincore madvise shmget shmat shmctl dup dup2 pause nanosleep getitimer alarm setitimer";

fn iterate(s: &str) {
    use arbor_lexer::Lexer;

    let language = arbor_fekal::language();
    let mut lexer = Lexer::new(language, s);
    loop {
        let token = lexer.next_token();
        if token.is_end() {
            break;
        }
        black_box(token);
    }
}

fn bench_iterate(c: &mut Criterion) {
    let policies = POLICY.repeat(32);
    let candidates = [("identifiers", IDENTIFIERS), ("policies", policies.as_str())];

    let mut group = c.benchmark_group("iterate");
    for (name, source) in candidates {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(name, &source, |b, &s| b.iter(|| iterate(s)));
    }
    group.finish();
}

criterion_group!(benches, bench_iterate);
criterion_main!(benches);
