use clibrs::{Clib, ForeignString, Line, Point};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_marshal(c: &mut Criterion) {
    let clib = Clib::linked().unwrap();
    let line = Line::new(Point::new(1, 2), Point::new(3, 4));

    c.bench_function("echo_line_by_value", |b| {
        b.iter(|| clib.echo_line(black_box(line)))
    });

    c.bench_function("move_line_by_ref", |b| {
        let mut l = line;
        b.iter(|| clib.move_line_ref(black_box(&mut l)))
    });

    c.bench_function("format_line", |b| {
        b.iter(|| clib.format_line(black_box(line)).unwrap())
    });
}

fn bench_handshake(c: &mut Criterion) {
    let clib = Clib::linked().unwrap();

    c.bench_function("string_allocate_read_release", |b| {
        b.iter(|| {
            let s = ForeignString::allocate(&clib).unwrap();
            let copy = s.read();
            s.release();
            copy
        })
    });
}

criterion_group!(benches, bench_marshal, bench_handshake);
criterion_main!(benches);
