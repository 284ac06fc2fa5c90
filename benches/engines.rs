// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[macro_use]
extern crate criterion;
extern crate num;
extern crate planeshader;

use criterion::{black_box, Criterion};
use num::Complex;

use planeshader::engine::littlewood::{Layout, RootTracker};
use planeshader::engine::{EscapeTime, NewtonEngine, Progressive};
use planeshader::{ComplexPlane, Dispatcher, Engine, Kernel, Node};

fn plane() -> ComplexPlane {
    ComplexPlane::new(160, 120, Complex::new(-0.5, 0.0), 3.0).unwrap()
}

fn compile(c: &mut Criterion) {
    c.bench_function("compile newton kernel", |b| {
        b.iter(|| {
            Kernel::newton(
                black_box("sin(z)^3 - z*cosh(z) + 1"),
                "3sin(z)^2 cos(z) - cosh(z) - z sinh(z)",
            )
        })
    });
    c.bench_function("parse", |b| {
        b.iter(|| Node::parse(black_box("(z^2 + 1)/(z - i) * exp(pi z)")))
    });
}

fn escape(c: &mut Criterion) {
    let engine = EscapeTime::mandelbrot(plane())
        .unwrap()
        .with_dispatcher(Dispatcher::default());
    c.bench_function("fixed escape time 160x120", move |b| b.iter(|| engine.counts()));
}

fn progressive(c: &mut Criterion) {
    let mut engine = Progressive::mandelbrot(plane()).with_dispatcher(Dispatcher::default());
    c.bench_function("progressive advance 160x120", move |b| {
        b.iter(|| {
            engine.change_view();
            engine.advance();
        })
    });
}

fn newton(c: &mut Criterion) {
    let kernel = Kernel::newton("z^3 - 1", "3z^2").unwrap();
    let engine = NewtonEngine::new(plane(), &kernel)
        .unwrap()
        .with_dispatcher(Dispatcher::default());
    c.bench_function("newton basins 160x120", move |b| b.iter(|| engine.basins()));
}

fn littlewood(c: &mut Criterion) {
    let layout = Layout {
        max_degree: 10,
        width: 256,
    };
    let mut tracker =
        RootTracker::with_layout(plane(), 1, layout).with_dispatcher(Dispatcher::default());
    c.bench_function("littlewood pass, degree 10", move |b| b.iter(|| tracker.advance()));
}

criterion_group!(benches, compile, escape, progressive, newton, littlewood);
criterion_main!(benches);
