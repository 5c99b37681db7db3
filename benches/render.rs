// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[macro_use]
extern crate criterion;
extern crate mandelmovie;
extern crate num;

use criterion::{black_box, Criterion};
use mandelmovie::escape::iterations_at_point;
use mandelmovie::planes::ComplexPlaneWindow;
use mandelmovie::raster::PnmWriter;
use mandelmovie::{FrameRenderer, FrameSpec};
use num::Complex;
use std::path::PathBuf;

fn kernel(c: &mut Criterion) {
    c.bench_function("iterations inside the set", |b| {
        b.iter(|| iterations_at_point(black_box(-0.5), black_box(-0.5), 1000))
    });
    c.bench_function("iterations near the boundary", |b| {
        b.iter(|| iterations_at_point(black_box(-0.7453), black_box(0.1127), 1000))
    });
}

fn frame(c: &mut Criterion) {
    let spec = FrameSpec {
        index: 0,
        window: ComplexPlaneWindow::centered(Complex::new(-0.5, 0.0), 3.0),
        max_iterations: 200,
        width: 120,
        height: 120,
        output: PathBuf::from("unused.ppm"),
    };
    for threads in &[1, 4] {
        let renderer = FrameRenderer::new(*threads, PnmWriter);
        c.bench_function(&format!("120x120 frame, {} threads", threads), |b| {
            b.iter(|| renderer.compute(&spec).unwrap())
        });
    }
}

criterion_group!(benches, kernel, frame);
criterion_main!(benches);
