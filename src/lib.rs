#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mandelbrot movie renderer
//!
//! A movie is a sequence of frames, each a picture of the Mandelbrot
//! set centered on the same point and each a little more zoomed in than
//! the last.  Every pixel is colored by how many iterations its point
//! takes to escape the circle of radius two.
//!
//! Work is split twice.  The frames are divided into contiguous ranges,
//! one per worker process, and an ordering barrier decides when each
//! process may render.  Within a process, each frame's rows are cut
//! into bands, one per thread, and the threads fill their bands of a
//! shared pixel buffer without locking, because the bands never
//! overlap.  Finished buffers are encoded to one file per frame.

extern crate crossbeam;
extern crate failure;
extern crate image;
extern crate itertools;
extern crate log;
extern crate num;
extern crate num_cpus;

pub mod barrier;
pub mod config;
pub mod errors;
pub mod escape;
pub mod movie;
pub mod planes;
pub mod raster;
pub mod render;
pub mod schedule;

pub use crate::config::Config;
pub use crate::errors::MovieError;
pub use crate::render::FrameRenderer;
pub use crate::schedule::{FrameSpec, Schedule};
