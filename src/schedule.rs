// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Splitting a movie across worker processes, and working out what
//! each frame of the movie looks at.

use std::ops::Range;
use std::path::PathBuf;

use crate::config::Config;
use crate::planes::ComplexPlaneWindow;

/// How much each frame shrinks the window, relative to the first.
pub const ZOOM_STEP: f64 = 0.1;

/// A half-open run of frame indices owned by one worker process.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameRange {
    /// First frame index rendered.
    pub start: usize,
    /// One past the last frame index rendered.
    pub end: usize,
}

impl FrameRange {
    /// Number of frames in the range.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// A process may be handed no frames at all.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The frame indices, in the order they are rendered.
    pub fn indices(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Splits `total_frames` across `processes` contiguous ranges.  The
/// first `total_frames % processes` processes each take one extra
/// frame, so every later range starts that much further along.
#[derive(Copy, Clone, Debug)]
pub struct Schedule {
    total_frames: usize,
    processes: usize,
}

impl Schedule {
    /// `processes` must be at least one; `Config::validate` checks it.
    pub fn new(total_frames: usize, processes: usize) -> Schedule {
        assert!(processes > 0, "a schedule needs at least one process");
        Schedule {
            total_frames,
            processes,
        }
    }

    /// Number of processes the movie is split across.
    pub fn processes(&self) -> usize {
        self.processes
    }

    /// The frame range for process `process`.
    pub fn range_for(&self, process: usize) -> FrameRange {
        let per_process = self.total_frames / self.processes;
        let remainder = self.total_frames % self.processes;
        let start = process * per_process + process.min(remainder);
        let extra = if process < remainder { 1 } else { 0 };
        FrameRange {
            start,
            end: start + per_process + extra,
        }
    }

    /// Every range, in process order.
    pub fn ranges(&self) -> Vec<FrameRange> {
        (0..self.processes).map(|p| self.range_for(p)).collect()
    }
}

/// The scale of frame `number`.  Frame numbers start at one.
pub fn zoom_scale(base_scale: f64, number: usize) -> f64 {
    base_scale / (1.0 + (number as f64) * ZOOM_STEP)
}

/// Everything the frame renderer needs to produce and write one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameSpec {
    /// Zero-based position in the movie.
    pub index: usize,
    /// Where on the plane the frame looks.
    pub window: ComplexPlaneWindow,
    /// Iteration cap for every pixel.
    pub max_iterations: u32,
    /// Pixels across.
    pub width: usize,
    /// Pixels down.
    pub height: usize,
    /// File the encoded frame goes to.
    pub output: PathBuf,
}

impl FrameSpec {
    /// Derive the frame at `index` from the movie's configuration.
    /// File names and zoom use the one-based frame number.
    pub fn new(index: usize, config: &Config) -> FrameSpec {
        let number = index + 1;
        let scale = zoom_scale(config.scale, number);
        FrameSpec {
            index,
            window: ComplexPlaneWindow::centered(config.center, scale),
            max_iterations: config.max_iterations,
            width: config.width,
            height: config.height,
            output: PathBuf::from(format!(
                "{}_{}.{}",
                config.prefix,
                number,
                config.format.extension()
            )),
        }
    }

    /// Pixel grid size as (width, height).
    pub fn bounds(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}
