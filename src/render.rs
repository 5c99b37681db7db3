// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Rendering one frame: the rows of the pixel buffer are cut into
//! contiguous bands, one per thread, and every thread fills its own
//! band.  Bands never overlap, so the threads share nothing but a
//! read-only `FrameSpec`.

use itertools::iproduct;
use log::debug;

use crate::errors::{MovieError, Result};
use crate::escape::{iteration_to_color, iterations_at_point};
use crate::planes::Pixel;
use crate::raster::{ImageWriter, PixelBuffer};
use crate::schedule::FrameSpec;

/// A half-open run of rows owned by one tile thread.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RowRange {
    /// First row computed.
    pub start: usize,
    /// One past the last row computed.
    pub end: usize,
}

impl RowRange {
    /// Number of rows in the band.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the band has no rows.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Cut `height` rows into `threads` bands of `height / threads` rows;
/// the last band also takes whatever the division left over.
pub fn partition_rows(height: usize, threads: usize) -> Vec<RowRange> {
    assert!(threads > 0, "cannot partition rows across zero threads");
    let per_thread = height / threads;
    (0..threads)
        .map(|t| {
            let start = t * per_thread;
            let end = if t + 1 == threads {
                height
            } else {
                start + per_thread
            };
            RowRange { start, end }
        })
        .collect()
}

/// Hand out disjoint mutable bands of a row-major buffer, one per
/// range.  The ranges must be contiguous and start at row zero.
fn split_bands<'a>(
    mut pixels: &'a mut [u32],
    width: usize,
    ranges: &[RowRange],
) -> Vec<(RowRange, &'a mut [u32])> {
    let mut bands = Vec::with_capacity(ranges.len());
    for range in ranges {
        let (band, rest) = std::mem::take(&mut pixels).split_at_mut(range.len() * width);
        bands.push((*range, band));
        pixels = rest;
    }
    bands
}

/// Fill `band`, which holds exactly the rows in `rows`, with the colors
/// of the corresponding points of `spec`'s window.
pub fn compute_tile(spec: &FrameSpec, rows: RowRange, band: &mut [u32]) {
    assert!(band.len() == rows.len() * spec.width);
    let bounds = spec.bounds();
    for (row, column) in iproduct!(rows.start..rows.end, 0..spec.width) {
        let point = spec.window.pixel_to_point(bounds, &Pixel(column, row));
        let iters = iterations_at_point(point.re, point.im, spec.max_iterations);
        band[(row - rows.start) * spec.width + column] =
            iteration_to_color(iters, spec.max_iterations);
    }
}

/// Renders frames with a fixed number of tile threads and hands each
/// finished buffer to an encoder.
pub struct FrameRenderer<W: ImageWriter> {
    threads: usize,
    writer: W,
}

impl<W: ImageWriter> FrameRenderer<W> {
    /// `threads` must be at least one.
    pub fn new(threads: usize, writer: W) -> Self {
        assert!(threads > 0, "a frame renderer needs at least one thread");
        FrameRenderer { threads, writer }
    }

    /// Compute the pixels of one frame.  Returns once every tile thread
    /// has finished.
    pub fn compute(&self, spec: &FrameSpec) -> Result<PixelBuffer> {
        let mut buffer = PixelBuffer::new(spec.width, spec.height);
        buffer.fill(0);
        let ranges = partition_rows(spec.height, self.threads);
        let bands = split_bands(buffer.as_mut_slice(), spec.width, &ranges);

        crossbeam::scope(|spawner| -> Result<()> {
            for (rows, band) in bands {
                spawner
                    .builder()
                    .name(format!("tile-{}-{}", rows.start, rows.end))
                    .spawn(move |_| compute_tile(spec, rows, band))
                    .map_err(|e| {
                        MovieError::ResourceExhaustion(format!(
                            "could not start tile thread for rows {}..{}: {}",
                            rows.start, rows.end, e
                        ))
                    })?;
            }
            Ok(())
        })
        .map_err(|_| MovieError::ResourceExhaustion("a tile thread panicked".to_string()))??;

        Ok(buffer)
    }

    /// Compute one frame, encode it to its output file, and let the
    /// buffer go.
    pub fn render(&self, spec: &FrameSpec) -> Result<()> {
        let buffer = self.compute(spec)?;
        self.writer.write(&buffer, &spec.output)?;
        debug!("wrote frame {} to {}", spec.index, spec.output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::MAX_COLOR;
    use crate::planes::ComplexPlaneWindow;
    use num::Complex;
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    fn spec(center: Complex<f64>, scale: f64, size: usize, max: u32) -> FrameSpec {
        FrameSpec {
            index: 0,
            window: ComplexPlaneWindow::centered(center, scale),
            max_iterations: max,
            width: size,
            height: size,
            output: PathBuf::from("unused.jpg"),
        }
    }

    struct Recorder(RefCell<Vec<(PathBuf, PixelBuffer)>>);

    impl ImageWriter for Recorder {
        fn write(&self, pixels: &PixelBuffer, path: &Path) -> Result<()> {
            self.0.borrow_mut().push((path.to_path_buf(), pixels.clone()));
            Ok(())
        }
    }

    #[test]
    fn four_threads_split_a_hundred_rows_evenly() {
        assert_eq!(
            partition_rows(100, 4),
            vec![
                RowRange { start: 0, end: 25 },
                RowRange { start: 25, end: 50 },
                RowRange { start: 50, end: 75 },
                RowRange { start: 75, end: 100 },
            ]
        );
    }

    #[test]
    fn last_thread_absorbs_the_remainder() {
        assert_eq!(
            partition_rows(100, 3),
            vec![
                RowRange { start: 0, end: 33 },
                RowRange { start: 33, end: 66 },
                RowRange { start: 66, end: 100 },
            ]
        );
    }

    #[test]
    fn bands_cover_every_row_exactly_once() {
        for height in 0..80 {
            for threads in 1..=20 {
                let ranges = partition_rows(height, threads);
                assert_eq!(ranges.len(), threads);
                let mut next = 0;
                for r in &ranges {
                    assert_eq!(r.start, next);
                    next = r.end;
                }
                assert_eq!(next, height);
            }
        }
    }

    #[test]
    fn threaded_render_matches_single_thread() {
        let s = spec(Complex::new(-0.75, 0.1), 2.5, 37, 200);
        let single = FrameRenderer::new(1, Recorder(RefCell::new(vec![])))
            .compute(&s)
            .unwrap();
        for threads in &[2, 3, 7, 20] {
            let multi = FrameRenderer::new(*threads, Recorder(RefCell::new(vec![])))
                .compute(&s)
                .unwrap();
            assert_eq!(single, multi);
        }
    }

    #[test]
    fn rendering_twice_is_bit_identical() {
        let s = spec(Complex::new(0.0, 0.0), 4.0, 50, 300);
        let renderer = FrameRenderer::new(4, Recorder(RefCell::new(vec![])));
        assert_eq!(renderer.compute(&s).unwrap(), renderer.compute(&s).unwrap());
    }

    #[test]
    fn canonical_view_has_black_corners_and_white_heart() {
        let s = spec(Complex::new(0.0, 0.0), 4.0, 100, 1000);
        let buffer = FrameRenderer::new(4, Recorder(RefCell::new(vec![])))
            .compute(&s)
            .unwrap();
        assert_eq!(buffer.get(0, 0), 0);
        assert_eq!(buffer.get(50, 50), MAX_COLOR);
        assert_eq!(buffer.get(25, 50), MAX_COLOR);
    }

    #[test]
    fn deep_view_is_busier_in_the_middle_than_at_the_edges() {
        let s = spec(Complex::new(-0.5, -0.5), 0.2, 20, 1000);
        let buffer = FrameRenderer::new(3, Recorder(RefCell::new(vec![])))
            .compute(&s)
            .unwrap();
        let average = |cells: Vec<u32>| {
            cells.iter().map(|c| f64::from(*c)).sum::<f64>() / (cells.len() as f64)
        };
        let middle = average(iproduct!(8..12, 8..12).map(|(x, y)| buffer.get(x, y)).collect());
        let edge = average(
            iproduct!(0..20, 0..20)
                .filter(|&(x, y)| x == 0 || y == 0 || x == 19 || y == 19)
                .map(|(x, y)| buffer.get(x, y))
                .collect(),
        );
        assert!(middle > edge);
    }

    #[test]
    fn render_hands_the_buffer_to_the_writer() {
        let mut s = spec(Complex::new(0.0, 0.0), 4.0, 10, 20);
        s.output = PathBuf::from("out_7.jpg");
        let renderer = FrameRenderer::new(2, Recorder(RefCell::new(vec![])));
        renderer.render(&s).unwrap();
        let written = renderer.writer.0.borrow();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, PathBuf::from("out_7.jpg"));
        assert_eq!(written[0].1, renderer.compute(&s).unwrap());
    }
}
