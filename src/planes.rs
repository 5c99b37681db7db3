// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the ComplexPlaneWindow struct, which describes a
//! relationship between a rectangle on the integral plane with an
//! origin at 0,0 and a rectangle on the complex plane with an
//! arbitrary pair of corners.
use num::Complex;

/// Describes the x, y of a pixel in the integral plane.  Column
/// first, row second.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// The rectangle of the complex plane that one frame covers.  Built
/// once per frame from a center point and a scale; never mutated.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ComplexPlaneWindow {
    /// Left edge.
    pub xmin: f64,
    /// Right edge.
    pub xmax: f64,
    /// Low edge.
    pub ymin: f64,
    /// High edge.
    pub ymax: f64,
}

impl ComplexPlaneWindow {
    /// A square window of side `scale` around `center`.
    pub fn centered(center: Complex<f64>, scale: f64) -> ComplexPlaneWindow {
        let half = scale / 2.0;
        ComplexPlaneWindow {
            xmin: center.re - half,
            xmax: center.re + half,
            ymin: center.im - half,
            ymax: center.im + half,
        }
    }

    /// Width of the window on the real axis.
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Height of the window on the imaginary axis.
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Given a pixel on a `bounds.0` by `bounds.1` integral plane,
    /// return the point it maps to.  Row zero is `ymin`.
    pub fn pixel_to_point(&self, bounds: (usize, usize), pixel: &Pixel) -> Complex<f64> {
        Complex::new(
            self.xmin + (pixel.0 as f64) * self.width() / (bounds.0 as f64),
            self.ymin + (pixel.1 as f64) * self.height() / (bounds.1 as f64),
        )
    }
}
