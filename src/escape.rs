// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The per-pixel arithmetic: how long a point takes to leave the
//! circle of radius two, and how that count becomes a color.

use num::Complex;

/// The largest color value a pixel can carry: 24 bits, 0xRRGGBB.
pub const MAX_COLOR: u32 = 0x00FF_FFFF;

/// Iterate `z' = z * z + c` starting from `z = c`, counting the
/// iterations until the orbit leaves the circle of radius two or the
/// count reaches `max`.  A point that starts outside the circle
/// returns zero; a point that never escapes returns `max`.
pub fn iterations_at_point(x: f64, y: f64, max: u32) -> u32 {
    let c = Complex::new(x, y);
    let mut z = c;
    let mut iter = 0;
    while z.norm_sqr() <= 4.0 && iter < max {
        z = z * z + c;
        iter += 1;
    }
    iter
}

/// Scale an iteration count linearly onto the 24-bit color range.
/// `iteration_to_color(max, max)` saturates to `MAX_COLOR`; points
/// that escape immediately are black.
#[inline]
pub fn iteration_to_color(iters: u32, max: u32) -> u32 {
    (f64::from(MAX_COLOR) * f64::from(iters) / f64::from(max)) as u32
}

/// Split a 24-bit color into its red, green and blue bytes.
#[inline]
pub fn color_to_rgb(color: u32) -> [u8; 3] {
    [
        ((color >> 16) & 0xFF) as u8,
        ((color >> 8) & 0xFF) as u8,
        (color & 0xFF) as u8,
    ]
}
