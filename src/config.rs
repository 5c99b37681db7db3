// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The immutable description of a movie run.  Built once at startup
//! and passed by reference to everything that needs it.

use std::str::FromStr;

use num::Complex;

use crate::errors::{MovieError, Result};
use crate::raster::OutputFormat;

/// Most tile threads one process may run.
pub const MAX_THREADS: usize = 20;

/// Longest output prefix accepted, in bytes.
pub const MAX_PREFIX_LEN: usize = 255;

/// Largest frame accepted, in pixels.
pub const MAX_PIXELS: usize = 1 << 28;

/// One tile thread per CPU, up to `MAX_THREADS`.
pub fn default_threads() -> usize {
    num_cpus::get().max(1).min(MAX_THREADS)
}

/// Everything a run is parameterized by.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Point the movie zooms toward.
    pub center: Complex<f64>,
    /// Width of the plane covered before zooming.
    pub scale: f64,
    /// Pixels across each frame.
    pub width: usize,
    /// Pixels down each frame.
    pub height: usize,
    /// Iteration cap per pixel.
    pub max_iterations: u32,
    /// Frames in the whole movie.
    pub frames: usize,
    /// Worker processes the movie is split across.
    pub processes: usize,
    /// Tile threads per frame.
    pub threads: usize,
    /// How many worker processes the barrier lets render at once.  One
    /// chains them strictly.
    pub concurrency: usize,
    /// Output files are `<prefix>_<frame number>.<extension>`.
    pub prefix: String,
    /// Encoder for the output files.
    pub format: OutputFormat,
    /// Log filter handed to every process.
    pub verbosity: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            center: Complex::new(0.0, 0.0),
            scale: 4.0,
            width: 1000,
            height: 1000,
            max_iterations: 1000,
            frames: 50,
            processes: 1,
            threads: default_threads(),
            concurrency: 1,
            prefix: "mandel_frame".to_string(),
            format: OutputFormat::Jpeg,
            verbosity: "warn".to_string(),
        }
    }
}

fn invalid<T>(msg: String) -> Result<T> {
    Err(MovieError::InvalidConfiguration(msg))
}

impl Config {
    /// Check every option against its permitted range.
    pub fn validate(&self) -> Result<()> {
        if !self.center.re.is_finite() || !self.center.im.is_finite() {
            return invalid(format!("center {} is not a finite point", self.center));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return invalid(format!("scale must be positive, not {}", self.scale));
        }
        if self.width == 0 || self.height == 0 {
            return invalid(format!(
                "image size must be positive, not {}x{}",
                self.width, self.height
            ));
        }
        match self.width.checked_mul(self.height) {
            Some(pixels) if pixels <= MAX_PIXELS => {}
            _ => {
                return invalid(format!(
                    "image size {}x{} exceeds {} pixels",
                    self.width, self.height, MAX_PIXELS
                ))
            }
        }
        if self.max_iterations == 0 {
            return invalid("iteration count must be positive".to_string());
        }
        if self.frames == 0 {
            return invalid("frame count must be positive".to_string());
        }
        if self.processes == 0 {
            return invalid("process count must be at least 1".to_string());
        }
        if self.threads == 0 || self.threads > MAX_THREADS {
            return invalid(format!(
                "thread count must be between 1 and {}, not {}",
                MAX_THREADS, self.threads
            ));
        }
        if self.concurrency == 0 {
            return invalid("barrier concurrency must be at least 1".to_string());
        }
        if self.prefix.is_empty() || self.prefix.len() > MAX_PREFIX_LEN {
            return invalid(format!(
                "output prefix must be between 1 and {} bytes long",
                MAX_PREFIX_LEN
            ));
        }
        Ok(())
    }

    /// The command line that reproduces this configuration, for handing
    /// it to a worker process.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            format!("--xcenter={}", self.center.re),
            format!("--ycenter={}", self.center.im),
            format!("--scale={}", self.scale),
            format!("--width={}", self.width),
            format!("--height={}", self.height),
            format!("--iterations={}", self.max_iterations),
            format!("--frames={}", self.frames),
            format!("--children={}", self.processes),
            format!("--threads={}", self.threads),
            format!("--concurrency={}", self.concurrency),
            format!("--output={}", self.prefix),
            format!("--format={}", self.format),
            format!("--verbosity={}", self.verbosity),
        ]
    }
}

/// Parse `s` and check it lies in `low..=high`.  Used as a clap
/// validator.
pub fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> std::result::Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

/// Parse `s` as a finite float.  Used as a clap validator.
pub fn validate_float(s: &str, err: &str) -> std::result::Result<(), String> {
    match f64::from_str(s) {
        Ok(f) if f.is_finite() => Ok(()),
        _ => Err(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn default_thread_count_is_in_range() {
        let threads = Config::default().threads;
        assert!(threads >= 1 && threads <= MAX_THREADS);
        assert_eq!(threads, default_threads());
    }

    #[test]
    fn oversized_frames_are_rejected() {
        let huge = Config {
            width: u32::max_value() as usize,
            height: u32::max_value() as usize,
            ..Config::default()
        };
        match huge.validate() {
            Err(MovieError::InvalidConfiguration(_)) => {}
            other => panic!("expected invalid configuration, got {:?}", other),
        }
        let overflowing = Config {
            width: usize::max_value(),
            height: 2,
            ..Config::default()
        };
        assert!(overflowing.validate().is_err());
        let largest = Config {
            width: 1 << 14,
            height: 1 << 14,
            ..Config::default()
        };
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn thread_count_is_bounded() {
        let mut c = Config::default();
        c.threads = 21;
        assert!(c.validate().is_err());
        c.threads = 0;
        assert!(c.validate().is_err());
        c.threads = 20;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn degenerate_values_are_rejected() {
        let bad = vec![
            Config {
                width: 0,
                ..Config::default()
            },
            Config {
                max_iterations: 0,
                ..Config::default()
            },
            Config {
                processes: 0,
                ..Config::default()
            },
            Config {
                scale: -1.0,
                ..Config::default()
            },
            Config {
                prefix: "x".repeat(MAX_PREFIX_LEN + 1),
                ..Config::default()
            },
            Config {
                concurrency: 0,
                ..Config::default()
            },
        ];
        for c in bad {
            match c.validate() {
                Err(MovieError::InvalidConfiguration(_)) => {}
                other => panic!("expected invalid configuration, got {:?}", other),
            }
        }
    }

    #[test]
    fn args_carry_every_field() {
        let c = Config {
            center: Complex::new(-0.5, 0.125),
            threads: 4,
            format: OutputFormat::Pnm,
            ..Config::default()
        };
        let args = c.to_args();
        assert!(args.contains(&"--xcenter=-0.5".to_string()));
        assert!(args.contains(&"--ycenter=0.125".to_string()));
        assert!(args.contains(&"--threads=4".to_string()));
        assert!(args.contains(&"--format=pnm".to_string()));
        assert!(args.contains(&"--output=mandel_frame".to_string()));
    }

    #[test]
    fn range_validator() {
        assert!(validate_range("5", 1, 20, "nan", "range").is_ok());
        assert_eq!(validate_range("25", 1, 20, "nan", "range"), Err("range".to_string()));
        assert_eq!(validate_range::<usize>("x", 1, 20, "nan", "range"), Err("nan".to_string()));
        assert!(validate_float("-0.25", "bad").is_ok());
        assert!(validate_float("inf", "bad").is_err());
    }
}
