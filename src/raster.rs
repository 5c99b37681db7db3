// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The pixel buffer a frame is drawn into, and the encoders that turn
//! a finished buffer into a file.

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ColorType, ImageEncoder};

use crate::errors::Result;
use crate::escape::color_to_rgb;

/// Quality handed to the JPEG encoder.
pub const JPEG_QUALITY: u8 = 90;

/// A width by height grid of 24-bit colors, stored row by row.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    /// Allocate a black buffer.
    pub fn new(width: usize, height: usize) -> PixelBuffer {
        PixelBuffer {
            width,
            height,
            pixels: vec![0u32; width * height],
        }
    }

    /// Pixels across.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Pixels down.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Paint every pixel `color`.
    pub fn fill(&mut self, color: u32) {
        for p in self.pixels.iter_mut() {
            *p = color;
        }
    }

    /// Set the pixel at column `x`, row `y`.
    pub fn set(&mut self, x: usize, y: usize, color: u32) {
        self.pixels[y * self.width + x] = color;
    }

    /// The pixel at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    /// The whole grid, row-major.
    pub fn as_slice(&self) -> &[u32] {
        &self.pixels
    }

    /// The whole grid, row-major and writable.  Row `r` starts at
    /// `r * width`.
    pub fn as_mut_slice(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Flatten to packed 8-bit RGB triples for the encoders.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        for color in &self.pixels {
            out.extend_from_slice(&color_to_rgb(*color));
        }
        out
    }
}

/// Anything that can serialize a finished buffer to a file.
pub trait ImageWriter {
    /// Encode `pixels` and write them to `path`.
    fn write(&self, pixels: &PixelBuffer, path: &Path) -> Result<()>;
}

impl<T: ImageWriter + ?Sized> ImageWriter for Box<T> {
    fn write(&self, pixels: &PixelBuffer, path: &Path) -> Result<()> {
        (**self).write(pixels, path)
    }
}

/// Baseline JPEG at a fixed quality.
#[derive(Debug, Default)]
pub struct JpegWriter;

impl ImageWriter for JpegWriter {
    fn write(&self, pixels: &PixelBuffer, path: &Path) -> Result<()> {
        let output = BufWriter::new(File::create(path)?);
        let encoder = JpegEncoder::new_with_quality(output, JPEG_QUALITY);
        encoder.write_image(
            &pixels.to_rgb8(),
            pixels.width() as u32,
            pixels.height() as u32,
            ColorType::Rgb8,
        )?;
        Ok(())
    }
}

/// Binary PPM.  Lossless, so frames can be compared byte for byte.
#[derive(Debug, Default)]
pub struct PnmWriter;

impl ImageWriter for PnmWriter {
    fn write(&self, pixels: &PixelBuffer, path: &Path) -> Result<()> {
        let output = BufWriter::new(File::create(path)?);
        let encoder =
            PnmEncoder::new(output).with_subtype(PnmSubtype::Pixmap(SampleEncoding::Binary));
        encoder.write_image(
            &pixels.to_rgb8(),
            pixels.width() as u32,
            pixels.height() as u32,
            ColorType::Rgb8,
        )?;
        Ok(())
    }
}

/// Which encoder frames go through.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// `.jpg` files.
    Jpeg,
    /// `.ppm` files.
    Pnm,
}

impl OutputFormat {
    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Pnm => "ppm",
        }
    }

    /// The encoder for this format.
    pub fn writer(self) -> Box<dyn ImageWriter + Send + Sync> {
        match self {
            OutputFormat::Jpeg => Box::new(JpegWriter),
            OutputFormat::Pnm => Box::new(PnmWriter),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "pnm" | "ppm" => Ok(OutputFormat::Pnm),
            _ => Err(format!("Unknown output format '{}'", s)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OutputFormat::Jpeg => write!(f, "jpeg"),
            OutputFormat::Pnm => write!(f, "pnm"),
        }
    }
}
