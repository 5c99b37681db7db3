// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate env_logger;
extern crate mandelmovie;
extern crate num;

use clap::{value_t, App, Arg, ArgMatches};
use num::Complex;

use mandelmovie::config::{
    default_threads, validate_float, validate_range, MAX_PREFIX_LEN, MAX_THREADS,
};
use mandelmovie::movie;
use mandelmovie::raster::OutputFormat;
use mandelmovie::Config;

const XCENTER: &str = "xcenter";
const YCENTER: &str = "ycenter";
const SCALE: &str = "scale";
const WIDTH: &str = "width";
const HEIGHT: &str = "height";
const ITERATIONS: &str = "iterations";
const OUTPUT: &str = "output";
const CHILDREN: &str = "children";
const THREADS: &str = "threads";
const FRAMES: &str = "frames";
const CONCURRENCY: &str = "concurrency";
const FORMAT: &str = "format";
const VERBOSITY: &str = "verbosity";

fn float_arg<'a>(name: &'a str, short: &'a str, default: &'a str, help: &'a str) -> Arg<'a, 'a> {
    Arg::with_name(name)
        .long(name)
        .short(short)
        .takes_value(true)
        .allow_hyphen_values(true)
        .default_value(default)
        .validator(|s| validate_float(&s, "Could not parse a finite number"))
        .help(help)
}

fn count_arg<'a>(
    name: &'a str,
    short: &'a str,
    default: &'a str,
    high: usize,
    help: &'a str,
) -> Arg<'a, 'a> {
    Arg::with_name(name)
        .long(name)
        .short(short)
        .takes_value(true)
        .default_value(default)
        .validator(move |s| {
            validate_range(
                &s,
                1,
                high,
                "Could not parse count",
                &format!("Value must be between 1 and {}", high),
            )
        })
        .help(help)
}

fn args<'a>(default_threads: &'a str) -> ArgMatches<'a> {
    App::new("mandelmovie")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Renders a zooming Mandelbrot movie, one image per frame")
        .after_help(
            "Some examples are:\n    \
             mandelmovie -x -0.5 -y -0.5 -s 0.2\n    \
             mandelmovie -x -.38 -y -.665 -s .05 -m 100\n    \
             mandelmovie -x 0.286932 -y 0.014287 -s .0005 -m 1000 -c 4 -t 8",
        )
        .arg(float_arg(XCENTER, "x", "0", "X coordinate of image center point"))
        .arg(float_arg(YCENTER, "y", "0", "Y coordinate of image center point"))
        .arg(
            float_arg(SCALE, "s", "4", "Scale of the first frame in Mandelbrot coordinates")
                .allow_hyphen_values(false),
        )
        .arg(count_arg(WIDTH, "W", "1000", u32::max_value() as usize, "Width of each image in pixels"))
        .arg(count_arg(HEIGHT, "H", "1000", u32::max_value() as usize, "Height of each image in pixels"))
        .arg(count_arg(
            ITERATIONS,
            "m",
            "1000",
            u32::max_value() as usize,
            "The maximum number of iterations per point",
        ))
        .arg(count_arg(FRAMES, "n", "50", usize::max_value(), "Number of frames in the movie"))
        .arg(count_arg(
            CHILDREN,
            "c",
            "1",
            usize::max_value(),
            "Number of worker processes the frames are split across",
        ))
        .arg(count_arg(
            THREADS,
            "t",
            default_threads,
            MAX_THREADS,
            "Number of threads each frame is split across",
        ))
        .arg(count_arg(
            CONCURRENCY,
            "g",
            "1",
            usize::max_value(),
            "Worker processes allowed to render at once; 1 runs them strictly in turn",
        ))
        .arg(
            Arg::with_name(OUTPUT)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .default_value("mandel_frame")
                .validator(|s| {
                    if s.is_empty() || s.len() > MAX_PREFIX_LEN {
                        Err(format!(
                            "Output prefix must be between 1 and {} bytes",
                            MAX_PREFIX_LEN
                        ))
                    } else {
                        Ok(())
                    }
                })
                .help("Output file prefix; frames are written to <prefix>_<n>.<ext>"),
        )
        .arg(
            Arg::with_name(FORMAT)
                .long(FORMAT)
                .short("f")
                .takes_value(true)
                .possible_values(&["jpeg", "jpg", "pnm", "ppm"])
                .default_value("jpeg")
                .help("Image format of each frame"),
        )
        .arg(
            Arg::with_name(VERBOSITY)
                .long(VERBOSITY)
                .short("v")
                .takes_value(true)
                .default_value("warn")
                .help("Log filter: error, warn, info, debug or trace"),
        )
        .arg(
            Arg::with_name(movie::WORKER_FLAG)
                .long(movie::WORKER_FLAG)
                .takes_value(true)
                .hidden(true),
        )
        .get_matches()
}

fn config_from(matches: &ArgMatches) -> Config {
    Config {
        center: Complex::new(
            value_t!(matches, XCENTER, f64).unwrap_or_else(|e| e.exit()),
            value_t!(matches, YCENTER, f64).unwrap_or_else(|e| e.exit()),
        ),
        scale: value_t!(matches, SCALE, f64).unwrap_or_else(|e| e.exit()),
        width: value_t!(matches, WIDTH, usize).unwrap_or_else(|e| e.exit()),
        height: value_t!(matches, HEIGHT, usize).unwrap_or_else(|e| e.exit()),
        max_iterations: value_t!(matches, ITERATIONS, u32).unwrap_or_else(|e| e.exit()),
        frames: value_t!(matches, FRAMES, usize).unwrap_or_else(|e| e.exit()),
        processes: value_t!(matches, CHILDREN, usize).unwrap_or_else(|e| e.exit()),
        threads: value_t!(matches, THREADS, usize).unwrap_or_else(|e| e.exit()),
        concurrency: value_t!(matches, CONCURRENCY, usize).unwrap_or_else(|e| e.exit()),
        prefix: matches.value_of(OUTPUT).unwrap_or("mandel_frame").to_string(),
        format: value_t!(matches, FORMAT, OutputFormat).unwrap_or_else(|e| e.exit()),
        verbosity: matches.value_of(VERBOSITY).unwrap_or("warn").to_string(),
    }
}

fn main() {
    let default_threads = default_threads().to_string();
    let matches = args(&default_threads);
    env_logger::Builder::new()
        .parse_filters(matches.value_of(VERBOSITY).unwrap_or("warn"))
        .init();
    let config = config_from(&matches);

    let outcome = if matches.is_present(movie::WORKER_FLAG) {
        let process = value_t!(matches, movie::WORKER_FLAG, usize).unwrap_or_else(|e| e.exit());
        movie::work(&config, process)
    } else {
        println!(
            "Generating Mandel movie with {} images using {} processes...",
            config.frames, config.processes
        );
        movie::coordinate_with_current_exe(&config).map(|_| println!("All images generated"))
    };

    if let Err(e) = outcome {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
