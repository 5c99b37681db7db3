// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Driving a whole movie: the coordinator spawns one worker process per
//! frame range and hands them to the ordering barrier; each worker
//! waits for its baton, renders its frames in order, and passes the
//! baton on.

use std::env;
use std::ffi::OsString;
use std::io;
use std::process::{Command, Stdio};

use log::info;

use crate::barrier::{Baton, OrderingBarrier};
use crate::config::Config;
use crate::errors::{MovieError, Result};
use crate::render::FrameRenderer;
use crate::schedule::{FrameSpec, Schedule};

/// The hidden option that switches the binary into worker mode.
pub const WORKER_FLAG: &str = "worker";

/// Render the whole movie.  `program` is the executable re-launched for
/// every worker process; normally the running binary itself.
pub fn coordinate(config: &Config, program: &OsString) -> Result<()> {
    config.validate()?;
    let schedule = Schedule::new(config.frames, config.processes);
    if config.concurrency > 1 {
        info!(
            "barrier admits {} processes at once; frames may finish out of order",
            config.concurrency
        );
    }

    let mut barrier = OrderingBarrier::new(schedule.processes(), config.concurrency);
    for process in 0..schedule.processes() {
        let child = Command::new(program)
            .args(config.to_args())
            .arg(format!("--{}={}", WORKER_FLAG, process))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                MovieError::ResourceExhaustion(format!(
                    "could not start worker process {}: {}",
                    process, e
                ))
            })?;
        barrier.enlist(child)?;
    }
    barrier.run()
}

/// Render the whole movie by re-launching the running executable.
pub fn coordinate_with_current_exe(config: &Config) -> Result<()> {
    let program = env::current_exe().map_err(|e| {
        MovieError::ResourceExhaustion(format!("cannot locate own executable: {}", e))
    })?;
    coordinate(config, &program.into_os_string())
}

/// Render the frames of process `process`, between acquiring and
/// releasing `baton`.
pub fn render_range<R, W>(config: &Config, process: usize, baton: &mut Baton<R, W>) -> Result<()>
where
    R: io::BufRead,
    W: io::Write,
{
    let range = Schedule::new(config.frames, config.processes).range_for(process);
    let renderer = FrameRenderer::new(config.threads, config.format.writer());

    baton.acquire()?;
    if range.is_empty() {
        info!("process {} has no frames to render", process);
    } else {
        info!(
            "process {} assigned frames {} to {}",
            process,
            range.start + 1,
            range.end
        );
    }
    for index in range.indices() {
        let spec = FrameSpec::new(index, config);
        renderer.render(&spec)?;
        info!("process {} generated frame {}", process, index + 1);
    }
    baton.release()
}

/// The body of a worker process: the baton travels over stdin and
/// stdout.
pub fn work(config: &Config, process: usize) -> Result<()> {
    config.validate()?;
    if process >= config.processes {
        return Err(MovieError::InvalidConfiguration(format!(
            "worker index {} out of range for {} processes",
            process, config.processes
        )));
    }
    let stdin = io::stdin();
    let mut baton = Baton::new(stdin.lock(), io::stdout());
    render_range(config, process, &mut baton)
}
