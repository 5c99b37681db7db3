// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The ordering barrier between worker processes.
//!
//! Every worker process is spawned with its stdin and stdout piped to
//! the coordinator.  A worker acquires its baton by reading the line
//! `go` from stdin, and releases it by writing `done` to stdout.  The
//! coordinator decides who gets a `go` and when: with a concurrency of
//! one, process `p + 1` is admitted only after process `p` releases,
//! so the workers render strictly one after another, in index order.
//! A larger concurrency still admits in index order, but lets that many
//! workers render at once.
//!
//! The barrier is built before the first process is spawned and is
//! torn down, reaping every child, only after all of them have exited.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin};
use std::thread;

use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{debug, warn};

use crate::errors::{MovieError, Result};

/// Line a worker waits for before rendering.
pub const GO: &str = "go";

/// Line a worker sends once its frames are written.
pub const DONE: &str = "done";

/// Decides which processes are admitted, and in what order.  Processes
/// are admitted strictly by index; at most `limit` hold a baton at once.
#[derive(Debug)]
pub struct Admission {
    total: usize,
    limit: usize,
    next: usize,
    holding: usize,
}

impl Admission {
    /// `limit` is clamped to at least one.
    pub fn new(total: usize, limit: usize) -> Admission {
        Admission {
            total,
            limit: limit.max(1),
            next: 0,
            holding: 0,
        }
    }

    /// The processes admitted before anyone has released.
    pub fn start(&mut self) -> Vec<usize> {
        let mut admitted = vec![];
        while self.holding < self.limit && self.next < self.total {
            admitted.push(self.next);
            self.next += 1;
            self.holding += 1;
        }
        admitted
    }

    /// A holder released its baton; returns the process admitted in its
    /// place, if any are still waiting.  With no baton held there is
    /// nothing to release and nobody is admitted.
    pub fn release(&mut self) -> Option<usize> {
        if self.holding == 0 {
            return None;
        }
        self.holding -= 1;
        if self.next < self.total {
            let admitted = self.next;
            self.next += 1;
            self.holding += 1;
            Some(admitted)
        } else {
            None
        }
    }

    /// Whether every process has been admitted and has released.
    pub fn is_finished(&self) -> bool {
        self.next == self.total && self.holding == 0
    }
}

/// The worker's side of the barrier.
pub struct Baton<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Baton<R, W> {
    /// Wrap the pipes connecting this worker to its coordinator.
    pub fn new(input: R, output: W) -> Self {
        Baton { input, output }
    }

    /// Block until the coordinator admits this process.
    pub fn acquire(&mut self) -> Result<()> {
        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(|e| {
            MovieError::SynchronizationSetupFailure(format!("could not wait for admission: {}", e))
        })?;
        if read == 0 {
            return Err(MovieError::SynchronizationSetupFailure(
                "coordinator closed the barrier before admitting this process".to_string(),
            ));
        }
        if line.trim() != GO {
            return Err(MovieError::SynchronizationSetupFailure(format!(
                "unexpected admission signal '{}'",
                line.trim()
            )));
        }
        Ok(())
    }

    /// Tell the coordinator this process is finished with its baton.
    pub fn release(&mut self) -> Result<()> {
        writeln!(self.output, "{}", DONE)
            .and_then(|_| self.output.flush())
            .map_err(|e| {
                MovieError::SynchronizationSetupFailure(format!("could not release baton: {}", e))
            })
    }
}

#[derive(Debug)]
enum Event {
    Released(usize),
    Closed(usize),
}

/// The coordinator's side of the barrier.  Owns every worker process
/// enlisted in it.
pub struct OrderingBarrier {
    admission: Admission,
    gates: Vec<Option<ChildStdin>>,
    children: Vec<Child>,
    reaped: Vec<bool>,
    admitted: Vec<bool>,
    released: Vec<bool>,
    events: Receiver<Event>,
    sender: Sender<Event>,
    listeners: Vec<thread::JoinHandle<()>>,
}

impl OrderingBarrier {
    /// A barrier for `processes` workers, letting `concurrency` of them
    /// render at once.
    pub fn new(processes: usize, concurrency: usize) -> OrderingBarrier {
        let (sender, events) = unbounded();
        OrderingBarrier {
            admission: Admission::new(processes, concurrency),
            gates: Vec::with_capacity(processes),
            children: Vec::with_capacity(processes),
            reaped: Vec::with_capacity(processes),
            admitted: Vec::with_capacity(processes),
            released: Vec::with_capacity(processes),
            events,
            sender,
            listeners: Vec::with_capacity(processes),
        }
    }

    /// Take ownership of the next worker process.  Workers are numbered
    /// in the order they are enlisted; both the child's stdin and stdout
    /// must be piped.
    pub fn enlist(&mut self, mut child: Child) -> Result<usize> {
        let index = self.children.len();
        let gate = child.stdin.take();
        let signals = child.stdout.take();
        self.children.push(child);
        self.reaped.push(false);
        self.admitted.push(false);
        self.released.push(false);
        self.gates.push(gate);

        let signals = signals.ok_or_else(|| {
            MovieError::SynchronizationSetupFailure(format!(
                "process {} has no signal pipe",
                index
            ))
        })?;
        if self.gates[index].is_none() {
            return Err(MovieError::SynchronizationSetupFailure(format!(
                "process {} has no gate pipe",
                index
            )));
        }

        let sender = self.sender.clone();
        let listener = thread::Builder::new()
            .name(format!("barrier-{}", index))
            .spawn(move || {
                for line in BufReader::new(signals).lines() {
                    match line {
                        Ok(ref l) if l.trim() == DONE => {
                            if sender.send(Event::Released(index)).is_err() {
                                return;
                            }
                        }
                        Ok(l) => warn!("process {} sent unexpected signal '{}'", index, l),
                        Err(_) => break,
                    }
                }
                let _ = sender.send(Event::Closed(index));
            })
            .map_err(|e| {
                MovieError::ResourceExhaustion(format!(
                    "could not start listener for process {}: {}",
                    index, e
                ))
            })?;
        self.listeners.push(listener);
        Ok(index)
    }

    fn admit(&mut self, index: usize) -> Result<()> {
        debug!("admitting process {}", index);
        let gate = self.gates[index].as_mut().ok_or_else(|| {
            MovieError::SynchronizationSetupFailure(format!("process {} has no gate", index))
        })?;
        self.admitted[index] = true;
        writeln!(gate, "{}", GO)
            .and_then(|_| gate.flush())
            .map_err(|e| {
                MovieError::SynchronizationSetupFailure(format!(
                    "could not admit process {}: {}",
                    index, e
                ))
            })
    }

    fn release(&mut self, index: usize) -> Result<()> {
        if self.released[index] {
            return Ok(());
        }
        if !self.admitted[index] {
            return Err(MovieError::SynchronizationSetupFailure(format!(
                "process {} finished before it was admitted",
                index
            )));
        }
        debug!("process {} released its baton", index);
        self.released[index] = true;
        self.gates[index] = None;
        match self.admission.release() {
            Some(next) => self.admit(next),
            None => Ok(()),
        }
    }

    /// Kill and reap every child still running.
    fn abort(&mut self) {
        for (index, child) in self.children.iter_mut().enumerate() {
            if !self.reaped[index] {
                let _ = child.kill();
                let _ = child.wait();
                self.reaped[index] = true;
            }
        }
    }

    fn drive(&mut self) -> Result<()> {
        if self.children.len() != self.admission.total {
            return Err(MovieError::SynchronizationSetupFailure(format!(
                "expected {} processes, {} enlisted",
                self.admission.total,
                self.children.len()
            )));
        }
        for index in self.admission.start() {
            self.admit(index)?;
        }

        let mut open = self.children.len();
        while open > 0 {
            let event = self.events.recv().map_err(|_| {
                MovieError::SynchronizationSetupFailure("barrier event channel closed".to_string())
            })?;
            match event {
                Event::Released(index) => self.release(index)?,
                Event::Closed(index) => {
                    open -= 1;
                    let status = self.children[index].wait()?;
                    self.reaped[index] = true;
                    if !status.success() {
                        return Err(MovieError::WorkerFailed {
                            process: index,
                            status,
                        });
                    }
                    // A clean exit after admission, without a release,
                    // still frees the baton.
                    self.release(index)?;
                }
            }
        }
        Ok(())
    }

    /// Admit the enlisted processes, pass batons along as they are
    /// released, and wait for every one of them to exit.  The first
    /// failure kills whatever is still running.
    pub fn run(mut self) -> Result<()> {
        let outcome = self.drive();
        if outcome.is_err() {
            self.abort();
        }
        for listener in self.listeners.drain(..) {
            let _ = listener.join();
        }
        outcome
    }
}

impl Drop for OrderingBarrier {
    fn drop(&mut self) {
        self.gates.clear();
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn chained_admission_is_one_at_a_time() {
        let mut a = Admission::new(3, 1);
        assert_eq!(a.start(), vec![0]);
        assert_eq!(a.release(), Some(1));
        assert_eq!(a.release(), Some(2));
        assert!(!a.is_finished());
        assert_eq!(a.release(), None);
        assert!(a.is_finished());
    }

    #[test]
    fn bounded_admission_keeps_index_order() {
        let mut a = Admission::new(5, 2);
        assert_eq!(a.start(), vec![0, 1]);
        assert_eq!(a.release(), Some(2));
        assert_eq!(a.release(), Some(3));
        assert_eq!(a.release(), Some(4));
        assert_eq!(a.release(), None);
        assert_eq!(a.release(), None);
        assert!(a.is_finished());
    }

    #[test]
    fn release_without_a_holder_admits_nobody() {
        let mut a = Admission::new(3, 1);
        assert_eq!(a.release(), None);
        assert_eq!(a.start(), vec![0]);
        assert_eq!(a.release(), Some(1));
        assert_eq!(a.release(), Some(2));
        assert_eq!(a.release(), None);
        assert_eq!(a.release(), None);
        assert!(a.is_finished());
    }

    #[test]
    fn admission_limit_larger_than_the_crowd() {
        let mut a = Admission::new(2, 8);
        assert_eq!(a.start(), vec![0, 1]);
        let mut empty = Admission::new(0, 1);
        assert!(empty.start().is_empty());
        assert!(empty.is_finished());
    }

    #[test]
    fn baton_waits_for_go_and_reports_done() {
        let mut out = vec![];
        {
            let mut baton = Baton::new(Cursor::new(b"go\n".to_vec()), &mut out);
            baton.acquire().unwrap();
            baton.release().unwrap();
        }
        assert_eq!(out, b"done\n".to_vec());
    }

    #[test]
    fn baton_fails_when_the_barrier_closes() {
        let mut baton = Baton::new(Cursor::new(vec![]), vec![]);
        match baton.acquire() {
            Err(MovieError::SynchronizationSetupFailure(_)) => {}
            other => panic!("expected barrier failure, got {:?}", other),
        }
        let mut baton = Baton::new(Cursor::new(b"stop\n".to_vec()), vec![]);
        assert!(baton.acquire().is_err());
    }

    #[cfg(unix)]
    mod processes {
        use super::super::*;
        use std::fs;
        use std::process::{Command, Stdio};

        fn shell(script: &str) -> Child {
            Command::new("sh")
                .arg("-c")
                .arg(script)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .spawn()
                .unwrap()
        }

        #[test]
        fn chained_processes_run_in_index_order() {
            let dir = tempfile::tempdir().unwrap();
            let log = dir.path().join("order");
            let mut barrier = OrderingBarrier::new(4, 1);
            let mut children = vec![];
            for p in 0..4 {
                children.push(shell(&format!(
                    "read gate; echo {} >> {}; echo done",
                    p,
                    log.display()
                )));
            }
            for child in children {
                barrier.enlist(child).unwrap();
            }
            barrier.run().unwrap();
            assert_eq!(fs::read_to_string(&log).unwrap(), "0\n1\n2\n3\n");
        }

        #[test]
        fn a_failing_process_fails_the_run() {
            let mut barrier = OrderingBarrier::new(2, 1);
            barrier.enlist(shell("read gate; exit 3")).unwrap();
            barrier.enlist(shell("read gate; echo done")).unwrap();
            match barrier.run() {
                Err(MovieError::WorkerFailed { process: 0, .. }) => {}
                other => panic!("expected worker failure, got {:?}", other),
            }
        }

        #[test]
        fn clean_exit_without_release_passes_the_baton() {
            let mut barrier = OrderingBarrier::new(2, 1);
            barrier.enlist(shell("read gate")).unwrap();
            barrier.enlist(shell("read gate; echo done")).unwrap();
            barrier.run().unwrap();
        }

        #[test]
        fn unadmitted_clean_exit_does_not_jump_the_queue() {
            let dir = tempfile::tempdir().unwrap();
            let log = dir.path().join("order");
            let mut barrier = OrderingBarrier::new(3, 1);
            barrier
                .enlist(shell(&format!(
                    "read gate; echo start0 >> {0}; sleep 1; echo end0 >> {0}; echo done",
                    log.display()
                )))
                .unwrap();
            barrier
                .enlist(shell(&format!(
                    "read gate; echo start1 >> {0}; echo end1 >> {0}; echo done",
                    log.display()
                )))
                .unwrap();
            barrier.enlist(shell("exit 0")).unwrap();
            match barrier.run() {
                Err(MovieError::SynchronizationSetupFailure(_)) => {}
                other => panic!("expected barrier failure, got {:?}", other),
            }
            let order = fs::read_to_string(&log).unwrap_or_default();
            assert!(!order.contains("start1"));
        }
    }
}
