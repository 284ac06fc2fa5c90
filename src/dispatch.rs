// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The parallel processor every engine runs on.
//!
//! A pass is a function from a cell index to a cell value.  The
//! output slice is cut into one contiguous chunk per worker and every
//! worker fills its chunk independently; the scope joins all of them
//! before `run` returns, so one pass is always finished before the
//! next one starts.  Nothing inside a pass may depend on the order in
//! which cells are computed.

use std::panic;

/// Runs data-parallel passes over flat buffers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Dispatcher {
    threads: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new(num_cpus::get())
    }
}

impl Dispatcher {
    /// A dispatcher with `threads` workers; zero is treated as one.
    pub fn new(threads: usize) -> Self {
        Dispatcher {
            threads: threads.max(1),
        }
    }

    /// Number of workers.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Fills `out[i]` with `kernel(i)` for every index.
    pub fn run<T, F>(&self, out: &mut [T], kernel: F)
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        if out.is_empty() {
            return;
        }
        let threads = self.threads.min(out.len());
        if threads == 1 {
            for (i, cell) in out.iter_mut().enumerate() {
                *cell = kernel(i);
            }
            return;
        }

        let chunk = (out.len() + threads - 1) / threads;
        let kernel = &kernel;
        let result = crossbeam::scope(|spawner| {
            for (n, region) in out.chunks_mut(chunk).enumerate() {
                spawner.spawn(move |_| {
                    let base = n * chunk;
                    for (i, cell) in region.iter_mut().enumerate() {
                        *cell = kernel(base + i);
                    }
                });
            }
        });
        // A panicking kernel is a bug in the kernel; surface it on the
        // calling thread rather than leaving a half-written buffer.
        if let Err(cause) = result {
            panic::resume_unwind(cause);
        }
    }

    /// Collects `kernel(i)` for `0..len` into a fresh vector.
    pub fn map<T, F>(&self, len: usize, kernel: F) -> Vec<T>
    where
        T: Send + Default + Clone,
        F: Fn(usize) -> T + Sync,
    {
        let mut out = vec![T::default(); len];
        self.run(&mut out, kernel);
        out
    }
}
