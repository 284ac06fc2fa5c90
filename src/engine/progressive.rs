// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Resumable escape time.
//!
//! Each pixel carries its orbit point and a signed step counter
//! between advances.  While a pixel is still iterating its counter is
//! negative and counts down once per update; when the orbit leaves
//! the disk of radius two the counter is flipped to `-steps - 1`, the
//! number of updates it took, and the pixel is never touched again.
//! A pixel that never escapes simply keeps a negative counter, which
//! renders with the scheme's negative color.

use image::RgbImage;
use num::Complex;

use super::escape::COLOR_PERIOD;
use super::{paint, Engine, Viewport};
use crate::buffer::DoubleBuffer;
use crate::catalog::C64;
use crate::color::ColorScheme;
use crate::dispatch::Dispatcher;
use crate::error::ViewError;
use crate::planes::ComplexPlane;

/// Updates per pixel per call to `advance`.
pub const STEPS_PER_ADVANCE: i32 = 200;

/// Iteration state of one pixel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Cell {
    /// The current orbit point.
    pub z: C64,
    /// Negative while iterating, the escape step once escaped.
    pub steps: i32,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            z: Complex::new(0.0, 0.0),
            steps: -1,
        }
    }
}

impl Cell {
    /// True once the orbit has left the disk.
    pub fn escaped(&self) -> bool {
        self.steps >= 0
    }
}

/// Runs up to `budget` updates of `z*z + c` on a cell that has not
/// escaped yet.
#[inline]
fn resume(mut cell: Cell, c: C64, budget: i32) -> Cell {
    if cell.escaped() {
        return cell;
    }
    for _ in 0..budget {
        if cell.z.norm_sqr() > 4.0 {
            cell.steps = -cell.steps - 1;
            break;
        }
        cell.steps -= 1;
        cell.z = cell.z * cell.z + c;
    }
    cell
}

/// The resumable engine; a Julia set when `c` is fixed, the Mandelbrot
/// set when each pixel supplies its own.
pub struct Progressive {
    plane: ComplexPlane,
    c: Option<C64>,
    state: DoubleBuffer<Cell>,
    steps_executed: u64,
    dispatcher: Dispatcher,
}

impl Progressive {
    /// An engine with its state already reset for `plane`.
    pub fn new(plane: ComplexPlane, c: Option<C64>) -> Progressive {
        let mut engine = Progressive {
            plane,
            c,
            state: DoubleBuffer::new(plane.len(), Cell::default()),
            steps_executed: 0,
            dispatcher: Dispatcher::default(),
        };
        engine.change_view();
        engine
    }

    /// The Julia set for `c`.
    pub fn julia(plane: ComplexPlane, c: C64) -> Progressive {
        Progressive::new(plane, Some(c))
    }

    /// The Mandelbrot set.
    pub fn mandelbrot(plane: ComplexPlane) -> Progressive {
        Progressive::new(plane, None)
    }

    /// Runs passes on `dispatcher`.
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// The fixed parameter, if any.
    pub fn parameter(&self) -> Option<C64> {
        self.c
    }

    /// Switches to a different fixed parameter and starts over.
    pub fn set_parameter(&mut self, c: Option<C64>) {
        self.c = c;
        self.change_view();
    }

    /// Puts every pixel back at its starting point.
    pub fn reset(&mut self) {
        self.change_view();
    }

    /// Updates granted to each pixel since the last reset.
    pub fn steps_executed(&self) -> u64 {
        self.steps_executed
    }

    /// The current state of every pixel.
    pub fn cells(&self) -> &[Cell] {
        self.state.front()
    }

    /// Every pixel's counter: the escape step, or negative while still
    /// iterating.
    pub fn counts(&self) -> Vec<i32> {
        self.cells().iter().map(|c| c.steps).collect()
    }

    /// Advances needed before `budget` updates have been granted.
    pub fn advances_for(budget: i32) -> usize {
        ((budget.max(0) + STEPS_PER_ADVANCE - 1) / STEPS_PER_ADVANCE) as usize
    }
}

impl Viewport for Progressive {
    fn viewport_mut(&mut self) -> &mut ComplexPlane {
        &mut self.plane
    }
}

impl Engine for Progressive {
    fn name(&self) -> &'static str {
        match self.c {
            Some(_) => "julia",
            None => "mandelbrot",
        }
    }

    fn plane(&self) -> &ComplexPlane {
        &self.plane
    }

    fn resize(&mut self, width: usize, height: usize) -> Result<(), ViewError> {
        self.plane.resize(width, height)?;
        self.state.resize(self.plane.len(), Cell::default());
        info!("{}: reallocated {} cells", self.name(), self.state.len());
        self.change_view();
        Ok(())
    }

    fn change_view(&mut self) {
        if self.state.len() != self.plane.len() {
            self.state.resize(self.plane.len(), Cell::default());
        }
        let plane = &self.plane;
        self.state.initialize(&self.dispatcher, |offset| Cell {
            z: plane.offset_to_point(offset),
            steps: -1,
        });
        self.steps_executed = 0;
    }

    fn advance(&mut self) {
        let plane = &self.plane;
        let fixed = self.c;
        self.state.pass(&self.dispatcher, |offset, front| {
            let c = fixed.unwrap_or_else(|| plane.offset_to_point(offset));
            resume(front[offset], c, STEPS_PER_ADVANCE)
        });
        self.steps_executed += STEPS_PER_ADVANCE as u64;
        if log_enabled!(log::Level::Trace) {
            let escaped = self.cells().iter().filter(|c| c.escaped()).count();
            trace!(
                "{}: {} steps, {} of {} escaped",
                self.name(),
                self.steps_executed,
                escaped,
                self.state.len()
            );
        }
    }

    fn render(&mut self, target: &mut RgbImage, scheme: &ColorScheme) {
        let cells = self.state.front();
        paint(&self.dispatcher, &self.plane, target, |offset| {
            let steps = cells[offset].steps;
            if steps < 0 {
                scheme.negative()
            } else {
                scheme.sample(f64::from(steps) / COLOR_PERIOD)
            }
        });
    }
}
