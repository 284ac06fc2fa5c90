// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The rendering engines.
//!
//! Every engine owns a [`ComplexPlane`] and is driven the same way:
//! `change_view`, then any number of `advance` calls, then `render`.
//! Engines without persistent state keep the default no-op
//! `change_view` and `advance`.  Which engine runs is decided once, in
//! [`create`], and never changes for the life of the boxed value.

use std::fmt;
use std::str::FromStr;

use image::RgbImage;
use num::Complex;

use crate::color::{to_rgb, Color, ColorScheme};
use crate::compiler::Kernel;
use crate::dispatch::Dispatcher;
use crate::error::{CompileError, ViewError};
use crate::planes::ComplexPlane;

pub mod escape;
pub mod littlewood;
pub mod newton;
pub mod progressive;

pub use self::escape::EscapeTime;
pub use self::littlewood::RootTracker;
pub use self::newton::NewtonEngine;
pub use self::progressive::Progressive;

mod sealed {
    use crate::planes::ComplexPlane;

    /// Write access to an engine's view.  Only the provided `Engine`
    /// methods use it, and each one resets the engine afterwards.
    pub trait Viewport {
        fn viewport_mut(&mut self) -> &mut ComplexPlane;
    }
}

pub(crate) use self::sealed::Viewport;

/// The contract shared by all engines.  The view can only be changed
/// through `resize` and `set_view`, both of which end in `change_view`.
pub trait Engine: Send + Viewport {
    /// A short human-readable name, used in logs.
    fn name(&self) -> &'static str;

    /// The current view.
    fn plane(&self) -> &ComplexPlane;

    /// Changes the viewport size.  Persisted state is reallocated and
    /// starts over.
    fn resize(&mut self, width: usize, height: usize) -> Result<(), ViewError> {
        self.viewport_mut().resize(width, height)?;
        info!("{}: resized to {}x{}", self.name(), width, height);
        self.change_view();
        Ok(())
    }

    /// Pans or zooms, then starts over.
    fn set_view(&mut self, center: Complex<f64>, zoom: f64) -> Result<(), ViewError> {
        self.viewport_mut().set_view(center, zoom)?;
        info!("{}: view {} at zoom {}", self.name(), center, zoom);
        self.change_view();
        Ok(())
    }

    /// Throws away every bit of iteration state.
    fn change_view(&mut self) {}

    /// Runs one batch of work on the persisted state.
    fn advance(&mut self) {}

    /// Draws the current state into `target`, resizing it to the
    /// viewport if needed.
    fn render(&mut self, target: &mut RgbImage, scheme: &ColorScheme);
}

/// Which engine to build.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Fixed-budget escape time over an arbitrary map.
    Escape,
    /// Resumable escape time, `c` taken from each pixel.
    Mandelbrot,
    /// Resumable escape time with a fixed `c`.
    Julia,
    /// Newton basins of a function and its derivative.
    Newton,
    /// Roots of every ±1 polynomial.
    Littlewood,
}

impl Mode {
    /// Every mode, in the order they are listed to users.
    pub fn all() -> &'static [Mode] {
        &[
            Mode::Escape,
            Mode::Mandelbrot,
            Mode::Julia,
            Mode::Newton,
            Mode::Littlewood,
        ]
    }

    /// The name accepted by `from_str`.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Escape => "escape",
            Mode::Mandelbrot => "mandelbrot",
            Mode::Julia => "julia",
            Mode::Newton => "newton",
            Mode::Littlewood => "littlewood",
        }
    }

    /// True for engines whose picture improves with `advance`.
    pub fn is_iterative(self) -> bool {
        match self {
            Mode::Escape | Mode::Newton => false,
            Mode::Mandelbrot | Mode::Julia | Mode::Littlewood => true,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Mode, String> {
        Mode::all()
            .iter()
            .cloned()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown mode '{}'", s))
    }
}

/// Everything [`create`] may need, whatever the mode.  Fields a mode
/// has no use for are ignored.
#[derive(Clone, Debug)]
pub struct Settings {
    /// The function: an iteration map in `z` and `c` for escape mode,
    /// `f(z)` for Newton mode.
    pub function: String,
    /// `f'(z)`, Newton mode only.
    pub derivative: String,
    /// Starting `z` for escape mode.
    pub seed: Complex<f64>,
    /// The Julia parameter.
    pub julia: Complex<f64>,
    /// Seed for the root tracker's initial estimates.
    pub run_seed: u32,
    /// Newton smooth shading.
    pub smooth: bool,
    /// Newton root markers.
    pub show_roots: bool,
    /// Draw coordinate axes where the engine supports it.
    pub axes: bool,
    /// Root tracker proven-region backdrop.
    pub proven: bool,
    /// Worker threads.
    pub threads: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            function: "z*z + c".to_string(),
            derivative: "2z".to_string(),
            seed: Complex::new(0.0, 0.0),
            julia: Complex::new(-0.8, 0.156),
            run_seed: 0,
            smooth: false,
            show_roots: false,
            axes: false,
            proven: false,
            threads: num_cpus::get(),
        }
    }
}

/// Builds the engine for `mode`.  The kernel is compiled here, so a
/// bad expression never reaches a dispatcher.
pub fn create(
    mode: Mode,
    plane: ComplexPlane,
    settings: &Settings,
) -> Result<Box<dyn Engine>, CompileError> {
    let dispatcher = Dispatcher::new(settings.threads);
    let engine: Box<dyn Engine> = match mode {
        Mode::Escape => {
            let kernel = Kernel::iteration(&settings.function)?;
            Box::new(
                EscapeTime::new(plane, &kernel)?
                    .with_seed(settings.seed)
                    .with_dispatcher(dispatcher),
            )
        }
        Mode::Mandelbrot => Box::new(Progressive::new(plane, None).with_dispatcher(dispatcher)),
        Mode::Julia => {
            Box::new(Progressive::new(plane, Some(settings.julia)).with_dispatcher(dispatcher))
        }
        Mode::Newton => {
            let kernel = Kernel::newton(&settings.function, &settings.derivative)?;
            let mut engine = NewtonEngine::new(plane, &kernel)?.with_dispatcher(dispatcher);
            engine.set_smooth(settings.smooth);
            engine.set_show_roots(settings.show_roots);
            engine.set_draw_axes(settings.axes);
            Box::new(engine)
        }
        Mode::Littlewood => {
            let mut engine = RootTracker::new(plane, settings.run_seed).with_dispatcher(dispatcher);
            engine.set_proven(settings.proven);
            engine.set_draw_axes(settings.axes);
            Box::new(engine)
        }
    };
    debug!("created {} engine", engine.name());
    Ok(engine)
}

/// Fills `target` with `shade(offset)` for every pixel of `plane`,
/// computed in parallel.
pub(crate) fn paint<F>(
    dispatcher: &Dispatcher,
    plane: &ComplexPlane,
    target: &mut RgbImage,
    shade: F,
) where
    F: Fn(usize) -> Color + Sync,
{
    fit(plane, target);
    let colors: Vec<Color> = dispatcher.map(plane.len(), shade);
    for (pixel, color) in target.pixels_mut().zip(colors) {
        *pixel = to_rgb(color);
    }
}

/// Makes `target` exactly the viewport's size.
pub(crate) fn fit(plane: &ComplexPlane, target: &mut RgbImage) {
    let (w, h) = (plane.width() as u32, plane.height() as u32);
    if target.dimensions() != (w, h) {
        *target = RgbImage::new(w, h);
    }
}
