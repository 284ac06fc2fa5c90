// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fixed-budget escape time.  Nothing survives between renders: every
//! render iterates every pixel from the seed until it escapes or the
//! budget runs out.

use image::RgbImage;
use num::Complex;

use super::{paint, Engine, Viewport};
use crate::catalog::C64;
use crate::color::ColorScheme;
use crate::compiler::{Kernel, Program};
use crate::dispatch::Dispatcher;
use crate::error::CompileError;
use crate::planes::ComplexPlane;

/// Iterations per pixel.
pub const MAX_STEPS: i32 = 800;

/// Escape counts per trip around the color table.
pub const COLOR_PERIOD: f64 = 60.0;

/// Counts iterations of `f` from `seed` until `|z| > 2`.  Returns the
/// zero-based index of the update that escaped, or -1 if none did
/// within `max_steps` updates.
#[inline]
pub fn escape_steps<F>(f: F, seed: C64, c: C64, max_steps: i32) -> i32
where
    F: Fn(C64, C64) -> C64,
{
    let mut z = seed;
    for i in 0..max_steps {
        z = f(z, c);
        if z.norm_sqr() > 4.0 {
            return i;
        }
    }
    -1
}

/// The fixed-budget engine.
pub struct EscapeTime {
    plane: ComplexPlane,
    map: Program,
    seed: C64,
    max_steps: i32,
    dispatcher: Dispatcher,
}

impl EscapeTime {
    /// An engine iterating the kernel's `f(z, c)`.
    pub fn new(plane: ComplexPlane, kernel: &Kernel) -> Result<EscapeTime, CompileError> {
        let map = kernel.require("f", 2)?.clone();
        Ok(EscapeTime {
            plane,
            map,
            seed: Complex::new(0.0, 0.0),
            max_steps: MAX_STEPS,
            dispatcher: Dispatcher::default(),
        })
    }

    /// The classic set, `z*z + c` from zero.
    pub fn mandelbrot(plane: ComplexPlane) -> Result<EscapeTime, CompileError> {
        EscapeTime::new(plane, &Kernel::iteration("z*z + c")?)
    }

    /// Starts every orbit at `seed` instead of zero.
    pub fn with_seed(mut self, seed: C64) -> Self {
        self.seed = seed;
        self
    }

    /// Overrides the iteration budget.
    pub fn with_max_steps(mut self, max_steps: i32) -> Self {
        self.max_steps = max_steps.max(0);
        self
    }

    /// Runs passes on `dispatcher`.
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Escape step of every pixel, row by row; -1 for pixels that
    /// never escaped.
    pub fn counts(&self) -> Vec<i32> {
        let plane = &self.plane;
        let map = &self.map;
        let (seed, max_steps) = (self.seed, self.max_steps);
        self.dispatcher.map(plane.len(), |offset| {
            let c = plane.offset_to_point(offset);
            escape_steps(|z, c| map.eval(&[z, c]), seed, c, max_steps)
        })
    }
}

impl Viewport for EscapeTime {
    fn viewport_mut(&mut self) -> &mut ComplexPlane {
        &mut self.plane
    }
}

impl Engine for EscapeTime {
    fn name(&self) -> &'static str {
        "escape time"
    }

    fn plane(&self) -> &ComplexPlane {
        &self.plane
    }

    fn render(&mut self, target: &mut RgbImage, scheme: &ColorScheme) {
        let counts = self.counts();
        debug!(
            "{}: {} of {} pixels escaped",
            self.name(),
            counts.iter().filter(|s| **s >= 0).count(),
            counts.len()
        );
        paint(&self.dispatcher, &self.plane, target, |offset| {
            scheme.sample(f64::from(counts[offset]) / COLOR_PERIOD)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planes::Pixel;

    #[test]
    fn far_points_escape_at_once_and_the_origin_never_does() {
        let plane = ComplexPlane::new(41, 41, Complex::new(0.0, 0.0), 8.2).unwrap();
        let engine = EscapeTime::mandelbrot(plane)
            .unwrap()
            .with_dispatcher(Dispatcher::new(4));
        let counts = engine.counts();
        for (offset, steps) in counts.iter().enumerate() {
            let point = plane.offset_to_point(offset);
            if point.norm() > 2.0 {
                assert_eq!(*steps, 0, "{} should escape immediately", point);
            }
        }
        assert_eq!(plane.pixel_to_point(&Pixel(20, 20)), Complex::new(0.0, 0.0));
        assert_eq!(counts[20 * 41 + 20], -1);
    }

    #[test]
    fn the_origin_never_escapes_whatever_the_budget() {
        let square = |z: C64, c: C64| z * z + c;
        let origin = Complex::new(0.0, 0.0);
        for budget in &[1, 10, 800, 100_000] {
            assert_eq!(escape_steps(square, origin, origin, *budget), -1);
        }
    }

    #[test]
    fn known_escape_counts() {
        let square = |z: C64, c: C64| z * z + c;
        let zero = Complex::new(0.0, 0.0);
        // 1, 2, 5: escapes on the third update.
        assert_eq!(escape_steps(square, zero, Complex::new(1.0, 0.0), 800), 2);
        // -1 cycles between 0 and -1.
        assert_eq!(escape_steps(square, zero, Complex::new(-1.0, 0.0), 800), -1);
        // A zero budget never gets to check.
        assert_eq!(escape_steps(square, zero, Complex::new(5.0, 0.0), 0), -1);
    }

    #[test]
    fn custom_maps_and_seeds() {
        let plane = ComplexPlane::new(3, 3, Complex::new(0.0, 0.0), 3.0).unwrap();
        let kernel = Kernel::iteration("z^2 + c").unwrap();
        let engine = EscapeTime::new(plane, &kernel)
            .unwrap()
            .with_seed(Complex::new(3.0, 0.0))
            .with_dispatcher(Dispatcher::new(1));
        // From 3 every orbit leaves on the first update.
        assert!(engine.counts().iter().all(|s| *s == 0));
    }

    #[test]
    fn maps_must_take_z_and_c() {
        let plane = ComplexPlane::new(3, 3, Complex::new(0.0, 0.0), 3.0).unwrap();
        let kernel = Kernel::single("f", &["z"], "z*z").unwrap();
        assert!(EscapeTime::new(plane, &kernel).is_err());
    }

    #[test]
    fn render_uses_the_negative_color_inside() {
        let plane = ComplexPlane::new(5, 5, Complex::new(0.0, 0.0), 0.5).unwrap();
        let mut engine = EscapeTime::mandelbrot(plane).unwrap();
        let scheme = ColorScheme::default();
        let mut img = RgbImage::new(5, 5);
        engine.render(&mut img, &scheme);
        let inside = crate::color::to_rgb(scheme.negative());
        assert!(img.pixels().all(|p| *p == inside));
    }
}
