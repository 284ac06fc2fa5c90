// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Newton basins.  Every pixel is polished towards a root of `f` with
//! Newton's method; the color says which root it reached and how fast.

use std::f64::consts::PI;

use image::RgbImage;

use super::{paint, Engine, Viewport};
use crate::axes;
use crate::catalog::C64;
use crate::color::{mix, Color, ColorScheme};
use crate::compiler::{Kernel, Program};
use crate::dispatch::Dispatcher;
use crate::error::CompileError;
use crate::planes::ComplexPlane;

/// Newton steps per pixel.
pub const MAX_STEPS: u32 = 100;

/// Converged once `|f(c)|` is below this...
pub const VALUE_TOLERANCE: f64 = 1e-2;

/// ...and the last correction below this.
pub const STEP_TOLERANCE: f64 = 1e-6;

/// Radius, in plane units, of the root markers.
pub const ROOT_MARK_RADIUS: f64 = 0.06;

/// Where one pixel's iteration ended up.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Basin {
    /// The last estimate.
    pub root: C64,
    /// The last Newton correction `f/f'`.
    pub step: C64,
    /// Index of the converging step, `None` if the iteration failed or
    /// ran out of steps.
    pub steps: Option<u32>,
}

fn is_wrong(v: C64) -> bool {
    v.re.is_nan() || v.im.is_nan() || v.re.is_infinite() || v.im.is_infinite()
}

/// Runs Newton's method for `f` with derivative `df` from `start`.
pub fn polish<F, D>(f: F, df: D, start: C64) -> Basin
where
    F: Fn(C64) -> C64,
    D: Fn(C64) -> C64,
{
    let mut c = start;
    let mut step = C64::new(0.0, 0.0);
    for i in 0..MAX_STEPS {
        let fc = f(c);
        let d = df(c);
        let n = d.norm_sqr();
        step = C64::new(
            (fc.re * d.re + fc.im * d.im) / n,
            (fc.im * d.re - fc.re * d.im) / n,
        );
        if is_wrong(step) {
            break;
        }
        if fc.norm() < VALUE_TOLERANCE && step.norm() < STEP_TOLERANCE {
            return Basin {
                root: c,
                step,
                steps: Some(i),
            };
        }
        c -= step;
    }
    Basin {
        root: c,
        step,
        steps: None,
    }
}

fn ease_in_out(x: f64) -> f64 {
    if x < 0.5 {
        4.0 * x * x * x
    } else {
        1.0 - 0.5 * (2.0 - 2.0 * x).powi(3)
    }
}

/// The Newton engine.
pub struct NewtonEngine {
    plane: ComplexPlane,
    f: Program,
    df: Program,
    smooth: bool,
    show_roots: bool,
    draw_axes: bool,
    dispatcher: Dispatcher,
}

impl NewtonEngine {
    /// An engine for the kernel's `f(z)` and `df(z)`.
    pub fn new(plane: ComplexPlane, kernel: &Kernel) -> Result<NewtonEngine, CompileError> {
        Ok(NewtonEngine {
            plane,
            f: kernel.require("f", 1)?.clone(),
            df: kernel.require("df", 1)?.clone(),
            smooth: false,
            show_roots: false,
            draw_axes: false,
            dispatcher: Dispatcher::default(),
        })
    }

    /// Runs passes on `dispatcher`.
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Blend the step count by the size of the final correction.
    pub fn set_smooth(&mut self, smooth: bool) {
        self.smooth = smooth;
    }

    /// Mark each root with a small disk.
    pub fn set_show_roots(&mut self, show_roots: bool) {
        self.show_roots = show_roots;
    }

    /// Overlay the coordinate axes.
    pub fn set_draw_axes(&mut self, draw_axes: bool) {
        self.draw_axes = draw_axes;
    }

    /// The basin of every pixel, row by row.
    pub fn basins(&self) -> Vec<Basin> {
        let (plane, f, df) = (&self.plane, &self.f, &self.df);
        let mut out = vec![
            Basin {
                root: C64::new(0.0, 0.0),
                step: C64::new(0.0, 0.0),
                steps: None,
            };
            plane.len()
        ];
        self.dispatcher.run(&mut out, |offset| {
            polish(
                |z| f.eval(&[z]),
                |z| df.eval(&[z]),
                plane.offset_to_point(offset),
            )
        });
        out
    }

    /// The color of a pixel at `start` whose iteration ended in `basin`.
    pub fn shade(&self, scheme: &ColorScheme, start: C64, basin: &Basin) -> Color {
        let steps = match basin.steps {
            Some(steps) => f64::from(steps),
            None => return scheme.negative(),
        };
        let c = basin.root;
        let l = c.norm();
        let angle = (1.0 + c.im.atan2(c.re) / PI) * 0.5 * 659.0;
        let mut col = scheme.sample(l * 43.223 + if l < 1e-3 { 0.0 } else { angle });

        let mut steps = steps;
        if self.smooth {
            let v = 1.0 + (basin.step.norm().log10() + 6.0) / 6.0;
            steps += v.max(0.0).min(1.0);
        }
        let fade = (-(0.04 * steps).powi(2)).exp();
        col = mix(scheme.negative(), col, fade as f32);

        if self.show_roots {
            let d = (c - start).norm() / ROOT_MARK_RADIUS;
            if d < 1.0 {
                col = mix(scheme.axes(), col, ease_in_out(d) as f32);
            }
        }
        col
    }
}

impl Viewport for NewtonEngine {
    fn viewport_mut(&mut self) -> &mut ComplexPlane {
        &mut self.plane
    }
}

impl Engine for NewtonEngine {
    fn name(&self) -> &'static str {
        "newton"
    }

    fn plane(&self) -> &ComplexPlane {
        &self.plane
    }

    fn render(&mut self, target: &mut RgbImage, scheme: &ColorScheme) {
        let basins = self.basins();
        debug!(
            "{}: {} of {} pixels converged",
            self.name(),
            basins.iter().filter(|b| b.steps.is_some()).count(),
            basins.len()
        );
        let plane = &self.plane;
        paint(&self.dispatcher, plane, target, |offset| {
            self.shade(scheme, plane.offset_to_point(offset), &basins[offset])
        });
        if self.draw_axes {
            axes::draw(target, plane, scheme.axes());
        }
    }
}
