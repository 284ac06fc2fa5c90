#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Plane shader
//!
//! Renders pictures of complex dynamics by running the same small
//! computation on every pixel of a view of the complex plane.
//!
//! The user writes a function as an ordinary expression, `z^3 - 1` or
//! `z*z + c`.  The compiler checks it against a catalog of complex
//! operations and produces a kernel: GLSL source in which every
//! operation is defined before it is used, together with an evaluable
//! form of the same expression that the CPU dispatcher runs in
//! parallel.
//!
//! Four engines consume kernels.  The escape-time engine counts how
//! many iterations it takes each point to leave the disk of radius
//! two.  The progressive engine does the same in resumable batches,
//! keeping every pixel's orbit between batches in a pair of ping-pong
//! buffers.  The Newton engine polishes every pixel towards a root of
//! the function and colors it by the root it found.  The root tracker
//! follows the roots of every polynomial with coefficients ±1 at once,
//! and draws them as points.

#[macro_use]
extern crate log;

extern crate crossbeam;
extern crate failure;
extern crate image;
extern crate itertools;
extern crate num;
extern crate num_cpus;
extern crate once_cell;
extern crate rand;

pub mod axes;
pub mod buffer;
pub mod catalog;
pub mod color;
pub mod compiler;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod expr;
pub mod planes;

pub use color::ColorScheme;
pub use compiler::{compile, lower, Kernel, Program};
pub use dispatch::Dispatcher;
pub use engine::{create, Engine, Mode, Settings};
pub use error::{CompileError, ViewError};
pub use expr::Node;
pub use planes::{ComplexPlane, Pixel};
