// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors raised while turning user input into something an engine
//! can run.  Numerical trouble inside a pass is never an error; it is
//! recorded per pixel.

use failure::Fail;

/// Everything that can go wrong between an expression string and an
/// assembled kernel.  When one of these is returned no kernel text
/// exists, so there is nothing that could be dispatched by mistake.
#[derive(Debug, Clone, PartialEq, Fail)]
pub enum CompileError {
    /// A name that is neither a declared variable nor a named constant.
    #[fail(display = "Invalid symbol name: '{}'", _0)]
    UnboundSymbol(String),

    /// An operator missing from the catalog, or present with a
    /// different number of arguments.
    #[fail(display = "Invalid function name: '{}' with {} argument(s)", name, arity)]
    UnknownOperator {
        /// The operator as written by the user.
        name: String,
        /// The number of arguments it was called with.
        arity: usize,
    },

    /// The expression text could not be read as an expression at all.
    #[fail(display = "Parse error at column {}: {}", position, message)]
    Parse {
        /// Zero-based byte offset into the source text.
        position: usize,
        /// What the parser expected to find.
        message: String,
    },
}

impl CompileError {
    /// The offending name, for the two errors that carry one.
    pub fn name(&self) -> Option<&str> {
        match self {
            CompileError::UnboundSymbol(name) => Some(name),
            CompileError::UnknownOperator { name, .. } => Some(name),
            CompileError::Parse { .. } => None,
        }
    }
}

/// A viewport that cannot be mapped onto the complex plane.
#[derive(Debug, Clone, PartialEq, Fail)]
pub enum ViewError {
    /// Width or height of zero.
    #[fail(display = "The viewport {}x{} has no pixels", _0, _1)]
    EmptyViewport(usize, usize),

    /// The visible extent of the plane must be a positive number.
    #[fail(display = "The zoom {} is not a positive, finite extent", _0)]
    BadZoom(f64),
}
