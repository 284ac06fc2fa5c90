// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns expression trees into kernels.
//!
//! A kernel has two faces.  Its *source* is GLSL: the catalog entries
//! the expressions need, each defined before anything calls it,
//! followed by one function per entry point.  Its *programs* are the
//! same expressions lowered to trees of catalog formulas, which the
//! CPU dispatcher evaluates once per pixel.  Both come out of the same
//! walk over the tree, so a kernel that compiled as text is always
//! runnable, and vice versa.

use std::collections::BTreeSet;

use crate::catalog::{Catalog, Formula, C64};
use crate::error::CompileError;
use crate::expr::Node;

/// The tree form of a compiled expression.
#[derive(Clone, Debug)]
enum Lowered {
    Var(usize),
    Literal(C64),
    Unary(fn(C64) -> C64, Box<Lowered>),
    Binary(fn(C64, C64) -> C64, Box<Lowered>, Box<Lowered>),
}

impl Lowered {
    fn eval(&self, vars: &[C64]) -> C64 {
        match self {
            Lowered::Var(i) => vars[*i],
            Lowered::Literal(v) => *v,
            Lowered::Unary(f, a) => f(a.eval(vars)),
            Lowered::Binary(f, a, b) => f(a.eval(vars), b.eval(vars)),
        }
    }
}

fn walk(
    tree: &Node,
    declared: &[&str],
    catalog: &Catalog,
    used: &mut BTreeSet<&'static str>,
) -> Result<(String, Lowered), CompileError> {
    match tree {
        Node::Symbol(name) => {
            if let Some(constant) = catalog.constant(name) {
                return Ok((
                    constant.literal.to_string(),
                    Lowered::Literal(constant.value),
                ));
            }
            match declared.iter().position(|v| *v == name.as_str()) {
                Some(slot) => Ok((name.clone(), Lowered::Var(slot))),
                None => Err(CompileError::UnboundSymbol(name.clone())),
            }
        }
        Node::Constant(v) => Ok((
            format!("vec2({:?}, 0.0)", v),
            Lowered::Literal(C64::new(*v, 0.0)),
        )),
        Node::Group(inner) => walk(inner, declared, catalog, used),
        Node::Call { op, args } => {
            let entry = catalog
                .lookup(op, args.len())
                .ok_or_else(|| CompileError::UnknownOperator {
                    name: op.clone(),
                    arity: args.len(),
                })?;
            let mut texts = Vec::with_capacity(args.len());
            let mut lowered = Vec::with_capacity(args.len());
            for arg in args {
                let (text, low) = walk(arg, declared, catalog, used)?;
                texts.push(text);
                lowered.push(Box::new(low));
            }
            used.insert(entry.name());
            let text = format!("c_{}({})", entry.name(), texts.join(","));
            let mut lowered = lowered.into_iter();
            let low = match (entry.formula(), lowered.next(), lowered.next()) {
                (Formula::Unary(f), Some(a), None) => Lowered::Unary(f, a),
                (Formula::Binary(f), Some(a), Some(b)) => Lowered::Binary(f, a, b),
                _ => unreachable!("catalog lookup already matched the arity"),
            };
            Ok((text, low))
        }
    }
}

/// Compiles a tree into a kernel expression fragment.  The fragment
/// refers to the declared variables by name and to catalog entries as
/// `c_<name>`; it is only runnable once those entries are in scope,
/// which is what [`Kernel::build`] arranges.
pub fn compile(tree: &Node, declared: &[&str]) -> Result<String, CompileError> {
    let mut used = BTreeSet::new();
    walk(tree, declared, Catalog::standard(), &mut used).map(|(text, _)| text)
}

/// Same validation as [`compile`], but produces something the CPU
/// dispatcher can evaluate instead of text.
pub fn lower(tree: &Node, declared: &[&str]) -> Result<Program, CompileError> {
    Program::new("f", declared, tree)
}

/// One entry point of a kernel, ready to evaluate.
#[derive(Clone, Debug)]
pub struct Program {
    name: String,
    params: Vec<String>,
    text: String,
    root: Lowered,
}

impl Program {
    /// Compiles `tree` as the body of an entry point named `name`
    /// taking `params`.
    pub fn new(name: &str, params: &[&str], tree: &Node) -> Result<Program, CompileError> {
        let (program, _) = Program::with_operators(name, params, tree)?;
        Ok(program)
    }

    fn with_operators(
        name: &str,
        params: &[&str],
        tree: &Node,
    ) -> Result<(Program, BTreeSet<&'static str>), CompileError> {
        let mut used = BTreeSet::new();
        let (text, root) = walk(tree, params, Catalog::standard(), &mut used)?;
        let program = Program {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            text,
            root,
        };
        Ok((program, used))
    }

    /// The entry point's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments the entry point takes.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// The compiled expression fragment.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The GLSL definition of the entry point.
    pub fn definition(&self) -> String {
        let params: Vec<String> = self.params.iter().map(|p| format!("vec2 {}", p)).collect();
        format!(
            "vec2 {}({}) {{ return {}; }}",
            self.name,
            params.join(", "),
            self.text
        )
    }

    /// Evaluates with arguments in declaration order.
    #[inline]
    pub fn eval(&self, args: &[C64]) -> C64 {
        self.root.eval(args)
    }
}

/// Assembled kernel source plus its evaluable entry points.
#[derive(Clone, Debug)]
pub struct Kernel {
    source: String,
    entries: Vec<Program>,
}

impl Kernel {
    /// Compiles every `(name, params, tree)` triple and prefixes the
    /// catalog entries they need, in dependency order.  Any failure
    /// aborts the whole kernel.
    pub fn build(functions: &[(&str, &[&str], &Node)]) -> Result<Kernel, CompileError> {
        let mut used: BTreeSet<&'static str> = BTreeSet::new();
        let mut entries = Vec::with_capacity(functions.len());
        for (name, params, tree) in functions {
            let (program, ops) = Program::with_operators(name, params, tree)?;
            used.extend(ops);
            entries.push(program);
        }

        let preamble = Catalog::standard().emission_order(used.iter().cloned());
        debug!(
            "kernel preamble: {:?}",
            preamble.iter().map(|e| e.name()).collect::<Vec<_>>()
        );

        let mut source = String::new();
        for entry in &preamble {
            source.push_str(&entry.definition());
            source.push('\n');
        }
        for program in &entries {
            source.push_str(&program.definition());
            source.push('\n');
        }
        Ok(Kernel { source, entries })
    }

    /// Parses and builds a single-entry kernel.
    pub fn single(name: &str, params: &[&str], source: &str) -> Result<Kernel, CompileError> {
        let tree = Node::parse(source)?;
        Kernel::build(&[(name, params, &tree)])
    }

    /// The `f(z)`/`df(z)` pair Newton's method needs.
    pub fn newton(f: &str, df: &str) -> Result<Kernel, CompileError> {
        let f = Node::parse(f)?;
        let df = Node::parse(df)?;
        let params: &[&str] = &["z"];
        Kernel::build(&[("f", params, &f), ("df", params, &df)])
    }

    /// An iteration map `f(z, c)` for escape-time rendering.
    pub fn iteration(map: &str) -> Result<Kernel, CompileError> {
        Kernel::single("f", &["z", "c"], map)
    }

    /// The full GLSL text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// An entry point by name.
    pub fn entry(&self, name: &str) -> Option<&Program> {
        self.entries.iter().find(|p| p.name == name)
    }

    /// An entry point by name, insisting on its arity.  Engines use
    /// this to check a kernel before dispatching anything.
    pub fn require(&self, name: &str, arity: usize) -> Result<&Program, CompileError> {
        self.entry(name)
            .filter(|p| p.arity() == arity)
            .ok_or_else(|| CompileError::UnknownOperator {
                name: name.to_string(),
                arity,
            })
    }
}
