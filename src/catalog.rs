// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The fixed library of complex operations a kernel may use.
//!
//! Every entry carries two renditions of the same formula: the GLSL
//! body that ends up in generated kernel text, and a plain Rust
//! function the CPU dispatcher evaluates.  Entries may call each
//! other in their GLSL bodies; the order in which they must be
//! emitted is recovered by scanning each body for `c_<name>(`
//! references, never by hand.

use num::Complex;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts;

/// The only number type the kernels know about.
pub type C64 = Complex<f64>;

/// The two shapes a catalog operation can have.
#[derive(Copy, Clone)]
pub enum Formula {
    /// `c_name(vec2 a)`
    Unary(fn(C64) -> C64),
    /// `c_name(vec2 a, vec2 b)`
    Binary(fn(C64, C64) -> C64),
}

impl Formula {
    /// Number of arguments the operation consumes.
    pub fn arity(&self) -> usize {
        match self {
            Formula::Unary(_) => 1,
            Formula::Binary(_) => 2,
        }
    }
}

/// One named operation.
pub struct Entry {
    name: &'static str,
    body: String,
    formula: Formula,
    dependencies: Vec<&'static str>,
}

impl Entry {
    /// The catalog name, which is also the suffix of the GLSL
    /// function `c_<name>`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of arguments.
    pub fn arity(&self) -> usize {
        self.formula.arity()
    }

    /// The GLSL statement list between the braces.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Catalog entries this entry's body calls directly.
    pub fn dependencies(&self) -> &[&'static str] {
        &self.dependencies
    }

    /// The complete GLSL function definition.
    pub fn definition(&self) -> String {
        let params = match self.formula {
            Formula::Unary(_) => "vec2 a",
            Formula::Binary(_) => "vec2 a, vec2 b",
        };
        format!("vec2 c_{}({}){{ {} }}", self.name, params, self.body)
    }

    /// Evaluates the operation on the CPU.  The caller guarantees
    /// `args.len() == self.arity()`; the lowering pass checks it once
    /// so the hot loop does not have to.
    #[inline]
    pub fn apply(&self, args: &[C64]) -> C64 {
        match self.formula {
            Formula::Unary(f) => f(args[0]),
            Formula::Binary(f) => f(args[0], args[1]),
        }
    }

    /// Direct access to the formula, used when lowering expressions.
    pub fn formula(&self) -> Formula {
        self.formula
    }
}

/// A named constant.  Constants are substituted as literals, they are
/// never looked up at run time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Constant {
    /// The name as typed by the user.
    pub name: &'static str,
    /// The value used on the CPU.
    pub value: C64,
    /// The literal spliced into kernel text.
    pub literal: &'static str,
}

const CONSTANTS: [Constant; 4] = [
    Constant {
        name: "i",
        value: C64 { re: 0.0, im: 1.0 },
        literal: "vec2(0.0, 1.0)",
    },
    Constant {
        name: "e",
        value: C64 {
            re: consts::E,
            im: 0.0,
        },
        literal: "vec2(2.718281828459045, 0.0)",
    },
    Constant {
        name: "pi",
        value: C64 {
            re: consts::PI,
            im: 0.0,
        },
        literal: "vec2(3.141592653589793, 0.0)",
    },
    Constant {
        name: "phi",
        value: C64 {
            re: 1.618_033_988_749_895,
            im: 0.0,
        },
        literal: "vec2(1.618033988749895, 0.0)",
    },
];

// CPU renditions.  They follow the GLSL bodies below term for term so
// that both back ends agree on branch cuts and overflow behaviour.

fn dot(a: C64) -> f64 {
    a.re * a.re + a.im * a.im
}

fn add(a: C64, b: C64) -> C64 {
    a + b
}

fn subtract(a: C64, b: C64) -> C64 {
    a - b
}

fn multiply(a: C64, b: C64) -> C64 {
    C64::new(a.re * b.re - a.im * b.im, a.re * b.im + a.im * b.re)
}

fn divide(a: C64, b: C64) -> C64 {
    let n = dot(b);
    C64::new(
        (a.re * b.re + a.im * b.im) / n,
        (a.im * b.re - a.re * b.im) / n,
    )
}

fn pow(a: C64, b: C64) -> C64 {
    exp(multiply(b, log(a)))
}

fn inverse(a: C64) -> C64 {
    let n = dot(a);
    C64::new(a.re / n, -a.im / n)
}

fn negate(a: C64) -> C64 {
    -a
}

fn multiply_i(a: C64) -> C64 {
    C64::new(-a.im, a.re)
}

fn log(a: C64) -> C64 {
    C64::new(a.re.hypot(a.im).ln(), a.im.atan2(a.re))
}

fn exp(a: C64) -> C64 {
    let m = a.re.exp();
    C64::new(m * a.im.cos(), m * a.im.sin())
}

fn sinh(a: C64) -> C64 {
    let epa = exp(a);
    (epa - inverse(epa)) * 0.5
}

fn cosh(a: C64) -> C64 {
    let epa = exp(a);
    (epa + inverse(epa)) * 0.5
}

fn tanh(a: C64) -> C64 {
    let epa = exp(a);
    let ema = inverse(epa);
    divide(epa - ema, epa + ema)
}

fn sin(a: C64) -> C64 {
    -multiply_i(sinh(multiply_i(a)))
}

fn cos(a: C64) -> C64 {
    cosh(multiply_i(a))
}

fn tan(a: C64) -> C64 {
    -multiply_i(tanh(multiply_i(a)))
}

fn sqrt(a: C64) -> C64 {
    exp(log(a) * 0.5)
}

fn cbrt(a: C64) -> C64 {
    exp(log(a) / 3.0)
}

fn csc(a: C64) -> C64 {
    inverse(sin(a))
}

fn sec(a: C64) -> C64 {
    inverse(cos(a))
}

fn cot(a: C64) -> C64 {
    inverse(tan(a))
}

fn csch(a: C64) -> C64 {
    inverse(sinh(a))
}

fn sech(a: C64) -> C64 {
    inverse(cosh(a))
}

fn coth(a: C64) -> C64 {
    inverse(tanh(a))
}

/// The registry.  Built once; immutable afterwards.
pub struct Catalog {
    entries: BTreeMap<&'static str, Entry>,
}

static STANDARD: Lazy<Catalog> = Lazy::new(Catalog::build);

impl Catalog {
    /// The one catalog every kernel is compiled against.
    pub fn standard() -> &'static Catalog {
        &STANDARD
    }

    fn build() -> Catalog {
        let mut raw: Vec<(&'static str, String, Formula)> = vec![
            ("add", "return a + b;".into(), Formula::Binary(add)),
            ("subtract", "return a - b;".into(), Formula::Binary(subtract)),
            (
                "multiply",
                "return vec2(a.x*b.x-a.y*b.y, a.x*b.y+a.y*b.x);".into(),
                Formula::Binary(multiply),
            ),
            (
                "divide",
                "return vec2(a.x * b.x + a.y * b.y, a.y * b.x - a.x * b.y) / dot(b, b);".into(),
                Formula::Binary(divide),
            ),
            (
                "pow",
                "return c_exp(c_multiply(b, c_log(a)));".into(),
                Formula::Binary(pow),
            ),
            (
                "inverse",
                "return vec2(a.x, -a.y)/dot(a, a);".into(),
                Formula::Unary(inverse),
            ),
            ("negate", "return -a;".into(), Formula::Unary(negate)),
            (
                "multiply_i",
                "return vec2(-a.y, a.x);".into(),
                Formula::Unary(multiply_i),
            ),
            (
                "log",
                "return vec2(log(length(a)), atan(a.y, a.x));".into(),
                Formula::Unary(log),
            ),
            (
                "exp",
                "return exp(a.x)*vec2(cos(a.y), sin(a.y));".into(),
                Formula::Unary(exp),
            ),
            (
                "sinh",
                "vec2 epa = c_exp(a); return .5 * (epa - c_inverse(epa));".into(),
                Formula::Unary(sinh),
            ),
            (
                "cosh",
                "vec2 epa = c_exp(a); return .5 * (epa + c_inverse(epa));".into(),
                Formula::Unary(cosh),
            ),
            (
                "tanh",
                concat!(
                    "vec2 epa = c_exp(a); vec2 ema = c_inverse(epa); ",
                    "return c_divide(epa - ema, epa + ema);"
                )
                .into(),
                Formula::Unary(tanh),
            ),
            (
                "sin",
                "return -c_multiply_i(c_sinh(c_multiply_i(a)));".into(),
                Formula::Unary(sin),
            ),
            (
                "cos",
                "return c_cosh(c_multiply_i(a));".into(),
                Formula::Unary(cos),
            ),
            (
                "tan",
                "return -c_multiply_i(c_tanh(c_multiply_i(a)));".into(),
                Formula::Unary(tan),
            ),
            (
                "sqrt",
                "return c_exp(0.5*c_log(a));".into(),
                Formula::Unary(sqrt),
            ),
            (
                "cbrt",
                "return c_exp(c_log(a) / 3.0);".into(),
                Formula::Unary(cbrt),
            ),
        ];

        type Cofunction = (
            &'static str,
            &'static str,
            &'static str,
            fn(C64) -> C64,
            fn(C64) -> C64,
        );
        let cofunctions: [Cofunction; 3] = [
            ("sin", "csc", "csch", csc, csch),
            ("cos", "sec", "sech", sec, sech),
            ("tan", "cot", "coth", cot, coth),
        ];
        for (base, co, co_h, f, f_h) in cofunctions.iter() {
            raw.push((*co, format!("return c_inverse(c_{}(a));", base), Formula::Unary(*f)));
            raw.push((
                *co_h,
                format!("return c_inverse(c_{}h(a));", base),
                Formula::Unary(*f_h),
            ));
        }

        let names: Vec<&'static str> = raw.iter().map(|(name, _, _)| *name).collect();
        let entries = raw
            .into_iter()
            .map(|(name, body, formula)| {
                let mut dependencies: Vec<&'static str> = names
                    .iter()
                    .cloned()
                    .filter(|other| *other != name && body.contains(&format!("c_{}(", other)))
                    .collect();
                dependencies.sort();
                (
                    name,
                    Entry {
                        name,
                        body,
                        formula,
                        dependencies,
                    },
                )
            })
            .collect();
        Catalog { entries }
    }

    /// Finds an operation by name and number of arguments.
    pub fn lookup(&self, name: &str, arity: usize) -> Option<&Entry> {
        self.entries.get(name).filter(|e| e.arity() == arity)
    }

    /// Finds a named constant.
    pub fn constant(&self, name: &str) -> Option<Constant> {
        CONSTANTS.iter().find(|c| c.name == name).cloned()
    }

    /// All operation names, alphabetically.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().cloned()
    }

    /// Entries that directly reference `name` are emitted after it.
    pub fn dependencies(&self, name: &str) -> &[&'static str] {
        self.entries
            .get(name)
            .map(|e| e.dependencies())
            .unwrap_or(&[])
    }

    /// Every entry reachable from `roots`, each one placed after
    /// everything it calls.  Unknown names are skipped; the compiler
    /// has already rejected them.
    pub fn emission_order<'a, I>(&self, roots: I) -> Vec<&Entry>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut done: BTreeSet<&str> = BTreeSet::new();
        let mut order = vec![];
        for root in roots {
            self.visit(root, &mut done, &mut order);
        }
        order
    }

    fn visit<'s>(&'s self, name: &str, done: &mut BTreeSet<&'s str>, order: &mut Vec<&'s Entry>) {
        let entry = match self.entries.get(name) {
            Some(entry) => entry,
            None => return,
        };
        if !done.insert(entry.name) {
            return;
        }
        for dep in &entry.dependencies {
            self.visit(dep, done, order);
        }
        order.push(entry);
    }

    /// The definitions of the whole catalog, in a valid order.
    pub fn preamble(&self) -> String {
        self.emission_order(self.names())
            .iter()
            .map(|e| e.definition())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
