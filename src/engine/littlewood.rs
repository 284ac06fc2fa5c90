// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Roots of Littlewood polynomials, every polynomial whose
//! coefficients are all +1 or -1, refined all at once.
//!
//! A polynomial is identified by an integer.  Its highest set bit is a
//! sentinel; the bits below it are the coefficients, a one meaning +1
//! and a zero meaning -1, with the least significant bit holding the
//! leading coefficient.  So `0b111` is `z + 1` and `0b1101` is
//! `z^2 - z + 1`.
//!
//! Root estimates live in one flat table with `max_degree` slots per
//! polynomial.  Slot `k` of polynomial `id` is at address
//! `id * max_degree + k`, and a 2-D table of `width` columns puts that
//! at `(address / width, address % width)`.  Only slots below the
//! polynomial's degree mean anything; the rest are carried through
//! every pass untouched.

use image::RgbImage;
use itertools::iproduct;
use num::Complex;

use super::{fit, paint, Engine, Viewport};
use crate::axes;
use crate::buffer::DoubleBuffer;
use crate::catalog::C64;
use crate::color::{to_rgb, Color, ColorScheme};
use crate::dispatch::Dispatcher;
use crate::planes::ComplexPlane;

/// Slots per polynomial.
pub const MAX_DEGREE: usize = 16;

/// Columns of the root table.
pub const TABLE_WIDTH: usize = 2048;

/// Factor applied to the step size after every pass.
pub const STEP_DECAY: f64 = 0.999;

/// Initial estimates are drawn from `[-SEED_BOX, SEED_BOX]` squared.
pub const SEED_BOX: f64 = 2.0;

/// Zero-based degree of polynomial `id`: its bit length minus two.
/// Both 0 and 1 have degree -1.
#[inline]
pub fn degree(id: u32) -> i32 {
    (30 - id.leading_zeros() as i32).max(-1)
}

/// Value of polynomial `id` at `z`, by Horner's rule.
#[inline]
pub fn evaluate(id: u32, z: C64) -> C64 {
    let mut p = id;
    let mut r = Complex::new(0.0, 0.0);
    while p > 1 {
        r = r * z + if p & 1 == 1 { 1.0 } else { -1.0 };
        p >>= 1;
    }
    r
}

/// The shape of the root table.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Layout {
    /// Slots per polynomial.
    pub max_degree: usize,
    /// Columns of the 2-D table.
    pub width: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            max_degree: MAX_DEGREE,
            width: TABLE_WIDTH,
        }
    }
}

impl Layout {
    /// Number of polynomial ids, `2^(max_degree + 1)`.
    pub fn polynomials(&self) -> usize {
        1 << (self.max_degree + 1)
    }

    /// Number of slots.
    pub fn slots(&self) -> usize {
        self.polynomials() * self.max_degree
    }

    /// Rows of the 2-D table.
    pub fn height(&self) -> usize {
        (self.slots() + self.width - 1) / self.width
    }

    /// Flat address of root `k` of polynomial `id`.
    #[inline]
    pub fn address(&self, id: usize, k: usize) -> usize {
        id * self.max_degree + k
    }

    /// `(polynomial id, root index)` at a flat address.
    #[inline]
    pub fn split(&self, address: usize) -> (usize, usize) {
        (address / self.max_degree, address % self.max_degree)
    }

    /// `(row, column)` of a flat address.
    #[inline]
    pub fn coordinate(&self, address: usize) -> (usize, usize) {
        (address / self.width, address % self.width)
    }

    /// `(polynomial id, root index)` stored at `(row, column)`.
    pub fn decode(&self, row: usize, col: usize) -> (usize, usize) {
        self.split(row * self.width + col)
    }
}

fn lowbias32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

/// Initial estimate for the slot at `(row, col)` in a run seeded with
/// `seed`.  A pure function of its arguments.
pub fn seed_point(row: usize, col: usize, seed: u32) -> C64 {
    let h = lowbias32(col as u32 ^ lowbias32(row as u32 ^ lowbias32(seed)));
    let g = lowbias32(h ^ 0x9e37_79b9);
    let unit = |v: u32| f64::from(v) / f64::from(u32::max_value());
    Complex::new(
        SEED_BOX * (2.0 * unit(h) - 1.0),
        SEED_BOX * (2.0 * unit(g) - 1.0),
    )
}

/// Where roots of Littlewood polynomials may lie.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Region {
    /// Shown to hold no root of any ±1 polynomial.
    Excluded,
    /// The search could not rule it out.
    Possible,
}

#[derive(Copy, Clone)]
struct Item {
    value: C64,
    reach: f64,
    xn: C64,
}

const STACK_DEPTH: usize = 21;
const CERTAIN_RADIUS: f64 = 0.84089;

/// Tries to prove that no ±1 power series vanishes at `z`.  The search
/// branches on the sign of each successive term and prunes a partial
/// sum once it is further from zero than the remaining terms can
/// reach.  An empty stack is a proof; a deep one gives up.
pub fn proven_region(z: C64) -> Region {
    let mut z = z;
    let mut r = z.norm();
    // Roots come in reciprocal pairs.
    if r > 1.0 {
        z = z.inv();
        r = 1.0 / r;
    }
    if r > CERTAIN_RADIUS {
        return Region::Possible;
    }

    let one = Complex::new(1.0, 0.0);
    let mut stack = [Item {
        value: one,
        reach: r / (1.0 - r),
        xn: one,
    }; STACK_DEPTH];
    let mut head: i32 = 0;
    for _ in 0..100 {
        let top = stack[head as usize];
        let xn = top.xn * z;
        let reach = top.reach - xn.norm();
        let vp = top.value + xn;
        let vm = top.value - xn;
        let (rp, rm) = (vp.norm(), vm.norm());
        if rp < 1e-8 || rm < 1e-8 {
            break;
        }
        head -= 1;
        for &(value, radius) in &[(vp, rp), (vm, rm)] {
            if radius < reach {
                head += 1;
                stack[head as usize] = Item { value, reach, xn };
            }
        }
        if head >= 20 || head < 0 {
            break;
        }
    }
    if head < 0 {
        Region::Excluded
    } else {
        Region::Possible
    }
}

/// One Durand-Kerner correction of slot `k` of polynomial `id`.
/// Inert slots come back unchanged, as do updates that would leave the
/// plane.
fn refine(layout: &Layout, front: &[C64], address: usize, step: f64) -> C64 {
    let (id, k) = layout.split(address);
    let z = front[address];
    let d = degree(id as u32);
    if (k as i32) >= d {
        return z;
    }
    let base = layout.address(id, 0);
    let mut product = Complex::new(1.0, 0.0);
    for j in (0..d as usize).filter(|j| *j != k) {
        product = product * (z - front[base + j]);
    }
    let lead = if id & 1 == 1 { 1.0 } else { -1.0 };
    let next = z - evaluate(id as u32, z) * lead / product * step;
    if next.re.is_finite() && next.im.is_finite() {
        next
    } else {
        z
    }
}

/// The root tracker engine.
pub struct RootTracker {
    plane: ComplexPlane,
    layout: Layout,
    seed: u32,
    roots: DoubleBuffer<C64>,
    step: f64,
    passes: u64,
    proven: bool,
    draw_axes: bool,
    dispatcher: Dispatcher,
}

impl RootTracker {
    /// A tracker over the full table, seeded with `seed`.
    pub fn new(plane: ComplexPlane, seed: u32) -> RootTracker {
        RootTracker::with_layout(plane, seed, Layout::default())
    }

    /// A tracker over a table of a different shape.
    pub fn with_layout(plane: ComplexPlane, seed: u32, layout: Layout) -> RootTracker {
        let mut tracker = RootTracker {
            plane,
            layout,
            seed,
            roots: DoubleBuffer::new(layout.slots(), Complex::new(0.0, 0.0)),
            step: 1.0,
            passes: 0,
            proven: false,
            draw_axes: false,
            dispatcher: Dispatcher::default(),
        };
        tracker.reset();
        tracker
    }

    /// Runs passes on `dispatcher`.
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Paint the proven region behind the roots.
    pub fn set_proven(&mut self, proven: bool) {
        self.proven = proven;
    }

    /// Overlay the coordinate axes.
    pub fn set_draw_axes(&mut self, draw_axes: bool) {
        self.draw_axes = draw_axes;
    }

    /// Reseeds every slot and restores the full step size.
    pub fn reset(&mut self) {
        let (layout, seed) = (self.layout, self.seed);
        self.roots.initialize(&self.dispatcher, |address| {
            let (row, col) = layout.coordinate(address);
            seed_point(row, col, seed)
        });
        self.step = 1.0;
        self.passes = 0;
        debug!("root tracker: seeded {} slots with {}", layout.slots(), seed);
    }

    /// Reseeds with a different run seed.
    pub fn reseed(&mut self, seed: u32) {
        self.seed = seed;
        self.reset();
    }

    /// The table shape.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Every slot, meaningful or not.
    pub fn table(&self) -> &[C64] {
        self.roots.front()
    }

    /// Current estimates for the roots of polynomial `id`.
    pub fn roots_of(&self, id: usize) -> &[C64] {
        let d = degree(id as u32).max(0) as usize;
        let base = self.layout.address(id, 0);
        &self.roots.front()[base..base + d]
    }

    /// The step size the next pass will use.
    pub fn step_size(&self) -> f64 {
        self.step
    }

    /// Passes since the last reset.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Diameter in pixels of the points for roots of degree `d`.
    fn point_size(&self, d: usize) -> i64 {
        1 + (self.layout.max_degree.saturating_sub(d + 1) / 5) as i64
    }

    fn plot(&self, target: &mut RgbImage, point: C64, size: i64, color: Color) {
        let (x, y) = self.plane.point_to_screen(&point);
        let (w, h) = (i64::from(target.width()), i64::from(target.height()));
        let margin = size as f64;
        let on_screen = |v: f64, extent: i64| v >= -margin && v <= extent as f64 + margin;
        if !(on_screen(x, w) && on_screen(y, h)) {
            return;
        }
        let (x, y) = (x.floor() as i64 - size / 2, y.floor() as i64 - size / 2);
        let pixel = to_rgb(color);
        for (dx, dy) in iproduct!(0..size, 0..size) {
            let (px, py) = (x + dx, y + dy);
            if px >= 0 && py >= 0 && px < w && py < h {
                target.put_pixel(px as u32, py as u32, pixel);
            }
        }
    }
}

impl Viewport for RootTracker {
    fn viewport_mut(&mut self) -> &mut ComplexPlane {
        &mut self.plane
    }
}

impl Engine for RootTracker {
    fn name(&self) -> &'static str {
        "littlewood"
    }

    fn plane(&self) -> &ComplexPlane {
        &self.plane
    }

    fn advance(&mut self) {
        let (layout, step) = (self.layout, self.step);
        self.roots.pass(&self.dispatcher, |address, front| {
            refine(&layout, front, address, step)
        });
        self.step *= STEP_DECAY;
        self.passes += 1;
        trace!("{}: pass {}, step {}", self.name(), self.passes, self.step);
    }

    fn render(&mut self, target: &mut RgbImage, scheme: &ColorScheme) {
        if self.proven {
            let plane = &self.plane;
            paint(&self.dispatcher, plane, target, |offset| {
                match proven_region(plane.offset_to_point(offset)) {
                    Region::Excluded => scheme.negative(),
                    Region::Possible => scheme.axes(),
                }
            });
        } else {
            fit(&self.plane, target);
            let negative = to_rgb(scheme.negative());
            for pixel in target.pixels_mut() {
                *pixel = negative;
            }
        }

        // Dense high degrees first, so the sparse low-degree roots
        // stay visible on top.
        let max = self.layout.max_degree;
        for d in (1..max).rev() {
            let color = scheme.sample(d as f64 / max as f64);
            let size = self.point_size(d);
            let first = 1usize << (d + 1);
            let last = (1usize << (d + 2)).min(self.layout.polynomials());
            for id in first..last {
                for root in self.roots_of(id) {
                    self.plot(target, *root, size, color);
                }
            }
        }

        if self.draw_axes {
            axes::draw(target, &self.plane, scheme.axes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Layout {
        Layout {
            max_degree: 4,
            width: 16,
        }
    }

    fn plane() -> ComplexPlane {
        ComplexPlane::new(64, 64, Complex::new(0.0, 0.0), 4.0).unwrap()
    }

    fn tracker(seed: u32) -> RootTracker {
        RootTracker::with_layout(plane(), seed, small()).with_dispatcher(Dispatcher::new(3))
    }

    #[test]
    fn degrees() {
        assert_eq!(degree(0), -1);
        assert_eq!(degree(1), -1);
        assert_eq!(degree(2), 0);
        assert_eq!(degree(3), 0);
        assert_eq!(degree(7), 1);
        assert_eq!(degree(13), 2);
        assert_eq!(degree((1 << 17) - 1), 15);
        assert_eq!(degree(1 << 16), 15);
        assert_eq!(degree(1 << 15), 14);
    }

    #[test]
    fn horner_order_puts_the_leading_coefficient_in_the_low_bit() {
        let z = Complex::new(0.5, -1.5);
        assert_eq!(evaluate(7, z), z + 1.0);
        assert_eq!(evaluate(13, z), z * z - z + 1.0);
        // 0b1010: sentinel, then 0, 1, 0 from the top: -z^2 + z - 1.
        assert_eq!(evaluate(10, z), (-(z * z) + z) - 1.0);
        assert_eq!(evaluate(1, z), Complex::new(0.0, 0.0));
    }

    #[test]
    fn slot_addressing_is_a_bijection() {
        let layout = Layout::default();
        let mut seen = vec![false; layout.slots()];
        for id in 0..(1 << MAX_DEGREE) {
            for k in 0..MAX_DEGREE {
                let address = layout.address(id, k);
                let (row, col) = layout.coordinate(address);
                assert!(row < layout.height() && col < layout.width);
                assert_eq!(layout.decode(row, col), (id, k));
                assert!(!seen[address]);
                seen[address] = true;
            }
        }
    }

    #[test]
    fn default_table_shape() {
        let layout = Layout::default();
        assert_eq!(layout.polynomials(), 1 << 17);
        assert_eq!(layout.slots(), (1 << 17) * 16);
        assert_eq!(layout.height(), 1024);
    }

    #[test]
    fn seeding_is_deterministic_and_bounded() {
        let a = tracker(42);
        let b = tracker(42);
        let c = tracker(43);
        assert_eq!(a.table(), b.table());
        assert_ne!(a.table(), c.table());
        for z in a.table() {
            assert!(z.re.abs() <= SEED_BOX && z.im.abs() <= SEED_BOX);
        }
        assert_eq!(seed_point(3, 5, 9), seed_point(3, 5, 9));
        assert_ne!(seed_point(3, 5, 9), seed_point(5, 3, 9));
    }

    #[test]
    fn inert_slots_are_carried_through() {
        let mut t = tracker(7);
        let before = t.table().to_vec();
        for _ in 0..5 {
            t.advance();
        }
        let layout = t.layout();
        for (address, (old, new)) in before.iter().zip(t.table()).enumerate() {
            let (id, k) = layout.split(address);
            if k as i32 >= degree(id as u32) {
                assert_eq!(old, new, "slot {} of {}", k, id);
            }
        }
        assert!(before.iter().zip(t.table()).any(|(a, b)| a != b));
    }

    #[test]
    fn a_linear_polynomial_is_solved_in_one_pass() {
        let mut t = tracker(1);
        t.advance();
        assert_eq!(t.roots_of(7).len(), 1);
        assert!((t.roots_of(7)[0] - Complex::new(-1.0, 0.0)).norm() < 1e-12);
        // 0b110 is -z + 1.
        assert!((t.roots_of(6)[0] - Complex::new(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn quadratic_roots_converge() {
        let mut t = tracker(5);
        for _ in 0..300 {
            t.advance();
        }
        let s = 3f64.sqrt() / 2.0;
        let expected = [Complex::new(0.5, s), Complex::new(0.5, -s)];
        let roots = t.roots_of(13);
        assert_eq!(roots.len(), 2);
        for want in expected.iter() {
            assert!(
                roots.iter().any(|r| (r - want).norm() < 1e-6),
                "{} not among {:?}",
                want,
                roots
            );
        }
    }

    #[test]
    fn coincident_estimates_stay_put() {
        let mut t = tracker(2);
        let layout = t.layout();
        let w = Complex::new(0.25, 0.5);
        t.roots.initialize(&t.dispatcher, |address| {
            let (row, col) = layout.coordinate(address);
            match layout.split(address) {
                (13, _) => w,
                _ => seed_point(row, col, 2),
            }
        });
        t.advance();
        assert_eq!(t.roots_of(13), &[w, w][..]);
        assert!((t.roots_of(7)[0] - Complex::new(-1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn roots_far_off_screen_are_skipped() {
        let scheme = ColorScheme::default();
        let negative = to_rgb(scheme.negative());
        let views = [
            (Complex::new(0.0, 0.0), 1e-18),
            (Complex::new(1e300, -1e300), 1.0),
        ];
        for (center, zoom) in views.iter() {
            let plane = ComplexPlane::new(64, 64, *center, *zoom).unwrap();
            let mut t = RootTracker::with_layout(plane, 4, small());
            t.advance();
            let mut img = RgbImage::new(64, 64);
            t.render(&mut img, &scheme);
            assert!(img.pixels().all(|p| *p == negative), "zoom {}", zoom);
        }
    }

    #[test]
    fn the_step_size_decays_and_reset_restores_it() {
        let mut t = tracker(0);
        t.advance();
        t.advance();
        assert!((t.step_size() - STEP_DECAY * STEP_DECAY).abs() < 1e-15);
        assert_eq!(t.passes(), 2);
        let seeded = RootTracker::with_layout(plane(), 0, small());
        t.reset();
        assert_eq!(t.step_size(), 1.0);
        assert_eq!(t.passes(), 0);
        assert_eq!(t.table(), seeded.table());
    }

    #[test]
    fn a_view_change_keeps_the_estimates() {
        let mut t = tracker(3);
        t.advance();
        let before = t.table().to_vec();
        t.set_view(Complex::new(0.5, 0.5), 1.0).unwrap();
        assert_eq!(t.table(), &before[..]);
    }

    #[test]
    fn proven_region_backdrop() {
        use super::proven_region as region;
        assert_eq!(region(Complex::new(0.0, 0.0)), Region::Excluded);
        assert_eq!(region(Complex::new(0.3, 0.1)), Region::Excluded);
        assert_eq!(region(Complex::new(3.0, -1.0)), Region::Excluded);
        assert_eq!(region(Complex::new(-1.0, 0.0)), Region::Possible);
        assert_eq!(region(Complex::new(0.0, 0.9)), Region::Possible);
    }

    #[test]
    fn render_draws_roots_over_the_backdrop() {
        // Shifted by half a pixel so -1 lands inside pixel (15, 31).
        let plane = ComplexPlane::new(64, 64, Complex::new(1.0 / 32.0, -1.0 / 32.0), 4.0).unwrap();
        let mut t = RootTracker::with_layout(plane, 11, small());
        t.advance();
        let scheme = ColorScheme::named("UGent").unwrap();
        let mut img = RgbImage::new(2, 2);
        t.render(&mut img, &scheme);
        assert_eq!(img.dimensions(), (64, 64));
        assert_eq!(*img.get_pixel(15, 31), to_rgb(scheme.sample(1.0 / 4.0)));
    }

    #[test]
    fn render_paints_the_proven_region() {
        // One slot per polynomial tracks nothing, leaving only the
        // backdrop.
        let layout = Layout {
            max_degree: 1,
            width: 4,
        };
        let mut t = RootTracker::with_layout(plane(), 0, layout);
        t.set_proven(true);
        let scheme = ColorScheme::default();
        let mut img = RgbImage::new(64, 64);
        t.render(&mut img, &scheme);
        let p = t.plane().pixel_to_point(&crate::planes::Pixel(32, 32));
        assert_eq!(region_color(&scheme, p), to_rgb(scheme.negative()));
        assert_eq!(*img.get_pixel(32, 32), to_rgb(scheme.negative()));
        assert_eq!(*img.get_pixel(16, 31), to_rgb(scheme.axes()));
    }

    fn region_color(scheme: &ColorScheme, z: C64) -> image::Rgb<u8> {
        match super::proven_region(z) {
            Region::Excluded => to_rgb(scheme.negative()),
            Region::Possible => to_rgb(scheme.axes()),
        }
    }
}
