// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Color tables.
//!
//! A scheme is a cyclic sequence of stops plus two fallback colors:
//! `negative`, for pixels that never produced a value, and `axes`, for
//! decorations drawn over the image.  Kernels do not interpolate the
//! stops directly; they read a small sampled table, the same one a GPU
//! host would upload as a uniform array.

use failure::Fail;
use image::Rgb;
use once_cell::sync::OnceCell;
use rand::seq::SliceRandom;
use rand::Rng;

/// Linear RGB, each channel in `[0, 1]`.
pub type Color = [f32; 3];

/// Most stops a sampled table interpolates between.
pub const MAX_INTERPOLATION_STEPS: usize = 17;

const BLACK: Color = [0.0, 0.0, 0.0];
const WHITE: Color = [1.0, 1.0, 1.0];

/// Problems with user supplied palette data.
#[derive(Debug, Clone, PartialEq, Fail)]
pub enum PaletteError {
    /// Not a `#RRGGBB` color.
    #[fail(display = "Could not parse color '{}'", _0)]
    BadColor(String),
    /// A scheme needs at least one stop.
    #[fail(display = "A color scheme needs at least one color")]
    Empty,
}

/// Parses `#RRGGBB` or `RRGGBB`.
pub fn parse_color(text: &str) -> Result<Color, PaletteError> {
    let hex = text.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return Err(PaletteError::BadColor(text.to_string()));
    }
    u32::from_str_radix(hex, 16)
        .map(rgb)
        .map_err(|_| PaletteError::BadColor(text.to_string()))
}

/// Unpacks `0xRRGGBB`.
pub fn rgb(n: u32) -> Color {
    [
        ((n >> 16) & 0xff) as f32 / 255.0,
        ((n >> 8) & 0xff) as f32 / 255.0,
        (n & 0xff) as f32 / 255.0,
    ]
}

/// Mirrors a ramp so that it cycles smoothly: `a b c d` becomes
/// `a b c d c b`.
pub fn bidirectional(ramp: &[Color]) -> Vec<Color> {
    let mut out = ramp.to_vec();
    if ramp.len() > 2 {
        out.extend(ramp[1..ramp.len() - 1].iter().rev());
    }
    out
}

/// Linear interpolation, `t = 0` gives `a`.
pub fn mix(a: Color, b: Color, t: f32) -> Color {
    [
        a[0] * (1.0 - t) + b[0] * t,
        a[1] * (1.0 - t) + b[1] * t,
        a[2] * (1.0 - t) + b[2] * t,
    ]
}

/// Quantizes to 8-bit channels.
pub fn to_rgb(c: Color) -> Rgb<u8> {
    let q = |v: f32| (v.max(0.0).min(1.0) * 255.0).round() as u8;
    Rgb([q(c[0]), q(c[1]), q(c[2])])
}

/// An immutable color table.
#[derive(Clone, Debug)]
pub struct ColorScheme {
    name: String,
    steps: Vec<Color>,
    negative: Color,
    axes: Color,
    sampled: OnceCell<Vec<Color>>,
}

impl ColorScheme {
    /// Builds a scheme from its stops.
    pub fn new(
        name: &str,
        steps: Vec<Color>,
        negative: Color,
        axes: Color,
    ) -> Result<ColorScheme, PaletteError> {
        if steps.is_empty() {
            return Err(PaletteError::Empty);
        }
        Ok(ColorScheme {
            name: name.to_string(),
            steps,
            negative,
            axes,
            sampled: OnceCell::new(),
        })
    }

    /// Builds a scheme from `#RRGGBB` strings.
    pub fn from_hex(
        name: &str,
        steps: &[&str],
        negative: Option<&str>,
        axes: Option<&str>,
    ) -> Result<ColorScheme, PaletteError> {
        let steps = steps
            .iter()
            .map(|s| parse_color(s))
            .collect::<Result<Vec<_>, _>>()?;
        let negative = negative.map(parse_color).transpose()?.unwrap_or(BLACK);
        let axes = axes.map(parse_color).transpose()?.unwrap_or(WHITE);
        ColorScheme::new(name, steps, negative, axes)
    }

    /// The scheme's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stops, in order.
    pub fn steps(&self) -> &[Color] {
        &self.steps
    }

    /// Color for pixels that did not produce a value.
    pub fn negative(&self) -> Color {
        self.negative
    }

    /// Color for decorations.
    pub fn axes(&self) -> Color {
        self.axes
    }

    /// Cyclic piecewise-linear lookup: `get(0)`, `get(1)` and `get(n)`
    /// for any integer `n` all land on the first stop.
    pub fn get(&self, v: f64) -> Color {
        let n = self.steps.len();
        let v = (v * n as f64).rem_euclid(n as f64);
        let i = (v.floor() as usize) % n;
        let a = self.steps[i];
        let b = self.steps[(i + 1) % n];
        mix(a, b, (v - i as f64) as f32)
    }

    /// Number of intervals in the sampled table.
    pub fn interpolation_steps(&self) -> usize {
        self.steps.len().min(MAX_INTERPOLATION_STEPS)
    }

    /// `interpolation_steps() + 1` evenly spaced samples of `get`,
    /// computed on first use and kept.
    pub fn sampled(&self) -> &[Color] {
        self.sampled.get_or_init(|| {
            let k = self.interpolation_steps();
            (0..=k).map(|i| self.get(i as f64 / k as f64)).collect()
        })
    }

    /// The lookup kernels perform: negative values take the negative
    /// color, everything else wraps into the sampled table.
    pub fn sample(&self, v: f64) -> Color {
        if v < 0.0 || v.is_nan() {
            return self.negative;
        }
        let table = self.sampled();
        let k = self.interpolation_steps();
        let v = (v - v.floor()) * k as f64;
        let i = (v.floor() as usize).min(k - 1);
        mix(table[i], table[i + 1], (v - i as f64) as f32)
    }

    /// Names of the built-in schemes.
    pub fn names() -> &'static [&'static str] {
        &[
            "UGent",
            "Fluo",
            "Gray",
            "Hot and cold",
            "Soft rainbow",
            "Dracula",
            "Candy",
            "Christmas",
            "Autumn",
        ]
    }

    /// A built-in scheme by name, ignoring case.
    pub fn named(name: &str) -> Option<ColorScheme> {
        let canonical = ColorScheme::names()
            .iter()
            .find(|n| n.eq_ignore_ascii_case(name))?;
        let hex = |v: &[u32]| v.iter().cloned().map(rgb).collect::<Vec<_>>();
        let (steps, negative, axes) = match *canonical {
            "UGent" => (
                hex(&[0x1E64C8, 0x71A860, 0xFFD200, 0xF1A42B, 0xDC4E28, 0x825491]),
                BLACK,
                WHITE,
            ),
            "Fluo" => (
                hex(&[0xff7f00, 0x7fff00, 0x00ff7f, 0x007fff, 0x7f00ff, 0xff007f]),
                BLACK,
                WHITE,
            ),
            "Gray" => (hex(&[0xFFFFFF, 0x999999]), rgb(0x000000), rgb(0x777777)),
            "Hot and cold" => (
                bidirectional(&[
                    [0.229_805_7, 0.298_717_97, 0.753_683_15],
                    [0.865_395_2, 0.865_410_2, 0.865_395_56],
                    [0.705_673_16, 0.015_556_16, 0.150_232_81],
                ]),
                BLACK,
                WHITE,
            ),
            "Soft rainbow" => (
                hex(&[0x2EC7F1, 0x8669B4, 0xE43140, 0xF0D43A, 0x34C74C]),
                BLACK,
                WHITE,
            ),
            "Dracula" => (
                bidirectional(&hex(&[0x384259, 0xF73859, 0x7AC7C4, 0xC4EDDE])),
                BLACK,
                WHITE,
            ),
            "Candy" => (
                bidirectional(&hex(&[0x6092CA, 0x3FC1C9, 0xFCE38A, 0xFC5185])),
                BLACK,
                WHITE,
            ),
            "Christmas" => (
                bidirectional(&hex(&[0xFA4659, 0xFEFFE4, 0xA3DE83, 0x2EB872])),
                rgb(0x413131),
                WHITE,
            ),
            "Autumn" => (
                hex(&[
                    0x306BC5, 0x14a6a5, 0x59cf85, 0xD8E74A, 0xCCA940, 0xF3D89F, 0xA5D82D,
                    0x71CFC3,
                ]),
                BLACK,
                WHITE,
            ),
            _ => return None,
        };
        ColorScheme::new(canonical, steps, negative, axes).ok()
    }

    /// One of the built-in schemes, chosen by `rng`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> ColorScheme {
        let name = ColorScheme::names().choose(rng).unwrap_or(&"UGent");
        ColorScheme::named(name).unwrap_or_else(ColorScheme::default)
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        ColorScheme {
            name: "Gray".to_string(),
            steps: vec![rgb(0xFFFFFF), rgb(0x999999)],
            negative: rgb(0x000000),
            axes: rgb(0x777777),
            sampled: OnceCell::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn close(a: Color, b: Color) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn every_listed_name_has_its_own_palette() {
        let schemes: Vec<ColorScheme> = ColorScheme::names()
            .iter()
            .map(|name| ColorScheme::named(name).unwrap())
            .collect();
        for (i, a) in schemes.iter().enumerate() {
            assert!(ColorScheme::names()[i].eq_ignore_ascii_case(a.name()));
            for b in &schemes[i + 1..] {
                assert_ne!(a.steps(), b.steps(), "{} and {}", a.name(), b.name());
            }
        }
    }

    fn three() -> ColorScheme {
        ColorScheme::from_hex("rgb", &["#ff0000", "#00ff00", "#0000ff"], None, None).unwrap()
    }

    #[test]
    fn parses_hex() {
        assert_eq!(parse_color("#FF8000").unwrap(), [1.0, 128.0 / 255.0, 0.0]);
        assert_eq!(parse_color("00ff00").unwrap(), [0.0, 1.0, 0.0]);
        assert!(parse_color("#fff").is_err());
        assert!(parse_color("#gg0000").is_err());
    }

    #[test]
    fn get_is_cyclic() {
        let s = three();
        let n = s.steps().len() as f64;
        assert!(close(s.get(0.0), s.get(1.0)));
        assert!(close(s.get(0.0), s.get(n)));
        assert!(close(s.get(0.0), [1.0, 0.0, 0.0]));
        assert!(close(s.get(-1.0 / 3.0), s.get(2.0 / 3.0)));
    }

    #[test]
    fn get_is_continuous_across_stops() {
        let s = ColorScheme::named("Autumn").unwrap();
        let n = s.steps().len();
        for k in 0..=n {
            let at = k as f64 / n as f64;
            let before = s.get(at - 1e-9);
            let after = s.get(at + 1e-9);
            assert!(close(before, after), "jump at stop {}", k);
            assert!(close(s.get(at), s.steps()[k % n]));
        }
    }

    #[test]
    fn get_interpolates_between_stops() {
        let s = three();
        assert!(close(s.get(1.0 / 6.0), [0.5, 0.5, 0.0]));
        assert!(close(s.get(5.0 / 6.0), [0.5, 0.0, 0.5]));
    }

    #[test]
    fn sampled_table_is_memoized() {
        let s = three();
        let first = s.sampled().as_ptr();
        assert_eq!(s.sampled().len(), 4);
        assert_eq!(first, s.sampled().as_ptr());
        assert!(close(s.sampled()[0], s.sampled()[3]));
    }

    #[test]
    fn sampled_table_is_capped() {
        let steps: Vec<Color> = (0..40).map(|i| [i as f32 / 40.0, 0.0, 0.0]).collect();
        let s = ColorScheme::new("long", steps, BLACK, WHITE).unwrap();
        assert_eq!(s.interpolation_steps(), MAX_INTERPOLATION_STEPS);
        assert_eq!(s.sampled().len(), MAX_INTERPOLATION_STEPS + 1);
    }

    #[test]
    fn sample_uses_negative_for_negative_values() {
        let s = ColorScheme::named("christmas").unwrap();
        assert_eq!(s.sample(-1.0), rgb(0x413131));
        assert!(close(s.sample(0.0), s.sample(1.0)));
        assert!(close(s.sample(0.25), s.get(0.25)));
    }

    #[test]
    fn bidirectional_mirrors_the_middle() {
        let a = [rgb(1), rgb(2), rgb(3), rgb(4)];
        assert_eq!(
            bidirectional(&a),
            vec![rgb(1), rgb(2), rgb(3), rgb(4), rgb(3), rgb(2)]
        );
        assert_eq!(bidirectional(&a[..2]), a[..2].to_vec());
    }

    #[test]
    fn every_builtin_exists() {
        for name in ColorScheme::names() {
            let s = ColorScheme::named(name).unwrap();
            assert_eq!(s.name(), *name);
        }
        assert!(ColorScheme::named("nope").is_none());
        let mut rng = StdRng::seed_from_u64(3);
        let picked = ColorScheme::random(&mut rng);
        assert!(ColorScheme::names().iter().any(|n| *n == picked.name()));
    }

    #[test]
    fn empty_palettes_are_rejected() {
        assert_eq!(
            ColorScheme::from_hex("x", &[], None, None).unwrap_err(),
            PaletteError::Empty
        );
    }
}
