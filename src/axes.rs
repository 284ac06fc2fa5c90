// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Coordinate axes drawn over a rendered image: both axes from -1.1 to
//! 1.1 with an arrow head at the positive end and a tick every 0.1.

use image::RgbImage;
use num::Complex;

use crate::color::{to_rgb, Color};
use crate::planes::ComplexPlane;

const LENGTH: f64 = 1.1;
const ARROW: f64 = 0.05;
const TICK: f64 = 0.025;

/// Line segments, in plane coordinates, making up both axes.
pub fn segments() -> Vec<(Complex<f64>, Complex<f64>)> {
    let c = Complex::new;
    let mut lines = vec![
        (c(-LENGTH, 0.0), c(LENGTH, 0.0)),
        (c(LENGTH, 0.0), c(LENGTH - ARROW, ARROW)),
        (c(LENGTH, 0.0), c(LENGTH - ARROW, -ARROW)),
    ];
    for i in -10..=10 {
        let x = f64::from(i) / 10.0;
        lines.push((c(x, 0.0), c(x, -TICK)));
    }
    // The imaginary axis is the real one mirrored across re = im.
    let flipped: Vec<_> = lines
        .iter()
        .map(|(a, b)| (c(a.im, a.re), c(b.im, b.re)))
        .collect();
    lines.extend(flipped);
    lines
}

/// Draws the axes into `target` using the plane's mapping.
pub fn draw(target: &mut RgbImage, plane: &ComplexPlane, color: Color) {
    let pixel = to_rgb(color);
    let (w, h) = (target.width() as i64, target.height() as i64);
    for (a, b) in segments() {
        let (x0, y0) = plane.point_to_screen(&a);
        let (x1, y1) = plane.point_to_screen(&b);
        let n = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as usize;
        // Never walk further than the viewport diagonal, however far
        // the view is zoomed in.
        let n = n.min(((w + h) * 2) as usize);
        for s in 0..=n {
            let t = s as f64 / n as f64;
            let x = (x0 + (x1 - x0) * t).floor();
            let y = (y0 + (y1 - y0) * t).floor();
            if x >= 0.0 && y >= 0.0 && (x as i64) < w && (y as i64) < h {
                target.put_pixel(x as u32, y as u32, pixel);
            }
        }
    }
}
