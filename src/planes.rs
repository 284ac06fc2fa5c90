// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the ComplexPlane struct, which describes a relationship
//! between a rectangle of pixels with an origin at the upper left, and
//! a window onto the complex plane described by its center and the
//! extent visible along the shorter side of the viewport.
use num::Complex;

use crate::error::ViewError;

/// Describes the column, row of a pixel in the viewport.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// Describes the width and height of the viewport in pixels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// The affine map between viewport pixels and complex numbers.  Every
/// kernel queries it once per pixel.  Pixel centers are sampled, so a
/// viewport with odd dimensions has a pixel exactly on `center`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ComplexPlane {
    /// The viewport size in pixels.
    pub integral_plane: IntegralPlane,
    center: Complex<f64>,
    zoom: f64,
    // Complex units per pixel, derived from zoom and the shorter side.
    scale: f64,
}

impl ComplexPlane {
    /// A viewport of `width`x`height` pixels showing `zoom` units of
    /// the plane along its shorter side, centered on `center`.
    pub fn new(
        width: usize,
        height: usize,
        center: Complex<f64>,
        zoom: f64,
    ) -> Result<ComplexPlane, ViewError> {
        if width == 0 || height == 0 {
            return Err(ViewError::EmptyViewport(width, height));
        }
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(ViewError::BadZoom(zoom));
        }
        Ok(ComplexPlane {
            integral_plane: IntegralPlane(width, height),
            center,
            zoom,
            scale: zoom / (width.min(height) as f64),
        })
    }

    /// The same view on a viewport of a different size.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), ViewError> {
        *self = ComplexPlane::new(width, height, self.center, self.zoom)?;
        Ok(())
    }

    /// A different view on the same viewport.
    pub fn set_view(&mut self, center: Complex<f64>, zoom: f64) -> Result<(), ViewError> {
        *self = ComplexPlane::new(self.width(), self.height(), center, zoom)?;
        Ok(())
    }

    /// Viewport width in pixels.
    pub fn width(&self) -> usize {
        self.integral_plane.0
    }

    /// Viewport height in pixels.
    pub fn height(&self) -> usize {
        self.integral_plane.1
    }

    /// The point under the middle of the viewport.
    pub fn center(&self) -> Complex<f64> {
        self.center
    }

    /// Extent of the plane along the shorter side.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Complex units per pixel.
    pub fn scale_factor(&self) -> f64 {
        self.scale
    }

    /// The total number of pixels.  Used to size buffers.
    pub fn len(&self) -> usize {
        self.integral_plane.0 * self.integral_plane.1
    }

    /// A constructed plane always has pixels; kept for symmetry with
    /// `len`.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Given a pixel, return the complex number under its center.
    /// Rows grow downwards, the imaginary axis grows upwards.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex<f64> {
        let (w, h) = (self.width() as f64, self.height() as f64);
        Complex::new(
            self.center.re + self.scale * ((pixel.0 as f64) + 0.5 - w / 2.0),
            self.center.im + self.scale * (h / 2.0 - (pixel.1 as f64) - 0.5),
        )
    }

    /// The point under the pixel at a linear buffer offset.
    #[inline]
    pub fn offset_to_point(&self, offset: usize) -> Complex<f64> {
        let w = self.width();
        self.pixel_to_point(&Pixel(offset % w, offset / w))
    }

    /// Fractional viewport coordinates of a point; may lie outside the
    /// viewport.
    pub fn point_to_screen(&self, point: &Complex<f64>) -> (f64, f64) {
        let (w, h) = (self.width() as f64, self.height() as f64);
        (
            (point.re - self.center.re) / self.scale + w / 2.0,
            h / 2.0 - (point.im - self.center.im) / self.scale,
        )
    }

    /// Given a point, the pixel it falls in, if it is visible at all.
    pub fn point_to_pixel(&self, point: &Complex<f64>) -> Option<Pixel> {
        let (x, y) = self.point_to_screen(point);
        if !(x >= 0.0 && y >= 0.0) {
            return None;
        }
        let (x, y) = (x.floor() as usize, y.floor() as usize);
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(Pixel(x, y))
    }

    /// Like `point_to_pixel`, but returns the linear offset from the
    /// root of the image buffer in memory.
    pub fn point_to_offset(&self, point: &Complex<f64>) -> Option<usize> {
        self.point_to_pixel(point)
            .map(|p| p.1 * self.width() + p.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Complex<f64> {
        Complex::new(0.0, 0.0)
    }

    #[test]
    fn complexplane_fails_on_bad_shape() {
        assert_eq!(
            ComplexPlane::new(0, 4, origin(), 4.0),
            Err(ViewError::EmptyViewport(0, 4))
        );
        assert!(ComplexPlane::new(4, 4, origin(), 0.0).is_err());
        assert!(ComplexPlane::new(4, 4, origin(), -1.0).is_err());
        assert!(ComplexPlane::new(4, 4, origin(), std::f64::NAN).is_err());
    }

    #[test]
    fn complexplane_passes_on_good_shape() {
        let pm = ComplexPlane::new(4, 4, origin(), 4.0).unwrap();
        assert_eq!(pm.len(), 16);
        assert!(!pm.is_empty());
        assert_eq!(pm.scale_factor(), 1.0);
    }

    #[test]
    fn odd_viewports_have_a_pixel_on_the_center() {
        let pm = ComplexPlane::new(5, 5, origin(), 5.0).unwrap();
        assert_eq!(pm.pixel_to_point(&Pixel(2, 2)), origin());
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)), Complex::new(-2.0, 2.0));
        assert_eq!(pm.pixel_to_point(&Pixel(4, 4)), Complex::new(2.0, -2.0));
    }

    #[test]
    fn zoom_applies_to_the_shorter_side() {
        let pm = ComplexPlane::new(200, 100, Complex::new(1.0, 1.0), 2.0).unwrap();
        assert_eq!(pm.scale_factor(), 0.02);
        let left = pm.pixel_to_point(&Pixel(0, 50));
        let right = pm.pixel_to_point(&Pixel(199, 50));
        assert!((left.re - (1.0 - 1.99)).abs() < 1e-12);
        assert!((right.re - (1.0 + 1.99)).abs() < 1e-12);
    }

    #[test]
    fn point_to_pixel_round_trips_pixel_centers() {
        let pm = ComplexPlane::new(64, 48, Complex::new(-0.5, 0.25), 3.0).unwrap();
        for &(x, y) in &[(0, 0), (63, 47), (10, 40), (32, 24)] {
            let p = pm.pixel_to_point(&Pixel(x, y));
            assert_eq!(pm.point_to_pixel(&p), Some(Pixel(x, y)));
            assert_eq!(pm.point_to_offset(&p), Some(y * 64 + x));
        }
    }

    #[test]
    fn points_outside_the_viewport_have_no_pixel() {
        let pm = ComplexPlane::new(10, 10, origin(), 2.0).unwrap();
        assert_eq!(pm.point_to_pixel(&Complex::new(1.5, 0.0)), None);
        assert_eq!(pm.point_to_pixel(&Complex::new(0.0, -1.01)), None);
        assert_eq!(pm.point_to_pixel(&Complex::new(std::f64::NAN, 0.0)), None);
    }

    #[test]
    fn resize_keeps_the_view() {
        let mut pm = ComplexPlane::new(10, 10, Complex::new(0.3, 0.1), 2.0).unwrap();
        pm.resize(20, 40).unwrap();
        assert_eq!(pm.center(), Complex::new(0.3, 0.1));
        assert_eq!(pm.zoom(), 2.0);
        assert_eq!(pm.scale_factor(), 0.1);
        assert!(pm.resize(0, 0).is_err());
    }
}
