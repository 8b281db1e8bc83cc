//! Premultiplied-BGRA pixel buffer shared between the compositing, fill,
//! and gradient passes.

use image::RgbaImage;

use crate::color::Bgra;
use crate::geom::RectI;

/// A width x height row-major buffer of premultiplied [`Bgra`] pixels.
///
/// Coordinate access is bounds-checked and panics when out of range.
/// Straight-alpha RGBA image interop converts at the boundary so external
/// buffers never observe premultiplied channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<Bgra>,
}

impl Surface {
    /// Creates a fully transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Bgra::ZERO; width as usize * height as usize],
        }
    }

    /// Wraps an existing premultiplied pixel buffer.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Bgra>) -> Self {
        assert_eq!(
            pixels.len(),
            width as usize * height as usize,
            "pixel buffer does not match {width}x{height}"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    /// The full surface as a region of interest.
    pub const fn bounds(&self) -> RectI {
        RectI::new(0, 0, self.width as i32, self.height as i32)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel access out of range: ({x}, {y}) in {}x{} surface",
            self.width,
            self.height
        );
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Bgra {
        self.pixels[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, pixel: Bgra) {
        let i = self.index(x, y);
        self.pixels[i] = pixel;
    }

    pub fn row(&self, y: u32) -> &[Bgra] {
        assert!(y < self.height, "row {y} out of range");
        let w = self.width as usize;
        let start = y as usize * w;
        &self.pixels[start..start + w]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [Bgra] {
        assert!(y < self.height, "row {y} out of range");
        let w = self.width as usize;
        let start = y as usize * w;
        &mut self.pixels[start..start + w]
    }

    pub fn pixels(&self) -> &[Bgra] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Bgra] {
        &mut self.pixels
    }

    /// Raw little-endian B,G,R,A byte view.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.pixels)
    }

    /// Imports a straight-alpha RGBA image, premultiplying each pixel.
    pub fn from_rgba_image(image: &RgbaImage) -> Self {
        let pixels = image
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                Bgra::from_bgra(b, g, r, a).to_premultiplied()
            })
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            pixels,
        }
    }

    /// Exports to a straight-alpha RGBA image, unpremultiplying each pixel.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.width, self.height);
        for (src, dst) in self.pixels.iter().zip(out.pixels_mut()) {
            let straight = src.to_straight();
            dst.0 = [straight.r, straight.g, straight.b, straight.a];
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_surface_is_transparent() {
        let surface = Surface::new(3, 2);
        assert!(surface.pixels().iter().all(|&p| p == Bgra::ZERO));
        assert_eq!(surface.bounds(), RectI::new(0, 0, 3, 2));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn get_out_of_range_panics() {
        let surface = Surface::new(2, 2);
        let _ = surface.get(0, 2);
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn from_pixels_rejects_wrong_length() {
        let _ = Surface::from_pixels(2, 2, vec![Bgra::ZERO; 3]);
    }

    #[test]
    fn set_then_get() {
        let mut surface = Surface::new(4, 4);
        let p = Bgra::from_bgra(10, 20, 30, 200);
        surface.set(3, 1, p);
        assert_eq!(surface.get(3, 1), p);
        assert_eq!(surface.row(1)[3], p);
    }

    #[test]
    fn byte_view_matches_packing() {
        let mut surface = Surface::new(1, 1);
        surface.set(0, 0, Bgra::from_bgra(1, 2, 3, 4));
        assert_eq!(surface.as_bytes(), &[1u8, 2, 3, 4][..]);
    }

    #[test]
    fn rgba_image_round_trip_is_exact_at_full_alpha() {
        let mut image = RgbaImage::new(2, 2);
        image.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        image.put_pixel(1, 0, image::Rgba([0, 255, 0, 255]));
        image.put_pixel(0, 1, image::Rgba([12, 34, 56, 255]));
        image.put_pixel(1, 1, image::Rgba([0, 0, 0, 0]));

        let surface = Surface::from_rgba_image(&image);
        assert_eq!(surface.get(0, 0), Bgra::from_bgra(0, 0, 255, 255));

        let back = surface.to_rgba_image();
        for (x, y) in [(0, 0), (1, 0), (0, 1)] {
            assert_eq!(back.get_pixel(x, y), image.get_pixel(x, y), "({x}, {y})");
        }
        // The fully transparent pixel collapses to the zero pixel by design.
        assert_eq!(back.get_pixel(1, 1).0, [0, 0, 0, 0]);
    }
}
