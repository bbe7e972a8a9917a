use image::{imageops, Rgba, RgbaImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

use crate::error::{OverlayError, Result};
use crate::placement::Placement;

/// Opacity at or below which nothing is drawn.
pub const MIN_VISIBLE_OPACITY: f32 = 0.01;

/// アクセサリ画像を配置に従って描画するレンダラー
///
/// The image is centred on the placement's draw centre, rotated about it
/// and stretched to `width × height` with bilinear sampling, then
/// alpha-composited over the target with the given opacity.
pub struct OverlayRenderer {
    image: RgbaImage,
}

impl OverlayRenderer {
    pub fn new(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OverlayError::InvalidImage { width, height });
        }
        Ok(Self { image })
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// 画像の (幅, 高さ)
    pub fn image_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Redraws a live overlay layer: the target is cleared first, then the
    /// accessory is drawn if it is visible.
    pub fn render(&self, placement: Option<&Placement>, opacity: f32, target: &mut RgbaImage) {
        clear(target);
        if let Some(placement) = placement {
            if opacity > MIN_VISIBLE_OPACITY {
                self.draw(placement, opacity, target);
            }
        }
    }

    /// Composites onto a surface of a different resolution than the one the
    /// placement was computed for. Positions and sizes scale per axis; the
    /// angle does not. The target is not cleared.
    pub fn render_scaled(
        &self,
        placement: &Placement,
        opacity: f32,
        source_width: f32,
        source_height: f32,
        target: &mut RgbaImage,
    ) -> Result<()> {
        let (target_width, target_height) = target.dimensions();
        if !(source_width.is_finite() && source_width > 0.0 && source_height.is_finite() && source_height > 0.0)
            || target_width == 0
            || target_height == 0
        {
            return Err(OverlayError::InvalidGeometry {
                display_width: source_width,
                display_height: source_height,
                video_width: target_width as f32,
                video_height: target_height as f32,
            });
        }
        if opacity <= MIN_VISIBLE_OPACITY {
            return Ok(());
        }
        let scaled = placement.scaled(
            target_width as f32 / source_width,
            target_height as f32 / source_height,
        );
        self.draw(&scaled, opacity, target);
        Ok(())
    }

    fn draw(&self, placement: &Placement, opacity: f32, target: &mut RgbaImage) {
        let Placement { width, height, angle, .. } = *placement;
        if !(width.is_finite() && height.is_finite() && angle.is_finite()) || width <= 0.0 || height <= 0.0 {
            return;
        }
        let (cx, cy) = placement.draw_center();
        let (sin, cos) = angle.sin_cos();

        // 回転後の外接矩形だけをワープする
        let extent_x = (width * cos.abs() + height * sin.abs()) / 2.0;
        let extent_y = (width * sin.abs() + height * cos.abs()) / 2.0;
        let (target_width, target_height) = target.dimensions();
        let x0 = (cx - extent_x).floor().max(0.0) as u32;
        let y0 = (cy - extent_y).floor().max(0.0) as u32;
        let x1 = ((cx + extent_x).ceil().max(0.0) as u32).min(target_width);
        let y1 = ((cy + extent_y).ceil().max(0.0) as u32).min(target_height);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let (image_width, image_height) = self.image.dimensions();
        // pixel indices sit half a pixel inside their cell
        let projection = Projection::translate(cx - 0.5 - x0 as f32, cy - 0.5 - y0 as f32)
            * Projection::rotate(angle)
            * Projection::scale(width / image_width as f32, height / image_height as f32)
            * Projection::translate(
                0.5 - image_width as f32 / 2.0,
                0.5 - image_height as f32 / 2.0,
            );

        let mut layer = RgbaImage::new(x1 - x0, y1 - y0);
        warp_into(
            &self.image,
            &projection,
            Interpolation::Bilinear,
            Rgba([0, 0, 0, 0]),
            &mut layer,
        );

        let opacity = opacity.clamp(0.0, 1.0);
        if opacity < 1.0 {
            for pixel in layer.pixels_mut() {
                pixel[3] = (pixel[3] as f32 * opacity).round() as u8;
            }
        }
        imageops::overlay(target, &layer, x0 as i64, y0 as i64);
    }
}

/// Makes every pixel fully transparent.
pub fn clear(target: &mut RgbaImage) {
    for pixel in target.pixels_mut() {
        *pixel = Rgba([0, 0, 0, 0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn red_renderer() -> OverlayRenderer {
        OverlayRenderer::new(RgbaImage::from_pixel(10, 10, RED)).unwrap()
    }

    fn is_transparent(p: &Rgba<u8>) -> bool {
        p[3] == 0
    }

    fn near(p: &Rgba<u8>, expected: Rgba<u8>) -> bool {
        p.0.iter().zip(expected.0).all(|(&a, b)| (a as i32 - b as i32).abs() <= 2)
    }

    #[test]
    fn test_empty_image_rejected() {
        assert!(OverlayRenderer::new(RgbaImage::new(0, 10)).is_err());
    }

    #[test]
    fn test_none_clears_target() {
        let mut target = RgbaImage::from_pixel(20, 20, Rgba([0, 255, 0, 255]));
        red_renderer().render(None, 1.0, &mut target);
        assert!(target.pixels().all(is_transparent));
    }

    #[test]
    fn test_faint_opacity_draws_nothing() {
        let mut target = RgbaImage::new(100, 100);
        let p = Placement::new(50.0, 40.0, 20.0, 20.0, 0.0);
        red_renderer().render(Some(&p), 0.005, &mut target);
        assert!(target.pixels().all(is_transparent));
    }

    #[test]
    fn test_draws_below_anchor() {
        let mut target = RgbaImage::new(100, 100);
        // draw centre (50, 50), box 40..60
        let p = Placement::new(50.0, 40.0, 20.0, 20.0, 0.0);
        red_renderer().render(Some(&p), 1.0, &mut target);
        assert!(near(target.get_pixel(50, 50), RED), "{:?}", target.get_pixel(50, 50));
        assert!(near(target.get_pixel(42, 42), RED), "{:?}", target.get_pixel(42, 42));
        assert!(is_transparent(target.get_pixel(50, 35)));
        assert!(is_transparent(target.get_pixel(65, 50)));
    }

    #[test]
    fn test_opacity_scales_alpha() {
        let mut target = RgbaImage::new(100, 100);
        let p = Placement::new(50.0, 40.0, 20.0, 20.0, 0.0);
        red_renderer().render(Some(&p), 0.5, &mut target);
        let px = target.get_pixel(50, 50);
        assert!(px[0] >= 253);
        assert!((px[3] as i32 - 128).abs() <= 2, "alpha = {}", px[3]);
    }

    #[test]
    fn test_blend_over_opaque_background() {
        let mut target = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let p = Placement::new(50.0, 40.0, 20.0, 20.0, 0.0);
        red_renderer().render_scaled(&p, 0.5, 100.0, 100.0, &mut target).unwrap();
        let px = target.get_pixel(50, 50);
        assert!(px[0] >= 253);
        assert!((px[1] as i32 - 128).abs() <= 2, "g = {}", px[1]);
        assert_eq!(px[3], 255);
        // untouched outside the box
        assert_eq!(*target.get_pixel(5, 5), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_rotation_about_draw_center() {
        let mut target = RgbaImage::new(100, 100);
        // 40 wide, 10 tall, centred at (50, 50), rotated a quarter turn
        let p = Placement::new(50.0, 45.0, 40.0, 10.0, std::f32::consts::FRAC_PI_2);
        red_renderer().render(Some(&p), 1.0, &mut target);
        assert!(target.get_pixel(50, 35)[3] >= 253);
        assert!(is_transparent(target.get_pixel(35, 50)));
    }

    #[test]
    fn test_rotation_direction() {
        const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
        let asset = RgbaImage::from_fn(10, 10, |x, _| if x < 5 { RED } else { BLUE });
        let renderer = OverlayRenderer::new(asset).unwrap();
        let mut target = RgbaImage::new(100, 100);
        // y は下向き: 正の角度で画像の右側が下に来る
        let p = Placement::new(50.0, 30.0, 40.0, 40.0, std::f32::consts::FRAC_PI_2);
        renderer.render(Some(&p), 1.0, &mut target);
        assert!(near(target.get_pixel(50, 38), RED), "{:?}", target.get_pixel(50, 38));
        assert!(near(target.get_pixel(50, 62), BLUE), "{:?}", target.get_pixel(50, 62));
    }

    #[test]
    fn test_render_scaled_to_larger_buffer() {
        let mut target = RgbaImage::new(200, 200);
        let p = Placement::new(50.0, 40.0, 20.0, 20.0, 0.0);
        red_renderer().render_scaled(&p, 1.0, 100.0, 100.0, &mut target).unwrap();
        // box 80..120 in both axes
        assert!(near(target.get_pixel(100, 100), RED));
        assert!(near(target.get_pixel(82, 82), RED));
        assert!(is_transparent(target.get_pixel(100, 75)));
    }

    #[test]
    fn test_render_scaled_rejects_bad_source() {
        let mut target = RgbaImage::new(20, 20);
        let p = Placement::new(5.0, 5.0, 5.0, 5.0, 0.0);
        assert!(red_renderer().render_scaled(&p, 1.0, 0.0, 10.0, &mut target).is_err());
    }

    #[test]
    fn test_offscreen_placement_is_harmless() {
        let mut target = RgbaImage::new(50, 50);
        let p = Placement::new(-500.0, -500.0, 20.0, 20.0, 0.3);
        red_renderer().render(Some(&p), 1.0, &mut target);
        assert!(target.pixels().all(is_transparent));
    }
}
