//! Software rasteriser turning a [`Surface`] into pixels.

use image::{Rgba, RgbaImage};

use crate::{
    scene::{Group, Primitive, Surface, SurfaceEntry},
    Color,
};

/// Paints surfaces into RGBA images.
///
/// Polygons are filled with the even-odd rule sampled at pixel centres; no
/// anti-aliasing is attempted.
#[derive(Debug, Clone, Copy)]
pub struct Rasterizer {
    /// Edges used to approximate a circle.
    pub circle_segments: usize,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self { circle_segments: 24 }
    }
}

impl Rasterizer {
    /// Renders `surface` bottom to top. Visual entries are looked up through
    /// `resolve`; ids it does not know are skipped.
    pub fn render<'a, F>(&self, surface: &Surface, resolve: F) -> RgbaImage
    where
        F: Fn(&str) -> Option<&'a Group>,
    {
        let background = surface.background();
        let mut image = RgbaImage::from_pixel(
            surface.width(),
            surface.height(),
            Rgba([background.r, background.g, background.b, background.a]),
        );

        for entry in surface.entries() {
            match entry {
                SurfaceEntry::Visual(id) => {
                    let Some(group) = resolve(id) else {
                        tracing::trace!(group = %id, "skipping unresolved visual");
                        continue;
                    };
                    for child in group.children() {
                        let outline: Vec<(f32, f32)> = child
                            .outline(self.circle_segments)
                            .into_iter()
                            .map(|point| group.to_world(point))
                            .collect();
                        fill_polygon(&mut image, &outline, child.fill, child.opacity);
                    }
                }
                SurfaceEntry::Object(object) => self.paint(&mut image, &object.primitive),
            }
        }

        image
    }

    fn paint(&self, image: &mut RgbaImage, primitive: &Primitive) {
        let outline = primitive.outline(self.circle_segments);
        fill_polygon(image, &outline, primitive.fill, primitive.opacity);
    }
}

fn fill_polygon(image: &mut RgbaImage, polygon: &[(f32, f32)], fill: Color, opacity: f32) {
    let alpha = f32::from(fill.a) / 255.0 * opacity.clamp(0.0, 1.0);
    if polygon.len() < 3 || alpha <= 0.0 {
        return;
    }
    if polygon.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return;
    }

    let (width, height) = image.dimensions();
    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for &(x, y) in polygon {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    let x0 = min_x.floor().max(0.0) as u32;
    let y0 = min_y.floor().max(0.0) as u32;
    let x1 = (max_x.ceil().max(0.0) as u32).min(width);
    let y1 = (max_y.ceil().max(0.0) as u32).min(height);

    for py in y0..y1 {
        for px in x0..x1 {
            if contains(polygon, px as f32 + 0.5, py as f32 + 0.5) {
                blend(image.get_pixel_mut(px, py), fill, alpha);
            }
        }
    }
}

/// Even-odd crossing test.
fn contains(polygon: &[(f32, f32)], x: f32, y: f32) -> bool {
    let mut inside = false;
    let mut previous = polygon[polygon.len() - 1];
    for &current in polygon {
        let (xi, yi) = current;
        let (xj, yj) = previous;
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        previous = current;
    }
    inside
}

fn blend(pixel: &mut Rgba<u8>, fill: Color, alpha: f32) {
    let mix = |src: u8, dst: u8| {
        (f32::from(src) * alpha + f32::from(dst) * (1.0 - alpha))
            .round()
            .clamp(0.0, 255.0) as u8
    };
    let [r, g, b, a] = pixel.0;
    let out_alpha = alpha + f32::from(a) / 255.0 * (1.0 - alpha);
    *pixel = Rgba([
        mix(fill.r, r),
        mix(fill.g, g),
        mix(fill.b, b),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Anchor, SceneObject, Transform};

    fn object(id: &str, primitive: Primitive) -> SceneObject {
        SceneObject {
            id: id.to_string(),
            primitive,
        }
    }

    #[test]
    fn empty_surface_is_background() {
        let surface = Surface::new(4, 3, Color::rgb(10, 20, 30));
        let image = Rasterizer::default().render(&surface, |_| None);
        assert_eq!(image.dimensions(), (4, 3));
        assert!(image.pixels().all(|p| p.0 == [10, 20, 30, 255]));
    }

    #[test]
    fn later_entries_paint_over_earlier_ones() {
        let mut surface = Surface::new(10, 10, Color::BLACK);
        surface.add_object(object(
            "under",
            Primitive::rect(10.0, 10.0).anchored(Anchor::TopLeft).filled(Color::WHITE),
        ));
        surface.add_object(object(
            "over",
            Primitive::rect(4.0, 4.0)
                .anchored(Anchor::TopLeft)
                .filled(Color::rgb(255, 0, 0)),
        ));

        let image = Rasterizer::default().render(&surface, |_| None);
        assert_eq!(image.get_pixel(1, 1).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(8, 8).0, [255, 255, 255, 255]);
    }

    #[test]
    fn group_children_follow_the_group_transform() {
        let mut group = Group::new("g");
        group.set_size(4.0, 4.0);
        group.set_transform(Transform::at(20.0, 10.0));
        group.replace_children(vec![Primitive::rect(4.0, 4.0).anchored(Anchor::TopLeft)]);

        let mut surface = Surface::new(32, 32, Color::BLACK);
        surface.add_visual("g");
        surface.add_visual("missing");

        let image = Rasterizer::default().render(&surface, |id| (id == "g").then_some(&group));
        assert_eq!(image.get_pixel(21, 11).0, [255, 255, 255, 255]);
        assert_eq!(image.get_pixel(1, 1).0, [0, 0, 0, 255]);
    }

    #[test]
    fn opacity_blends_with_what_is_below() {
        let mut surface = Surface::new(2, 2, Color::BLACK);
        let mut half = Primitive::rect(2.0, 2.0).anchored(Anchor::TopLeft);
        half.opacity = 0.5;
        surface.add_object(object("half", half.clone()));
        half.opacity = 0.0;
        surface.add_object(object("invisible", half.filled(Color::rgb(0, 0, 255))));

        let image = Rasterizer::default().render(&surface, |_| None);
        assert_eq!(image.get_pixel(0, 0).0, [128, 128, 128, 255]);
    }

    #[test]
    fn shapes_off_the_surface_are_clipped() {
        let mut surface = Surface::new(4, 4, Color::BLACK);
        surface.add_object(object("far", Primitive::circle(3.0).at(-50.0, 200.0)));
        let mut broken = Primitive::rect(2.0, 2.0);
        broken.x = f32::NAN;
        surface.add_object(object("nan", broken));

        let image = Rasterizer::default().render(&surface, |_| None);
        assert!(image.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }
}
