use crate::{
    analysis::normalize,
    scene::{Anchor, Group, Primitive, Shape, Transform},
    FrameClock,
};

use super::{Layout, Variant};

/// A row of bars along the bottom edge, height proportional to magnitude.
#[derive(Debug, Clone, Copy, Default)]
pub struct BarLine;

impl BarLine {
    pub const NAME: &'static str = "BarLine";
    pub const GAP: f32 = 2.0;
}

impl Variant for BarLine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn create_elements(&self, layout: &Layout<'_>, width: f32, height: f32) -> Vec<Primitive> {
        let bar_width = (width / layout.count.max(1) as f32 - Self::GAP).max(0.0);

        (0..layout.count)
            .map(|i| {
                // bottom-anchored: `y` is the bar's base, it grows upwards
                Primitive::rect(bar_width, height)
                    .at(i as f32 * (bar_width + Self::GAP), height)
                    .anchored(Anchor::BottomLeft)
                    .filled(layout.color(i))
            })
            .collect()
    }

    fn initialize(&self, layout: &Layout<'_>, group: &mut Group, surface_width: f32, surface_height: f32) {
        let group_height = surface_height / 4.0;

        group.set_size(surface_width, group_height);
        group.set_origin(Anchor::TopLeft);
        group.set_transform(Transform::at(0.0, surface_height - group_height));
        group.replace_children(self.create_elements(layout, surface_width, group_height));
    }

    fn draw(&self, group: &mut Group, magnitudes: &[f32], _clock: FrameClock) {
        let heights = normalize(magnitudes, 0.0, group.height());

        for (bar, level) in group.children_mut().iter_mut().zip(heights) {
            if let Shape::Rect { height, .. } = &mut bar.shape {
                *height = level;
            }
        }
    }

    fn box_clone(&self) -> Box<dyn Variant> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn bars_sit_on_the_bottom_edge() {
        let colors = vec![Color::WHITE; 4];
        let layout = Layout { count: 4, colors: &colors };
        let mut group = Group::new("bars");
        BarLine.initialize(&layout, &mut group, 400.0, 400.0);
        group.set_coords();

        let coords = group.coords();
        assert_eq!(coords.top + coords.height, 400.0);
        assert_eq!(group.children()[1].x, 100.0);
        assert_eq!(group.children()[0].width(), 98.0);
    }

    #[test]
    fn heights_track_magnitudes() {
        let colors = vec![Color::WHITE; 3];
        let layout = Layout { count: 3, colors: &colors };
        let mut group = Group::new("bars");
        BarLine.initialize(&layout, &mut group, 300.0, 400.0);

        BarLine.draw(&mut group, &[0.0, 127.5, 255.0, 0.0], FrameClock::default());
        let heights: Vec<f32> = group.children().iter().map(Primitive::height).collect();
        assert_eq!(heights, vec![0.0, 50.0, 100.0]);
    }
}
