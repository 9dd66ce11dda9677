use std::f32::consts::TAU;

use crate::{
    analysis::normalize,
    scene::{Anchor, Group, Primitive, Shape, Transform},
    FrameClock,
};

use super::{bin_for, shrink_with_count, Layout, Variant};

/// Bars spread evenly around a circle, each pointing away from the centre.
#[derive(Debug, Clone, Copy, Default)]
pub struct BarCircle;

impl BarCircle {
    pub const NAME: &'static str = "BarCircle";
    /// Resting bar length.
    pub const BAR_HEIGHT: f32 = 25.0;
    pub const MIN_SCALE: f32 = 0.1;
    pub const MAX_SCALE: f32 = 2.0;

    fn bar_width(count: usize) -> f32 {
        shrink_with_count(10.0, count)
    }

    /// Leaves room for a bar at full length on both sides of the orbit.
    fn orbit_radius(width: f32, height: f32) -> f32 {
        ((width.min(height) - Self::BAR_HEIGHT * Self::MAX_SCALE) / 2.0).max(0.0)
    }

    fn angle(index: usize, count: usize) -> f32 {
        index as f32 / count.max(1) as f32 * TAU
    }
}

impl Variant for BarCircle {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn create_elements(&self, layout: &Layout<'_>, width: f32, height: f32) -> Vec<Primitive> {
        let orbit = Self::orbit_radius(width, height);
        let bar_width = Self::bar_width(layout.count);

        (0..layout.count)
            .map(|i| {
                let angle = Self::angle(i, layout.count);
                let x = width / 2.0 + orbit * angle.cos();
                let y = height / 2.0 + orbit * angle.sin();

                // Unlike dots, bars have a direction: turn them to face outwards.
                Primitive::rect(bar_width, Self::BAR_HEIGHT)
                    .at(x, y)
                    .anchored(Anchor::Center)
                    .rotated(angle.to_degrees() + 90.0)
                    .filled(layout.color(i))
            })
            .collect()
    }

    fn initialize(&self, layout: &Layout<'_>, group: &mut Group, surface_width: f32, surface_height: f32) {
        let size = surface_width.min(surface_height) / 2.0;

        group.set_size(size, size);
        group.set_origin(Anchor::Center);
        group.set_transform(Transform::at(surface_width / 2.0, surface_height / 2.0));
        group.replace_children(self.create_elements(layout, size, size));
    }

    fn draw(&self, group: &mut Group, magnitudes: &[f32], _clock: FrameClock) {
        let scales = normalize(magnitudes, Self::MIN_SCALE, Self::MAX_SCALE);
        let count = group.child_count();

        for (i, bar) in group.children_mut().iter_mut().enumerate() {
            if let Shape::Rect { height, .. } = &mut bar.shape {
                let scale = scales[bin_for(i, count, scales.len())];
                *height = (Self::BAR_HEIGHT * scale).max(0.0);
            }
        }
    }

    fn box_clone(&self) -> Box<dyn Variant> {
        Box::new(*self)
    }
}
