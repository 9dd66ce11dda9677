use std::f32::consts::PI;

use crate::{
    analysis::normalize,
    scene::{Anchor, Group, Primitive, Transform},
    FrameClock,
};

use super::{Layout, Variant};

/// A horizontal row of dots that rest on a sine wave and ride the spectrum
/// while music plays.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotLine;

impl DotLine {
    pub const NAME: &'static str = "DotLine";
    pub const RADIUS: f32 = 3.0;
    /// Full sine periods across the row at rest.
    const WAVE_PERIODS: f32 = 4.0;

    /// Resting vertical position of each dot in `[0, 1]`. The same count
    /// always yields the same wave.
    fn baseline(count: usize) -> Vec<f32> {
        let frequency = Self::WAVE_PERIODS * 2.0 * PI / count.max(1) as f32;
        let wave: Vec<f32> = (0..count).map(|i| (i as f32 * frequency).sin()).collect();
        normalize(&wave, 0.0, 1.0)
    }

    /// Vertical room left for dot centres once the dot itself fits.
    fn travel(height: f32) -> f32 {
        (height - Self::RADIUS * 2.0 - 1.0).max(0.0)
    }
}

impl Variant for DotLine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn create_elements(&self, layout: &Layout<'_>, width: f32, height: f32) -> Vec<Primitive> {
        let count = layout.count;
        let diameter = Self::RADIUS * 2.0;
        let spacing = if count > 1 {
            ((width - diameter * count as f32) / (count - 1) as f32).max(0.0)
        } else {
            0.0
        };
        let travel = Self::travel(height);

        Self::baseline(count)
            .into_iter()
            .enumerate()
            .map(|(i, level)| {
                Primitive::circle(Self::RADIUS)
                    .at(
                        Self::RADIUS + i as f32 * (diameter + spacing),
                        Self::RADIUS + travel * level,
                    )
                    .anchored(Anchor::Center)
                    .filled(layout.color(i))
            })
            .collect()
    }

    fn initialize(&self, layout: &Layout<'_>, group: &mut Group, surface_width: f32, surface_height: f32) {
        let group_height = surface_height / 4.0;

        group.set_size(surface_width, group_height);
        group.set_origin(Anchor::TopLeft);
        group.set_transform(Transform::at(0.0, group_height));
        group.replace_children(self.create_elements(layout, surface_width, group_height));
    }

    fn draw(&self, group: &mut Group, magnitudes: &[f32], _clock: FrameClock) {
        let travel = Self::travel(group.height());
        let count = group.child_count();

        // A flat frame carries no shape; fall back to the resting wave.
        let flat = magnitudes.iter().all(|v| *v == magnitudes[0]);
        let levels = if flat {
            Self::baseline(count)
        } else {
            normalize(magnitudes, 0.0, 1.0)
                .into_iter()
                .map(|level| 1.0 - level)
                .collect()
        };

        for (dot, level) in group.children_mut().iter_mut().zip(levels) {
            dot.y = Self::RADIUS + travel * level;
        }
    }

    fn box_clone(&self) -> Box<dyn Variant> {
        Box::new(*self)
    }
}
