use std::f32::consts::TAU;

use crate::{
    analysis::normalize,
    scene::{Anchor, Group, Primitive, Shape, Transform},
    FrameClock,
};

use super::{bin_for, shrink_with_count, Layout, Variant};

/// Dots around a circle whose size and brightness pulse with the music.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotCircle;

impl DotCircle {
    pub const NAME: &'static str = "DotCircle";
    pub const MIN_SCALE: f32 = 1.0;
    pub const MAX_SCALE: f32 = 2.25;
    /// Amplitude of the time based wobble added on top of the audio scale.
    pub const JITTER: f32 = 0.15;
    /// Milliseconds per radian of wobble phase.
    pub const JITTER_PERIOD_MS: f64 = 200.0;
    const PADDING: f32 = 10.0;

    /// Resting dot radius; more dots means smaller dots.
    pub fn dot_radius(count: usize) -> f32 {
        shrink_with_count(8.0, count)
    }

    /// Smallest and largest radius a drawn dot can take for `count` dots.
    pub fn radius_bounds(count: usize) -> (f32, f32) {
        let radius = Self::dot_radius(count);
        (
            (radius * (Self::MIN_SCALE - Self::JITTER)).max(0.0),
            radius * (Self::MAX_SCALE + Self::JITTER),
        )
    }

    /// Radius of the circle the dot centres sit on.
    fn orbit_radius(width: f32, height: f32, count: usize) -> f32 {
        let diameter = Self::dot_radius(count) * 2.0;
        ((width.min(height) - diameter - 1.0) / 2.0 - Self::PADDING).max(0.0)
    }

    fn angle(index: usize, count: usize) -> f32 {
        index as f32 / count.max(1) as f32 * TAU
    }

    fn jitter(clock: FrameClock, index: usize) -> f32 {
        let phase = clock.wall_millis / Self::JITTER_PERIOD_MS + index as f64;
        Self::JITTER * phase.sin() as f32
    }
}

impl Variant for DotCircle {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn create_elements(&self, layout: &Layout<'_>, width: f32, height: f32) -> Vec<Primitive> {
        let orbit = Self::orbit_radius(width, height, layout.count);
        let radius = Self::dot_radius(layout.count);

        (0..layout.count)
            .map(|i| {
                // polar -> cartesian around the box centre
                let angle = Self::angle(i, layout.count);
                Primitive::circle(radius)
                    .at(
                        width / 2.0 + orbit * angle.cos(),
                        height / 2.0 + orbit * angle.sin(),
                    )
                    .anchored(Anchor::Center)
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

    fn draw(&self, group: &mut Group, magnitudes: &[f32], clock: FrameClock) {
        let scales = normalize(magnitudes, Self::MIN_SCALE, Self::MAX_SCALE);
        let count = group.child_count();
        let (width, height) = (group.width(), group.height());
        let orbit = Self::orbit_radius(width, height, count);
        let radius = Self::dot_radius(count);

        for (i, dot) in group.children_mut().iter_mut().enumerate() {
            let Shape::Circle { radius: current } = &mut dot.shape else {
                continue;
            };

            let angle = Self::angle(i, count);
            let scale = scales[bin_for(i, count, scales.len())];
            let animated = scale + Self::jitter(clock, i);

            *current = (radius * animated).max(0.0);
            dot.x = width / 2.0 + orbit * angle.cos();
            dot.y = height / 2.0 + orbit * angle.sin();
            // non-linear so quiet bins fade out faster than loud ones
            dot.opacity = (scale / Self::MAX_SCALE).powf(1.5).clamp(0.0, 1.0);
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

    fn group_with(count: usize) -> Group {
        let colors = vec![Color::WHITE; count];
        let layout = Layout { count, colors: &colors };
        let mut group = Group::new("dots");
        DotCircle.initialize(&layout, &mut group, 640.0, 480.0);
        group
    }

    #[test]
    fn radius_shrinks_with_count() {
        assert_eq!(DotCircle::dot_radius(1), 8.0);
        assert_eq!(DotCircle::dot_radius(32), 3.0);
        assert_eq!(DotCircle::dot_radius(1024), 0.0);
    }

    #[test]
    fn loud_dots_are_larger_and_brighter() {
        let mut group = group_with(2);
        DotCircle.draw(&mut group, &[255.0, 0.0, 0.0], FrameClock::default());

        let loud = &group.children()[0];
        let quiet = &group.children()[1];
        assert!(loud.width() > quiet.width());
        assert!((loud.opacity - 1.0).abs() < 1e-6);
        assert!(quiet.opacity < loud.opacity);
    }

    #[test]
    fn jitter_depends_only_on_the_supplied_clock() {
        let frame = [10.0, 200.0, 50.0, 255.0, 0.0];
        let clock = FrameClock::new(0.5, 12_345.0);

        let mut a = group_with(4);
        let mut b = group_with(4);
        DotCircle.draw(&mut a, &frame, clock);
        DotCircle.draw(&mut b, &frame, clock);
        assert_eq!(a, b);

        let mut c = group_with(4);
        DotCircle.draw(&mut c, &frame, FrameClock::new(0.5, 12_745.0));
        assert_ne!(a, c);
    }

    #[test]
    fn radii_stay_within_bounds() {
        let (low, high) = DotCircle::radius_bounds(16);
        let mut group = group_with(16);
        for step in 0..20 {
            let frame: Vec<f32> = (0..17).map(|i| ((i * 37 + step * 11) % 256) as f32).collect();
            DotCircle.draw(&mut group, &frame, FrameClock::new(0.0, step as f64 * 40.0));
            for dot in group.children() {
                let radius = dot.width() / 2.0;
                assert!(radius >= low - 1e-4 && radius <= high + 1e-4);
            }
        }
    }
}
