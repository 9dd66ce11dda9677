//! Audio-reactive visual elements.
//!
//! A [`Builder`] owns one [`FrequencyAnalyzer`], one [`Group`] and the
//! settings they are derived from. The geometry and the response to audio
//! come from a [`Variant`]; everything else (reconfiguration, cloning,
//! identity) is shared here.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{
    analysis::{FrequencyAnalyzer, Smoothing, DEFAULT_SHAPER},
    color::ColorSpec,
    scene::{Group, Primitive},
    AudioBuffer, Color, FrameClock,
};

mod bar_circle;
mod bar_line;
mod dot_circle;
mod dot_line;

pub use bar_circle::BarCircle;
pub use bar_line::BarLine;
pub use dot_circle::DotCircle;
pub use dot_line::DotLine;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Inputs a variant lays its elements out from.
#[derive(Debug, Clone, Copy)]
pub struct Layout<'a> {
    pub count: usize,
    pub colors: &'a [Color],
}

impl Layout<'_> {
    /// Fill of element `index`, white if the map is short.
    pub fn color(&self, index: usize) -> Color {
        self.colors.get(index).copied().unwrap_or(Color::WHITE)
    }
}

/// Geometry and audio response of one family of visuals.
pub trait Variant: fmt::Debug + Send + Sync {
    /// Registry name, also the prefix of generated builder ids.
    fn name(&self) -> &'static str;

    /// Lays out exactly `layout.count` primitives inside `width` x
    /// `height`. Must be deterministic.
    fn create_elements(&self, layout: &Layout<'_>, width: f32, height: f32) -> Vec<Primitive>;

    /// Sizes the group for a `surface_width` x `surface_height` surface,
    /// fills it with elements and places it.
    fn initialize(&self, layout: &Layout<'_>, group: &mut Group, surface_width: f32, surface_height: f32);

    /// Maps one magnitude frame onto the existing children. Never adds or
    /// removes children.
    fn draw(&self, group: &mut Group, magnitudes: &[f32], clock: FrameClock);

    fn box_clone(&self) -> Box<dyn Variant>;
}

/// Settings a builder is constructed from.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderOptions {
    pub count: usize,
    pub color: ColorSpec,
    pub shaper: String,
    pub smoothing: Smoothing,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            count: 64,
            color: ColorSpec::default(),
            shaper: DEFAULT_SHAPER.to_string(),
            smoothing: Smoothing::default(),
        }
    }
}

impl BuilderOptions {
    pub fn new(count: usize, color: ColorSpec, shaper: impl Into<String>) -> Self {
        Self {
            count,
            color,
            shaper: shaper.into(),
            ..Default::default()
        }
    }
}

/// One audio-reactive visual element.
#[derive(Debug)]
pub struct Builder {
    id: String,
    element_count: usize,
    color: ColorSpec,
    color_map: Vec<Color>,
    shaper: String,
    analyzer: FrequencyAnalyzer,
    group: Group,
    attached: bool,
    variant: Box<dyn Variant>,
}

impl Builder {
    /// Creates a detached builder. Counts below one are raised to one.
    pub fn new(variant: Box<dyn Variant>, options: BuilderOptions) -> Self {
        let element_count = options.count.max(1);
        let id = generate_id(variant.name());
        let color_map = options.color.color_map(element_count);

        Self {
            group: Group::new(id.clone()),
            id,
            element_count,
            color: options.color,
            color_map,
            shaper: options.shaper,
            analyzer: FrequencyAnalyzer::with_smoothing(transform_size_for(element_count), options.smoothing),
            attached: false,
            variant,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the variant this builder was constructed from.
    pub fn name(&self) -> &'static str {
        self.variant.name()
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub fn color(&self) -> &ColorSpec {
        &self.color
    }

    pub fn color_map(&self) -> &[Color] {
        &self.color_map
    }

    pub fn shaper(&self) -> &str {
        &self.shaper
    }

    pub fn analyzer(&self) -> &FrequencyAnalyzer {
        &self.analyzer
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn group_mut(&mut self) -> &mut Group {
        &mut self.group
    }

    /// Whether the group currently sits on a surface.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub(crate) fn set_attached(&mut self, attached: bool) {
        self.attached = attached;
    }

    /// The settings a same-variant replacement would need.
    pub fn options(&self) -> BuilderOptions {
        BuilderOptions {
            count: self.element_count,
            color: self.color.clone(),
            shaper: self.shaper.clone(),
            smoothing: self.analyzer.smoothing(),
        }
    }

    pub fn create_elements(&self, width: f32, height: f32) -> Vec<Primitive> {
        self.variant.create_elements(&self.layout(), width, height)
    }

    /// Lays the group out for a surface of the given size.
    pub fn initialize(&mut self, surface_width: f32, surface_height: f32) {
        let layout = Layout {
            count: self.element_count,
            colors: &self.color_map,
        };
        self.variant
            .initialize(&layout, &mut self.group, surface_width, surface_height);
        self.group.set_coords();
    }

    pub fn draw(&mut self, magnitudes: &[f32], clock: FrameClock) {
        if magnitudes.is_empty() {
            return;
        }
        self.variant.draw(&mut self.group, magnitudes, clock);
    }

    /// Analyses `buffer` at `clock.audio_seconds` and draws the result.
    pub fn prepare_draw(&mut self, buffer: &AudioBuffer, clock: FrameClock) {
        let magnitudes = self
            .analyzer
            .analyze(buffer, clock.audio_seconds, &self.shaper);
        self.draw(&magnitudes, clock);
    }

    /// Rebuilds the children for `count` elements.
    ///
    /// Ignored while the group is not on a surface. The new children are
    /// laid out in the unscaled group box (`Group::width`/`height`), not at
    /// the scaled on-screen size; the external transform then applies the
    /// scale exactly once. Box and transform are kept, so the bounding box
    /// and scale are the same before and after; only the children change.
    pub fn update_element_count(&mut self, count: usize) {
        if !self.attached {
            tracing::debug!(builder = %self.id, "ignoring count change on a detached builder");
            return;
        }

        let count = count.max(1);
        self.element_count = count;
        self.color_map = self.color.color_map(count);
        self.analyzer.update_transform_size(transform_size_for(count));

        let elements = self.create_elements(self.group.width(), self.group.height());
        self.group.replace_children(elements);
        self.group.set_coords();
    }

    /// Recolors the existing children in place.
    pub fn update_color(&mut self, color: ColorSpec) {
        self.color_map = color.color_map(self.element_count);
        self.color = color;

        for (child, fill) in self.group.children_mut().iter_mut().zip(&self.color_map) {
            child.fill = *fill;
        }
    }

    /// Takes effect on the next draw.
    pub fn update_shape(&mut self, shaper: impl Into<String>) {
        self.shaper = shaper.into();
    }

    /// Independent copy with a fresh id, including the analyser's smoothing
    /// state. The copy starts detached.
    pub fn duplicate(&self) -> Builder {
        let id = generate_id(self.variant.name());
        let mut group = self.group.clone();
        group.set_id(id.clone());

        Builder {
            id,
            element_count: self.element_count,
            color: self.color.clone(),
            color_map: self.color_map.clone(),
            shaper: self.shaper.clone(),
            analyzer: self.analyzer.clone(),
            group,
            attached: false,
            variant: self.variant.box_clone(),
        }
    }

    fn layout(&self) -> Layout<'_> {
        Layout {
            count: self.element_count,
            colors: &self.color_map,
        }
    }
}

/// Analyser window for `count` elements: `2 * count` rounded up to a power
/// of two.
pub fn transform_size_for(count: usize) -> usize {
    (count.max(1) * 2).next_power_of_two()
}

/// `<variant>-<unix millis>-<sequence>`; the sequence keeps ids unique
/// within one millisecond.
fn generate_id(name: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{name}-{millis}-{sequence}")
}

/// Frame bin feeding element `index` of `count` when the frame has `len`
/// bins.
pub(crate) fn bin_for(index: usize, count: usize, len: usize) -> usize {
    let scaled = (index as f32 / count.max(1) as f32 * len as f32).floor() as usize;
    scaled.min(len.saturating_sub(1))
}

/// `base - log2(count)` floored at zero; denser layouts get smaller elements.
pub(crate) fn shrink_with_count(base: f32, count: usize) -> f32 {
    (base - (count.max(1) as f32).log2()).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Transform;

    fn attached(variant: Box<dyn Variant>, count: usize) -> Builder {
        let mut builder = Builder::new(variant, BuilderOptions::new(count, ColorSpec::default(), "Slope"));
        builder.initialize(800.0, 600.0);
        builder.set_attached(true);
        builder
    }

    fn all_variants() -> Vec<Box<dyn Variant>> {
        vec![
            Box::new(BarCircle),
            Box::new(DotCircle),
            Box::new(DotLine),
            Box::new(BarLine),
        ]
    }

    #[test]
    fn initialize_creates_one_child_per_element() {
        for variant in all_variants() {
            let builder = attached(variant, 24);
            assert_eq!(builder.group().child_count(), 24, "{}", builder.name());
            assert_eq!(builder.analyzer().transform_size(), 64);
        }
    }

    #[test]
    fn count_change_keeps_placement() {
        for variant in all_variants() {
            let mut builder = attached(variant, 16);
            let mut transform = builder.group().transform().clone();
            transform.scale_x = 1.5;
            transform.scale_y = 0.75;
            transform.angle = 30.0;
            transform.left += 12.0;
            builder.group_mut().set_transform(transform.clone());
            builder.group_mut().set_coords();
            let before = builder.group().coords();

            builder.update_element_count(40);

            assert_eq!(builder.group().child_count(), 40);
            assert_eq!(builder.element_count(), 40);
            assert_eq!(builder.group().transform(), &transform);
            assert_eq!(builder.group().coords(), before);
            assert_eq!(builder.analyzer().transform_size(), 128);
        }
    }

    #[test]
    fn transform_size_is_a_power_of_two() {
        assert_eq!(transform_size_for(0), 2);
        assert_eq!(transform_size_for(1), 2);
        assert_eq!(transform_size_for(24), 64);
        assert_eq!(transform_size_for(32), 64);
        assert_eq!(transform_size_for(33), 128);

        let builder = attached(Box::new(BarLine), 12);
        assert_eq!(builder.analyzer().transform_size(), 32);
        assert_eq!(builder.analyzer().bin_count(), 17);
    }

    #[test]
    fn detached_builder_ignores_count_change() {
        let mut builder = Builder::new(Box::new(BarLine), BuilderOptions::default());
        builder.update_element_count(8);
        assert_eq!(builder.element_count(), 64);
    }

    #[test]
    fn zero_count_is_clamped() {
        let builder = attached(Box::new(DotLine), 0);
        assert_eq!(builder.element_count(), 1);
        assert_eq!(builder.group().child_count(), 1);
    }

    #[test]
    fn pathological_counts_degrade_without_panicking() {
        for variant in all_variants() {
            let mut builder = attached(variant, 4096);
            builder.draw(&vec![0.0; 4097], FrameClock::default());
            assert_eq!(builder.group().child_count(), 4096);
        }
    }

    #[test]
    fn recolors_children_by_index() {
        let mut builder = attached(Box::new(BarLine), 3);
        let gradient: ColorSpec = "linear-gradient(to right, #000000 0%, #ffffff 100%)"
            .parse()
            .unwrap();
        builder.update_color(gradient);

        let fills: Vec<Color> = builder.group().children().iter().map(|c| c.fill).collect();
        assert_eq!(fills, vec![Color::BLACK, Color::rgb(128, 128, 128), Color::WHITE]);
    }

    #[test]
    fn duplicate_is_independent() {
        let mut original = attached(Box::new(DotCircle), 8);
        original
            .group_mut()
            .set_transform(Transform::at(10.0, 20.0));

        let buffer = AudioBuffer::mono(
            8_000,
            (0..8_000).map(|i| (i as f32 * 0.3).sin()).collect(),
        )
        .unwrap();
        original.prepare_draw(&buffer, FrameClock::new(0.5, 500.0));
        assert!(!original.analyzer().previous_frame().is_empty());

        let mut copy = original.duplicate();
        assert_eq!(copy.analyzer().previous_frame(), original.analyzer().previous_frame());
        assert_eq!(copy.analyzer().transform_size(), original.analyzer().transform_size());
        assert_ne!(copy.id(), original.id());
        assert_eq!(copy.group().id(), copy.id());
        assert_eq!(copy.group().transform(), original.group().transform());
        assert!(!copy.is_attached());

        copy.update_color(ColorSpec::Solid(Color::BLACK));
        copy.group_mut().set_transform(Transform::at(0.0, 0.0));
        assert_eq!(original.group().children()[0].fill, Color::WHITE);
        assert_eq!(original.group().transform().left, 10.0);
    }

    #[test]
    fn shape_change_is_metadata_only() {
        let mut builder = attached(Box::new(BarCircle), 8);
        let before = builder.group().clone();
        builder.update_shape("Peak");
        assert_eq!(builder.shaper(), "Peak");
        assert_eq!(builder.group(), &before);
    }

    #[test]
    fn ids_are_unique_and_prefixed() {
        let a = Builder::new(Box::new(BarLine), BuilderOptions::default());
        let b = Builder::new(Box::new(BarLine), BuilderOptions::default());
        assert_ne!(a.id(), b.id());
        assert!(a.id().starts_with("BarLine-"));
    }

    #[test]
    fn bins_spread_across_frame() {
        assert_eq!(bin_for(0, 4, 9), 0);
        assert_eq!(bin_for(2, 4, 9), 4);
        assert_eq!(bin_for(3, 4, 9), 6);
        assert_eq!(bin_for(5, 1, 0), 0);
    }
}
