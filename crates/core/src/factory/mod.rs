//! Lifecycle management for every builder on one surface.

use std::collections::{BTreeMap, HashMap};

use image::RgbaImage;
use once_cell::sync::Lazy;

use crate::{
    builder::{BarCircle, BarLine, Builder, BuilderOptions, DotCircle, DotLine},
    color::ColorSpec,
    render::Rasterizer,
    scene::{GroupTag, Surface, SurfaceEntry},
    AudioBuffer, AudioCanvasError, FrameClock, Result,
};

/// Builds a detached builder of one variant.
pub type BuilderConstructor = fn(BuilderOptions) -> Builder;

/// Every variant the crate ships, keyed by name.
static CATALOG: Lazy<BTreeMap<&'static str, BuilderConstructor>> = Lazy::new(|| {
    let mut catalog: BTreeMap<&'static str, BuilderConstructor> = BTreeMap::new();
    catalog.insert(BarCircle::NAME, |options| Builder::new(Box::new(BarCircle), options));
    catalog.insert(DotCircle::NAME, |options| Builder::new(Box::new(DotCircle), options));
    catalog.insert(DotLine::NAME, |options| Builder::new(Box::new(DotLine), options));
    catalog.insert(BarLine::NAME, |options| Builder::new(Box::new(BarLine), options));
    catalog
});

/// Names a host can offer to users.
pub fn variant_names() -> impl Iterator<Item = &'static str> {
    CATALOG.keys().copied()
}

/// Owns the builders drawn on one surface and keeps the surface in sync
/// with them.
///
/// The surface only stores group ids; groups live inside their builders.
#[derive(Debug)]
pub struct BuilderFactory {
    surface: Surface,
    constructors: HashMap<String, BuilderConstructor>,
    builders: Vec<Builder>,
    rasterizer: Rasterizer,
}

impl BuilderFactory {
    pub fn new(surface: Surface) -> Self {
        Self {
            surface,
            constructors: HashMap::new(),
            builders: Vec::new(),
            rasterizer: Rasterizer::default(),
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    pub fn builders(&self) -> &[Builder] {
        &self.builders
    }

    /// Finds the builder owning the group with `group_id`.
    pub fn builder(&self, group_id: &str) -> Option<&Builder> {
        self.builders.iter().find(|builder| builder.id() == group_id)
    }

    pub fn builder_mut(&mut self, group_id: &str) -> Option<&mut Builder> {
        self.builders
            .iter_mut()
            .find(|builder| builder.id() == group_id)
    }

    /// Resolves the constructor registered under `name`, caching it for
    /// later calls.
    pub fn create_builder(&mut self, name: &str) -> Result<BuilderConstructor> {
        if let Some(constructor) = self.constructors.get(name) {
            return Ok(*constructor);
        }

        let constructor = *CATALOG
            .get(name)
            .ok_or_else(|| AudioCanvasError::UnknownVariant(name.to_string()))?;
        tracing::debug!(variant = name, "resolved builder variant");
        self.constructors.insert(name.to_string(), constructor);
        Ok(constructor)
    }

    /// Constructs a builder of `name` and adds it. Returns its id.
    pub fn build(&mut self, name: &str, options: BuilderOptions) -> Result<String> {
        let constructor = self.create_builder(name)?;
        Ok(self.add_builder(constructor(options)))
    }

    /// Lays `builder` out for the current surface, registers it and puts
    /// its group on the surface. Returns its id.
    pub fn add_builder(&mut self, mut builder: Builder) -> String {
        builder.initialize(self.surface.width() as f32, self.surface.height() as f32);
        self.attach(builder)
    }

    /// Duplicates the builder owning `group_id` and places the copy next to
    /// it, on top of the original.
    pub fn clone_builder(&mut self, group_id: &str) -> Option<String> {
        let copy = self.builder(group_id)?.duplicate();
        Some(self.attach(copy))
    }

    /// Replaces the builder owning `group_id` with a `name` builder carrying
    /// the same count, color and shaper, placed with the old group's
    /// transform. The replacement becomes the active selection and gets a
    /// new id.
    pub fn update_builder_type(&mut self, group_id: &str, name: &str) -> Result<String> {
        let constructor = self.create_builder(name)?;
        let index = self.index_of(group_id)?;

        let old = self.builders.remove(index);
        let mut builder = constructor(old.options());
        builder.initialize(self.surface.width() as f32, self.surface.height() as f32);
        builder
            .group_mut()
            .set_transform(old.group().transform().clone());
        builder.group_mut().set_coords();
        builder.set_attached(true);
        tag_group(&mut builder);

        let id = builder.id().to_string();
        if !self.surface.replace_visual(group_id, id.clone()) {
            self.surface.add_visual(id.clone());
        }
        self.builders.insert(index, builder);
        self.surface.set_active(Some(id.clone()));
        self.surface.request_render();

        tracing::debug!(from = old.name(), to = name, builder = %id, "replaced builder");
        Ok(id)
    }

    pub fn update_builder_count(&mut self, group_id: &str, count: usize) -> bool {
        self.update_builder(group_id, |builder| builder.update_element_count(count))
    }

    pub fn update_builder_color(&mut self, group_id: &str, color: ColorSpec) -> bool {
        self.update_builder(group_id, |builder| builder.update_color(color))
    }

    pub fn update_builder_shape(&mut self, group_id: &str, shaper: &str) -> bool {
        self.update_builder(group_id, |builder| builder.update_shape(shaper))
    }

    /// Takes the builder owning `group_id` off the surface and drops it
    /// from the factory.
    pub fn remove_builder(&mut self, group_id: &str) -> Option<Builder> {
        let index = self.index_of(group_id).ok()?;
        let mut builder = self.builders.remove(index);
        self.surface.remove_visual(group_id);
        self.surface.request_render();
        builder.set_attached(false);
        Some(builder)
    }

    /// Analyses and draws every builder at the same instant, then asks for
    /// one repaint.
    pub fn draw_all(&mut self, buffer: &AudioBuffer, clock: FrameClock) {
        for builder in &mut self.builders {
            builder.prepare_draw(buffer, clock);
        }
        self.surface.request_render();
    }

    /// Renders the surface as it stands and clears the repaint request.
    pub fn render(&mut self) -> RgbaImage {
        self.surface.take_render_request();
        let builders = &self.builders;
        self.rasterizer.render(&self.surface, |id| {
            builders
                .iter()
                .find(|builder| builder.id() == id)
                .map(Builder::group)
        })
    }

    /// Rebuilds this factory's content on `target`.
    ///
    /// Every builder is re-created from its settings (fresh ids, fresh
    /// smoothing state) and moved to the original's transform; every plain
    /// object is copied. Stacking order is preserved. Nothing is shared with
    /// `self`, so the copy can render while this one keeps being edited.
    pub fn clone_onto(&self, target: Surface) -> Result<BuilderFactory> {
        let mut copy = BuilderFactory::new(target);

        for entry in self.surface.entries() {
            match entry {
                SurfaceEntry::Visual(id) => {
                    let Some(builder) = self.builder(id) else {
                        continue;
                    };
                    let constructor = copy.create_builder(builder.name())?;
                    let copy_id = copy.add_builder(constructor(builder.options()));
                    if let Some(clone) = copy.builder_mut(&copy_id) {
                        let group = clone.group_mut();
                        group.set_transform(builder.group().transform().clone());
                        group.set_coords();
                    }
                }
                SurfaceEntry::Object(object) => copy.surface.add_object(object.clone()),
            }
        }

        tracing::debug!(
            builders = copy.builders.len(),
            objects = copy.surface.objects().count(),
            hidden = copy.surface.is_hidden(),
            "cloned builder factory"
        );
        Ok(copy)
    }

    fn attach(&mut self, mut builder: Builder) -> String {
        builder.set_attached(true);
        tag_group(&mut builder);

        let id = builder.id().to_string();
        self.surface.add_visual(id.clone());
        self.surface.request_render();
        tracing::debug!(variant = builder.name(), builder = %id, "added builder");

        self.builders.push(builder);
        id
    }

    fn update_builder(&mut self, group_id: &str, apply: impl FnOnce(&mut Builder)) -> bool {
        let Some(builder) = self.builder_mut(group_id) else {
            tracing::debug!(group = group_id, "no builder owns group");
            return false;
        };

        apply(builder);
        tag_group(builder);
        self.surface.request_render();
        true
    }

    fn index_of(&self, group_id: &str) -> Result<usize> {
        self.builders
            .iter()
            .position(|builder| builder.id() == group_id)
            .ok_or_else(|| AudioCanvasError::UnknownGroup(group_id.to_string()))
    }
}

fn tag_group(builder: &mut Builder) {
    let tag = GroupTag {
        variant: builder.name().to_string(),
        count: builder.element_count(),
        color: builder.color().clone(),
        shaper: builder.shaper().to_string(),
    };
    let id = builder.id().to_string();
    let group = builder.group_mut();
    group.set_id(id);
    group.set_tag(tag);
}
