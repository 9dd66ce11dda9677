//! In-process model of the drawing surface.
//!
//! A [`Surface`] is an ordered list of entries. Audio-reactive groups are
//! owned by their builders and appear on the surface only as ids; every
//! other object is owned by the surface itself.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::{color::ColorSpec, Color};

/// Reference point a position refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    #[default]
    Center,
    TopLeft,
    BottomLeft,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Rect { width: f32, height: f32 },
    Circle { radius: f32 },
}

/// A single drawable element.
///
/// Inside a group `x`/`y` are relative to the top-left corner of the group
/// box; for plain surface objects they are surface coordinates. `angle` is
/// in degrees and rotates around `(x, y)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub shape: Shape,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub anchor: Anchor,
    #[serde(default)]
    pub angle: f32,
    #[serde(default = "full_opacity")]
    pub opacity: f32,
    pub fill: Color,
}

fn full_opacity() -> f32 {
    1.0
}

impl Primitive {
    pub fn rect(width: f32, height: f32) -> Self {
        Self::new(Shape::Rect { width, height })
    }

    pub fn circle(radius: f32) -> Self {
        Self::new(Shape::Circle { radius })
    }

    fn new(shape: Shape) -> Self {
        Self {
            shape,
            x: 0.0,
            y: 0.0,
            anchor: Anchor::Center,
            angle: 0.0,
            opacity: 1.0,
            fill: Color::WHITE,
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn anchored(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn rotated(mut self, degrees: f32) -> Self {
        self.angle = degrees;
        self
    }

    pub fn filled(mut self, fill: Color) -> Self {
        self.fill = fill;
        self
    }

    pub fn width(&self) -> f32 {
        match self.shape {
            Shape::Rect { width, .. } => width,
            Shape::Circle { radius } => radius * 2.0,
        }
    }

    pub fn height(&self) -> f32 {
        match self.shape {
            Shape::Rect { height, .. } => height,
            Shape::Circle { radius } => radius * 2.0,
        }
    }

    /// Outline polygon in the parent's coordinate space. Circles are
    /// approximated with `segments` edges. Negative sizes collapse to zero.
    pub fn outline(&self, segments: usize) -> Vec<(f32, f32)> {
        let w = self.width().max(0.0);
        let h = self.height().max(0.0);
        let (min_x, min_y) = match self.anchor {
            Anchor::Center => (-w / 2.0, -h / 2.0),
            Anchor::TopLeft => (0.0, 0.0),
            Anchor::BottomLeft => (0.0, -h),
        };

        let local: Vec<(f32, f32)> = match self.shape {
            Shape::Rect { .. } => vec![
                (min_x, min_y),
                (min_x + w, min_y),
                (min_x + w, min_y + h),
                (min_x, min_y + h),
            ],
            Shape::Circle { .. } => {
                let radius = w / 2.0;
                let (cx, cy) = (min_x + radius, min_y + radius);
                let segments = segments.max(3);
                (0..segments)
                    .map(|i| {
                        let theta = i as f32 / segments as f32 * TAU;
                        (cx + radius * theta.cos(), cy + radius * theta.sin())
                    })
                    .collect()
            }
        };

        let (sin, cos) = self.angle.to_radians().sin_cos();
        local
            .into_iter()
            .map(|(px, py)| (self.x + px * cos - py * sin, self.y + px * sin + py * cos))
            .collect()
    }
}

/// External placement of a group on the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub left: f32,
    pub top: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Degrees, clockwise.
    pub angle: f32,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            flip_x: false,
            flip_y: false,
        }
    }
}

impl Transform {
    pub fn at(left: f32, top: f32) -> Self {
        Self {
            left,
            top,
            ..Default::default()
        }
    }
}

/// Axis-aligned rectangle in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    fn enclosing(points: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for (x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        if min_x > max_x || min_y > max_y {
            return Self::default();
        }

        Self {
            left: min_x,
            top: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }
}

/// Metadata stamped onto builder-owned groups so they can be told apart
/// from plain objects and matched back to their builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTag {
    pub variant: String,
    pub count: usize,
    pub color: ColorSpec,
    pub shaper: String,
}

/// A transformable collection of primitives laid out in a `width` x
/// `height` box.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    id: String,
    width: f32,
    height: f32,
    origin: Anchor,
    transform: Transform,
    children: Vec<Primitive>,
    tag: Option<GroupTag>,
    coords: Bounds,
}

impl Group {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            width: 0.0,
            height: 0.0,
            origin: Anchor::TopLeft,
            transform: Transform::default(),
            children: Vec::new(),
            tag: None,
            coords: Bounds::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    /// Which point of the group box `transform.left/top` refers to.
    pub fn origin(&self) -> Anchor {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Anchor) {
        self.origin = origin;
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn children(&self) -> &[Primitive] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Primitive] {
        &mut self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Drops every child and adopts `children` instead. The box and the
    /// external transform are left untouched.
    pub fn replace_children(&mut self, children: Vec<Primitive>) {
        self.children = children;
    }

    pub fn tag(&self) -> Option<&GroupTag> {
        self.tag.as_ref()
    }

    pub fn set_tag(&mut self, tag: GroupTag) {
        self.tag = Some(tag);
    }

    /// Maps a point of the group box onto the surface.
    pub fn to_world(&self, (x, y): (f32, f32)) -> (f32, f32) {
        let (ox, oy) = match self.origin {
            Anchor::Center => (self.width / 2.0, self.height / 2.0),
            Anchor::TopLeft => (0.0, 0.0),
            Anchor::BottomLeft => (0.0, self.height),
        };

        let t = &self.transform;
        let mut qx = x - ox;
        let mut qy = y - oy;
        if t.flip_x {
            qx = -qx;
        }
        if t.flip_y {
            qy = -qy;
        }
        qx *= t.scale_x;
        qy *= t.scale_y;

        let (sin, cos) = t.angle.to_radians().sin_cos();
        (t.left + qx * cos - qy * sin, t.top + qx * sin + qy * cos)
    }

    /// Current on-surface bounding box of the group box.
    pub fn bounding_box(&self) -> Bounds {
        let (w, h) = (self.width, self.height);
        Bounds::enclosing(
            [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]
                .into_iter()
                .map(|corner| self.to_world(corner)),
        )
    }

    /// Recomputes the cached bounding box after a transform or layout change.
    pub fn set_coords(&mut self) {
        self.coords = self.bounding_box();
    }

    /// Bounding box as of the last [`Group::set_coords`].
    pub fn coords(&self) -> Bounds {
        self.coords
    }
}

/// A surface object that is not driven by audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: String,
    pub primitive: Primitive,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEntry {
    /// Builder-owned group, referenced by id.
    Visual(String),
    Object(SceneObject),
}

/// Ordered drawing target. Later entries paint over earlier ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    width: u32,
    height: u32,
    background: Color,
    hidden: bool,
    entries: Vec<SurfaceEntry>,
    active: Option<String>,
    render_requested: bool,
}

impl Surface {
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            width,
            height,
            background,
            hidden: false,
            entries: Vec::new(),
            active: None,
            render_requested: false,
        }
    }

    /// An empty, hidden surface with the same size and background, used to
    /// render exports without touching the visible one.
    pub fn offscreen_copy(&self) -> Self {
        Self {
            hidden: true,
            ..Self::new(self.width, self.height, self.background)
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn entries(&self) -> &[SurfaceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add_visual(&mut self, id: impl Into<String>) {
        self.entries.push(SurfaceEntry::Visual(id.into()));
    }

    pub fn add_object(&mut self, object: SceneObject) {
        self.entries.push(SurfaceEntry::Object(object));
    }

    pub fn contains_visual(&self, id: &str) -> bool {
        self.visual_ids().any(|visual| visual == id)
    }

    /// Swaps the visual `old` for `new` in place, keeping its stacking
    /// position. Returns `false` if `old` is not on the surface.
    pub fn replace_visual(&mut self, old: &str, new: impl Into<String>) -> bool {
        let slot = self
            .entries
            .iter_mut()
            .find(|entry| matches!(entry, SurfaceEntry::Visual(id) if id == old));

        match slot {
            Some(entry) => {
                *entry = SurfaceEntry::Visual(new.into());
                if self.active.as_deref() == Some(old) {
                    self.active = None;
                }
                true
            }
            None => false,
        }
    }

    pub fn remove_visual(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !matches!(entry, SurfaceEntry::Visual(visual) if visual == id));
        if self.active.as_deref() == Some(id) {
            self.active = None;
        }
        before != self.entries.len()
    }

    pub fn visual_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|entry| match entry {
            SurfaceEntry::Visual(id) => Some(id.as_str()),
            SurfaceEntry::Object(_) => None,
        })
    }

    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.entries.iter().filter_map(|entry| match entry {
            SurfaceEntry::Object(object) => Some(object),
            SurfaceEntry::Visual(_) => None,
        })
    }

    pub fn objects_mut(&mut self) -> impl Iterator<Item = &mut SceneObject> {
        self.entries.iter_mut().filter_map(|entry| match entry {
            SurfaceEntry::Object(object) => Some(object),
            SurfaceEntry::Visual(_) => None,
        })
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn set_active(&mut self, id: Option<String>) {
        self.active = id;
    }

    pub fn request_render(&mut self) {
        self.render_requested = true;
    }

    pub fn render_requested(&self) -> bool {
        self.render_requested
    }

    /// Clears the pending repaint flag, returning whether one was pending.
    pub fn take_render_request(&mut self) -> bool {
        std::mem::take(&mut self.render_requested)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.active = None;
        self.render_requested = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-3, "{a} != {b}");
    }

    #[test]
    fn centred_group_maps_box_centre_to_position() {
        let mut group = Group::new("g");
        group.set_size(100.0, 50.0);
        group.set_origin(Anchor::Center);
        group.set_transform(Transform::at(300.0, 200.0));

        let (x, y) = group.to_world((50.0, 25.0));
        assert_close(x, 300.0);
        assert_close(y, 200.0);

        let bounds = group.bounding_box();
        assert_close(bounds.left, 250.0);
        assert_close(bounds.top, 175.0);
    }

    #[test]
    fn scale_and_flip_apply_around_origin() {
        let mut group = Group::new("g");
        group.set_size(10.0, 10.0);
        group.set_transform(Transform {
            left: 5.0,
            top: 5.0,
            scale_x: 2.0,
            flip_x: true,
            ..Default::default()
        });

        let (x, y) = group.to_world((10.0, 10.0));
        assert_close(x, -15.0);
        assert_close(y, 15.0);

        group.set_coords();
        assert_close(group.coords().width, 20.0);
    }

    #[test]
    fn rotated_rect_outline() {
        let rect = Primitive::rect(2.0, 4.0).at(10.0, 10.0).rotated(90.0);
        let outline = rect.outline(0);
        let bounds = Bounds::enclosing(outline);
        assert_close(bounds.width, 4.0);
        assert_close(bounds.height, 2.0);
    }

    #[test]
    fn bottom_anchored_rect_grows_upwards() {
        let rect = Primitive::rect(2.0, 8.0)
            .anchored(Anchor::BottomLeft)
            .at(0.0, 10.0);
        let bounds = Bounds::enclosing(rect.outline(0));
        assert_close(bounds.top, 2.0);
        assert_close(bounds.top + bounds.height, 10.0);
    }

    #[test]
    fn replacing_a_visual_keeps_stacking_order() {
        let mut surface = Surface::new(10, 10, Color::BLACK);
        surface.add_visual("a");
        surface.add_object(SceneObject {
            id: "text".to_string(),
            primitive: Primitive::rect(1.0, 1.0),
        });
        surface.add_visual("b");
        surface.set_active(Some("a".to_string()));

        assert!(surface.replace_visual("a", "c"));
        assert_eq!(surface.visual_ids().collect::<Vec<_>>(), vec!["c", "b"]);
        assert_eq!(surface.active(), None);
        assert!(!surface.replace_visual("missing", "d"));
    }

    #[test]
    fn offscreen_copy_is_empty_and_hidden() {
        let mut surface = Surface::new(64, 32, Color::WHITE);
        surface.add_visual("a");
        let copy = surface.offscreen_copy();
        assert!(copy.is_hidden());
        assert!(copy.is_empty());
        assert_eq!((copy.width(), copy.height()), (64, 32));
        assert_eq!(copy.background(), Color::WHITE);
    }

    #[test]
    fn render_requests_are_consumed() {
        let mut surface = Surface::new(1, 1, Color::BLACK);
        surface.request_render();
        assert!(surface.take_render_request());
        assert!(!surface.take_render_request());
    }
}
