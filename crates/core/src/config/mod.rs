use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    analysis::{Smoothing, DEFAULT_SHAPER},
    builder::BuilderOptions,
    color::ColorSpec,
    factory::BuilderFactory,
    record::RecordingSettings,
    scene::{SceneObject, Surface, Transform},
    Color, Result,
};

/// Top-level configuration structure for the application.
///
/// Read once at startup; nothing is ever written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub surface: SurfaceConfig,
    pub export: RecordingSettings,
    /// Builders added to the surface on startup, bottom to top.
    pub visuals: Vec<VisualConfig>,
    /// Plain objects placed before any builder.
    pub objects: Vec<SceneObject>,
}

impl AppConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.analysis.smoothing.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        tracing::debug!(?path, visuals = config.visuals.len(), "loaded configuration");
        Ok(config)
    }

    /// Creates a factory on a fresh visible surface and populates it.
    ///
    /// Fails on the first visual naming an unknown variant.
    pub fn build_factory(&self) -> Result<BuilderFactory> {
        let mut factory = BuilderFactory::new(self.surface.create());

        for object in &self.objects {
            factory.surface_mut().add_object(object.clone());
        }

        for visual in &self.visuals {
            let options = BuilderOptions {
                count: visual.count,
                color: visual.color.clone(),
                shaper: visual
                    .shaper
                    .clone()
                    .unwrap_or_else(|| self.analysis.default_shaper.clone()),
                smoothing: self.analysis.smoothing,
            };
            let id = factory.build(&visual.variant, options)?;

            if let Some(transform) = &visual.transform {
                if let Some(builder) = factory.builder_mut(&id) {
                    builder.group_mut().set_transform(transform.clone());
                    builder.group_mut().set_coords();
                }
            }
        }

        Ok(factory)
    }
}

/// Settings applied to every analyser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub smoothing: Smoothing,
    /// Shaper for visuals that do not name one.
    pub default_shaper: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            smoothing: Smoothing::default(),
            default_shaper: DEFAULT_SHAPER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    pub background: Color,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            background: Color::BLACK,
        }
    }
}

impl SurfaceConfig {
    pub fn create(&self) -> Surface {
        Surface::new(self.width, self.height, self.background)
    }
}

/// One builder to add at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualConfig {
    pub variant: String,
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default)]
    pub color: ColorSpec,
    #[serde(default)]
    pub shaper: Option<String>,
    /// Overrides the variant's default placement.
    #[serde(default)]
    pub transform: Option<Transform>,
}

fn default_count() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AudioCanvasError;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.surface.width, 1280);
        assert_eq!(config.export.fps, 30);
        assert_eq!(config.analysis.smoothing, Smoothing { up: 0.2, down: 0.05 });
        assert_eq!(config.analysis.default_shaper, "Slope");
    }

    #[test]
    fn builds_a_populated_factory() {
        let config = AppConfig::from_json_str(
            r##"{
                "analysis": { "smoothing": { "up": 0.5, "down": 0.1 }, "default_shaper": "Peak" },
                "surface": { "width": 640, "height": 360, "background": "#101020" },
                "export": { "fps": 24, "max_frames": 10 },
                "objects": [
                    { "id": "frame", "primitive": {
                        "shape": { "kind": "rect", "width": 640.0, "height": 360.0 },
                        "x": 320.0, "y": 180.0, "fill": "#202040" } }
                ],
                "visuals": [
                    { "variant": "BarCircle", "count": 32,
                      "color": "linear-gradient(90deg, #ff0000 0%, #0000ff 100%)" },
                    { "variant": "DotLine", "shaper": "Slope",
                      "transform": { "left": 10.0, "top": 20.0, "scale_x": 2.0 } }
                ]
            }"##,
        )
        .unwrap();
        assert_eq!(config.export.max_frames, Some(10));

        let factory = config.build_factory().unwrap();
        let surface = factory.surface();
        assert_eq!((surface.width(), surface.height()), (640, 360));
        assert_eq!(surface.background(), Color::rgb(0x10, 0x10, 0x20));
        assert_eq!(surface.objects().count(), 1);

        let builders = factory.builders();
        assert_eq!(builders.len(), 2);
        assert_eq!(builders[0].element_count(), 32);
        assert_eq!(builders[0].shaper(), "Peak");
        assert!(builders[0].color().is_gradient());
        assert_eq!(builders[0].analyzer().smoothing(), Smoothing { up: 0.5, down: 0.1 });
        assert_eq!(builders[1].element_count(), 64);
        assert_eq!(builders[1].shaper(), "Slope");
        let transform = builders[1].group().transform();
        assert_eq!((transform.left, transform.top, transform.scale_x, transform.scale_y), (10.0, 20.0, 2.0, 1.0));
    }

    #[test]
    fn unknown_variant_fails_the_build() {
        let config = AppConfig::from_json_str(r#"{ "visuals": [ { "variant": "Spiral" } ] }"#).unwrap();
        assert!(matches!(
            config.build_factory(),
            Err(AudioCanvasError::UnknownVariant(name)) if name == "Spiral"
        ));
    }

    #[test]
    fn smoothing_factors_outside_unit_range_are_rejected() {
        let err = AppConfig::from_json_str(r#"{"analysis":{"smoothing":{"up":1.5,"down":-1.0}}}"#)
            .unwrap_err();
        assert!(matches!(err, AudioCanvasError::InvalidInput(_)));
        assert!(AppConfig::from_json_str(r#"{"analysis":{"smoothing":{"up":1.0,"down":0.0}}}"#).is_ok());
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(matches!(
            AppConfig::from_json_str(r#"{ "surface": { "background": "not a color" } }"#),
            Err(AudioCanvasError::Json(_))
        ));
        assert!(matches!(
            AppConfig::from_path("/definitely/not/here.json"),
            Err(AudioCanvasError::Io(_))
        ));
    }
}
