//! Scene settings
//!
//! Every tunable of the demo lives here. Missing JSON fields fall back to the
//! defaults in [`crate::consts`], so partial files are fine. Persisted in
//! LocalStorage on the web.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// Half-open sampling range `[min, max)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// A span that always samples `value`
    pub const fn fixed(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Uniform sample; collapsed spans return `min`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.max <= self.min {
            self.min
        } else {
            rng.random_range(self.min..self.max)
        }
    }
}

/// The breakable wall
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WallSettings {
    /// Half-extents (width, height, depth)
    pub half_extents: Vec3,
    /// Center of the wall box
    pub position: Vec3,
}

impl Default for WallSettings {
    fn default() -> Self {
        Self {
            half_extents: Vec3::new(WALL_HALF_WIDTH, WALL_HALF_HEIGHT, WALL_HALF_DEPTH),
            position: Vec3::from_array(WALL_POSITION),
        }
    }
}

/// The floor plane
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorSettings {
    pub position: Vec3,
    pub width: f32,
    pub depth: f32,
}

impl Default for FloorSettings {
    fn default() -> Self {
        Self {
            position: Vec3::from_array(FLOOR_POSITION),
            width: FLOOR_WIDTH,
            depth: FLOOR_DEPTH,
        }
    }
}

/// Ball size and the ranges its start state is drawn from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BallSettings {
    pub radius: f32,
    pub start_x: Span,
    pub start_y: Span,
    pub start_z: Span,
    pub velocity_x: Span,
    pub velocity_y: Span,
    pub velocity_z: Span,
}

impl Default for BallSettings {
    fn default() -> Self {
        Self {
            radius: BALL_RADIUS,
            start_x: Span::new(-9.0, -5.0),
            start_y: Span::new(1.0, 5.0),
            start_z: Span::fixed(0.0),
            velocity_x: Span::new(0.0, 0.35),
            velocity_y: Span::fixed(0.06),
            velocity_z: Span::fixed(0.0),
        }
    }
}

/// Per-frame integration constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Added to vertical velocity each frame (negative is down)
    pub gravity: f32,
    pub damping: f32,
    pub fragment_damping: f32,
    pub friction: f32,
    pub rest_threshold: f32,
    pub slide_epsilon: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            damping: DAMPING,
            fragment_damping: FRAGMENT_DAMPING,
            friction: FRICTION,
            rest_threshold: REST_THRESHOLD,
            slide_epsilon: SLIDE_EPSILON,
        }
    }
}

/// Thresholds and fragment generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FractureSettings {
    pub v_bounce: f32,
    pub v_break: f32,
    pub fragment_count: usize,
    pub min_height: f32,
    pub max_height: f32,
    pub speed_factor: f32,
    pub jitter: f32,
    /// Relative weights of thin slab, shard and full slab
    pub shape_weights: [u32; 3],
}

impl Default for FractureSettings {
    fn default() -> Self {
        Self {
            v_bounce: V_BOUNCE,
            v_break: V_BREAK,
            fragment_count: MAX_FRAGMENTS,
            min_height: FRAGMENT_MIN_HEIGHT,
            max_height: FRAGMENT_MAX_HEIGHT,
            speed_factor: FRAGMENT_SPEED_FACTOR,
            jitter: FRAGMENT_JITTER,
            shape_weights: [33, 33, 34],
        }
    }
}

/// Orbit camera and projection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    /// Radians per pixel of drag
    pub sensitivity: f32,
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            distance: CAMERA_DISTANCE,
            yaw: CAMERA_YAW,
            pitch: CAMERA_PITCH,
            sensitivity: CAMERA_SENSITIVITY,
            fov_y_degrees: FOV_Y_DEGREES,
            z_near: Z_NEAR,
            z_far: Z_FAR,
        }
    }
}

/// Texture sources, resolved by the platform layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSettings {
    pub ball: String,
    pub floor: String,
    pub wall: String,
    pub broken_wall: String,
    pub background: String,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            ball: "image.png".into(),
            floor: "floor.png".into(),
            wall: "wall.png".into(),
            broken_wall: "brokenwall.png".into(),
            background: "background.png".into(),
        }
    }
}

/// Complete scene configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub wall: WallSettings,
    pub floor: FloorSettings,
    pub ball: BallSettings,
    pub physics: PhysicsSettings,
    pub fracture: FractureSettings,
    pub camera: CameraSettings,
    pub textures: TextureSettings,
}

impl Settings {
    /// Parse and validate settings from JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a JSON file
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check every range the simulation relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = self.wall.half_extents;
        if w.min_element() <= 0.0 {
            return Err(ConfigError::invalid(
                "wall.half_extents",
                format!("all extents must be positive, got {w}"),
            ));
        }
        if self.floor.width <= 0.0 || self.floor.depth <= 0.0 {
            return Err(ConfigError::invalid(
                "floor",
                "width and depth must be positive",
            ));
        }
        if self.ball.radius <= 0.0 {
            return Err(ConfigError::invalid("ball.radius", "must be positive"));
        }
        let spans = [
            ("ball.start_x", self.ball.start_x),
            ("ball.start_y", self.ball.start_y),
            ("ball.start_z", self.ball.start_z),
            ("ball.velocity_x", self.ball.velocity_x),
            ("ball.velocity_y", self.ball.velocity_y),
            ("ball.velocity_z", self.ball.velocity_z),
        ];
        for (field, span) in spans {
            if span.max < span.min {
                return Err(ConfigError::invalid(
                    field,
                    format!("max {} is below min {}", span.max, span.min),
                ));
            }
        }

        let p = &self.physics;
        for (field, value) in [
            ("physics.damping", p.damping),
            ("physics.fragment_damping", p.fragment_damping),
            ("physics.friction", p.friction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(field, "must lie in [0, 1]"));
            }
        }

        let f = &self.fracture;
        if f.v_bounce >= f.v_break {
            return Err(ConfigError::invalid(
                "fracture.v_bounce",
                format!("must be below v_break ({})", f.v_break),
            ));
        }
        if f.fragment_count > MAX_FRAGMENTS {
            return Err(ConfigError::invalid(
                "fracture.fragment_count",
                format!("at most {MAX_FRAGMENTS} fragments"),
            ));
        }
        if f.min_height <= 0.0 || f.min_height > f.max_height {
            return Err(ConfigError::invalid(
                "fracture.min_height",
                "must be positive and not above max_height",
            ));
        }
        if f.shape_weights.iter().all(|&w| w == 0) {
            return Err(ConfigError::invalid(
                "fracture.shape_weights",
                "at least one weight must be non-zero",
            ));
        }

        if self.camera.distance <= 0.0 {
            return Err(ConfigError::invalid("camera.distance", "must be positive"));
        }
        if self.camera.z_near <= 0.0 || self.camera.z_near >= self.camera.z_far {
            return Err(ConfigError::invalid(
                "camera.z_near",
                "must be positive and below z_far",
            ));
        }
        Ok(())
    }

    /// LocalStorage key
    const STORAGE_KEY: &'static str = "shatter_wall_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {e}"),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native: settings come from the optional file argument instead
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        log::debug!("No settings storage on native ({})", Self::STORAGE_KEY);
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_defaults_are_valid() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{ "physics": { "gravity": -0.004 } }"#).unwrap();
        assert_eq!(settings.physics.gravity, -0.004);
        assert_eq!(settings.physics.damping, DAMPING);
        assert_eq!(settings.wall.position, Vec3::new(3.0, 2.5, 0.0));
        assert_eq!(settings.fracture.fragment_count, 30);
    }

    #[test]
    fn test_thresholds_must_be_ordered() {
        let err = Settings::from_json(r#"{ "fracture": { "v_bounce": 0.3, "v_break": 0.25 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "fracture.v_bounce",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_oversized_batch() {
        let mut settings = Settings::default();
        settings.fracture.fragment_count = 31;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_flat_wall() {
        let mut settings = Settings::default();
        settings.wall.half_extents.y = 0.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Settings::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_span_sampling() {
        let mut rng = Pcg32::seed_from_u64(7);
        let span = Span::new(-9.0, -5.0);
        for _ in 0..200 {
            let x = span.sample(&mut rng);
            assert!((-9.0..-5.0).contains(&x));
        }
        assert_eq!(Span::fixed(0.06).sample(&mut rng), 0.06);
    }
}
