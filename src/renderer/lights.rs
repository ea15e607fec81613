use glam::Vec3;
use smallvec::SmallVec;

pub const MAX_POINT_LIGHTS: usize = 4;
pub const DEFAULT_LIGHT_DIRECTION: Vec3 = Vec3::new(-0.2, -1.0, -0.3);

/// Sun-style light. `direction` is the way the light travels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl DirectionalLight {
    /// A zero `direction` falls back to [`DEFAULT_LIGHT_DIRECTION`].
    pub fn new(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        let direction = direction.try_normalize().unwrap_or_else(|| DEFAULT_LIGHT_DIRECTION.normalize());
        Self { direction, color, intensity }
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(DEFAULT_LIGHT_DIRECTION, Vec3::ONE, 1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Distance at which the light has faded out completely. Zero or negative means unbounded.
    pub radius: f32,
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3, intensity: f32, radius: f32) -> Self {
        Self { position, color, intensity, radius }
    }

    /// Inverse-square falloff windowed by `saturate(1 - (d / r)^4)^2` so the light reaches
    /// exactly zero at its radius.
    pub fn attenuation(&self, distance: f32) -> f32 {
        let distance = distance.max(0.0);
        let inverse_square = 1.0 / (distance * distance + 1.0);
        if self.radius <= 0.0 {
            return inverse_square;
        }
        let ratio = distance / self.radius;
        let window = (1.0 - ratio.powi(4)).clamp(0.0, 1.0);
        window * window * inverse_square
    }
}

/// Lights submitted during one frame: the last directional light and at most
/// [`MAX_POINT_LIGHTS`] point lights.
#[derive(Clone, Debug, Default)]
pub struct LightAggregator {
    directional: DirectionalLight,
    points: SmallVec<[PointLight; MAX_POINT_LIGHTS]>,
    dropped: u32,
}

impl LightAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.directional = DirectionalLight::default();
        self.points.clear();
        self.dropped = 0;
    }

    pub fn set_directional(&mut self, light: DirectionalLight) {
        self.directional = light;
    }

    /// Returns false when the light was dropped because the list is full.
    pub fn push_point(&mut self, light: PointLight) -> bool {
        if self.points.len() >= MAX_POINT_LIGHTS {
            self.dropped += 1;
            log::trace!("[renderer] point light cap reached, dropping light at {:?}", light.position);
            return false;
        }
        self.points.push(light);
        true
    }

    pub fn directional(&self) -> &DirectionalLight {
        &self.directional
    }

    pub fn point_lights(&self) -> &[PointLight] {
        &self.points
    }

    pub fn dropped_point_lights(&self) -> u32 {
        self.dropped
    }
}
