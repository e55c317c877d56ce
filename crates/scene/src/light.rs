//! Light sources.
//!
//! [`Light`] is a tagged union over the three supported kinds. Shared
//! fields live in [`LightCommon`]. Direction-to-light vectors are stored as
//! [`UnitDirection`], which normalizes on construction; that is the only way
//! to set one.

use glam::Vec3;

/// Default influence radius of point and spot lights.
pub const DEFAULT_MAX_DISTANCE: f32 = 20.0;

/// Normalized direction vector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitDirection(Vec3);

impl UnitDirection {
    /// Normalizes `v`.
    ///
    /// # Panics
    ///
    /// Panics if `v` has zero (or non-finite) length.
    pub fn new(v: Vec3) -> Self {
        match v.try_normalize() {
            Some(unit) => Self(unit),
            None => panic!("cannot normalize direction {:?}", v),
        }
    }

    #[inline]
    pub fn get(self) -> Vec3 {
        self.0
    }
}

impl Default for UnitDirection {
    fn default() -> Self {
        Self(Vec3::Y)
    }
}

/// Fields every light has.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightCommon {
    pub position: Vec3,
    pub color: Vec3,
}

impl Default for LightCommon {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: Vec3::ONE,
        }
    }
}

/// Infinitely distant light, e.g. the sun.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DirectionalLight {
    pub common: LightCommon,
    to_light: UnitDirection,
}

impl DirectionalLight {
    pub fn new(position: Vec3, direction_to_light: Vec3, color: Vec3) -> Self {
        Self {
            common: LightCommon { position, color },
            to_light: UnitDirection::new(direction_to_light),
        }
    }

    /// Unit vector pointing from lit surfaces towards the light.
    #[inline]
    pub fn direction_to_light(&self) -> Vec3 {
        self.to_light.get()
    }

    /// Stores `v` normalized.
    pub fn set_direction_to_light(&mut self, v: Vec3) {
        self.to_light = UnitDirection::new(v);
    }
}

/// Omnidirectional light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub common: LightCommon,
    pub max_distance: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            common: LightCommon::default(),
            max_distance: DEFAULT_MAX_DISTANCE,
        }
    }
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            common: LightCommon { position, color },
            ..Default::default()
        }
    }
}

/// Cone light.
///
/// Fade angles are stored as cosines so shaders can compare against a dot
/// product directly. Start must not exceed end; this is not enforced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotLight {
    pub common: LightCommon,
    to_light: UnitDirection,
    /// Axis of the cone.
    pub direction: Vec3,
    pub max_distance: f32,
    fade_start: f32,
    fade_end: f32,
    fade_end_radians: f32,
}

impl Default for SpotLight {
    fn default() -> Self {
        let mut light = Self {
            common: LightCommon::default(),
            to_light: UnitDirection::default(),
            direction: Vec3::NEG_Y,
            max_distance: DEFAULT_MAX_DISTANCE,
            fade_start: 1.0,
            fade_end: 1.0,
            fade_end_radians: 0.0,
        };
        light.set_fade_start_degrees(25.0);
        light.set_fade_end_degrees(35.0);
        light
    }
}

impl SpotLight {
    #[inline]
    pub fn direction_to_light(&self) -> Vec3 {
        self.to_light.get()
    }

    pub fn set_direction_to_light(&mut self, v: Vec3) {
        self.to_light = UnitDirection::new(v);
    }

    /// Cosine of the angle where the light starts fading.
    #[inline]
    pub fn fade_start(&self) -> f32 {
        self.fade_start
    }

    /// Cosine of the angle where the light reaches zero.
    #[inline]
    pub fn fade_end(&self) -> f32 {
        self.fade_end
    }

    #[inline]
    pub fn fade_end_radians(&self) -> f32 {
        self.fade_end_radians
    }

    pub fn set_fade_start_degrees(&mut self, degrees: f32) {
        self.fade_start = degrees.to_radians().cos();
    }

    pub fn set_fade_end_degrees(&mut self, degrees: f32) {
        self.fade_end_radians = degrees.to_radians();
        self.fade_end = self.fade_end_radians.cos();
    }

    /// True when the fade starts at a wider angle than it ends.
    #[inline]
    pub fn has_inverted_fade(&self) -> bool {
        self.fade_start < self.fade_end
    }
}

/// Any light source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Directional(DirectionalLight),
    Point(PointLight),
    Spot(SpotLight),
}

impl Light {
    pub fn common(&self) -> &LightCommon {
        match self {
            Self::Directional(l) => &l.common,
            Self::Point(l) => &l.common,
            Self::Spot(l) => &l.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut LightCommon {
        match self {
            Self::Directional(l) => &mut l.common,
            Self::Point(l) => &mut l.common,
            Self::Spot(l) => &mut l.common,
        }
    }
}

impl From<DirectionalLight> for Light {
    fn from(light: DirectionalLight) -> Self {
        Self::Directional(light)
    }
}

impl From<PointLight> for Light {
    fn from(light: PointLight) -> Self {
        Self::Point(light)
    }
}

impl From<SpotLight> for Light {
    fn from(light: SpotLight) -> Self {
        Self::Spot(light)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_to_light_is_normalized() {
        let mut light = DirectionalLight::default();
        light.set_direction_to_light(Vec3::new(0.0, 10.0, 0.0));

        let d = light.direction_to_light();
        assert!((d.length() - 1.0).abs() < 1e-6);
        assert!(d.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn test_constructor_normalizes_too() {
        let light = DirectionalLight::new(Vec3::ZERO, Vec3::new(3.0, 0.0, 4.0), Vec3::ONE);
        assert!(light.direction_to_light().abs_diff_eq(Vec3::new(0.6, 0.0, 0.8), 1e-6));
    }

    #[test]
    #[should_panic(expected = "cannot normalize")]
    fn test_zero_direction_panics() {
        UnitDirection::new(Vec3::ZERO);
    }

    #[test]
    fn test_spot_fade_end_stores_radians_and_cosine() {
        let mut light = SpotLight::default();
        light.set_fade_end_degrees(30.0);

        assert!((light.fade_end_radians() - 0.5236).abs() < 1e-4);
        assert!((light.fade_end() - 0.8660).abs() < 1e-4);
    }

    #[test]
    fn test_spot_fade_start_stores_cosine() {
        let mut light = SpotLight::default();
        light.set_fade_start_degrees(60.0);
        assert!((light.fade_start() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_inverted_fade_detected() {
        let mut light = SpotLight::default();
        assert!(!light.has_inverted_fade());

        light.set_fade_start_degrees(40.0);
        light.set_fade_end_degrees(20.0);
        assert!(light.has_inverted_fade());
    }

    #[test]
    fn test_default_max_distance() {
        assert_eq!(PointLight::default().max_distance, 20.0);
        assert_eq!(SpotLight::default().max_distance, 20.0);
    }

    #[test]
    fn test_common_fields_shared_across_variants() {
        let mut light: Light = PointLight::new(Vec3::X, Vec3::splat(0.5)).into();
        assert_eq!(light.common().position, Vec3::X);

        light.common_mut().color = Vec3::ONE;
        assert_eq!(light.common().color, Vec3::ONE);
    }
}
