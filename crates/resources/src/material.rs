//! Material definitions.

/// Per-unit surface parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// 0.0 = mirror-smooth, 1.0 = fully rough.
    pub roughness: f32,
    /// 0.0 = dielectric, 1.0 = metal.
    pub metallic: f32,
    /// Albedo texture file name, relative to the model's asset namespace.
    pub albedo_map: String,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            roughness: 0.5,
            metallic: 0.0,
            albedo_map: String::new(),
        }
    }
}

impl Material {
    /// Asset path of the albedo map, looked up under `namespace` in any directory.
    ///
    /// Returns `None` when the material has no albedo map.
    pub fn albedo_map_path(&self, namespace: &str) -> Option<String> {
        if self.albedo_map.is_empty() {
            None
        } else {
            Some(format!("{}/?/{}", namespace, self.albedo_map))
        }
    }
}
