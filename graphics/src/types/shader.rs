//! Shader stage and uniform value types.

/// Programmable shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderType {
    Vertex,
    Fragment,
}

impl ShaderType {
    /// All stages, in pipeline order.
    pub const ALL: [ShaderType; 2] = [ShaderType::Vertex, ShaderType::Fragment];

    /// Lowercase stage name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        }
    }

    /// File extension of sources for this stage.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Vertex => ".vsh",
            Self::Fragment => ".fsh",
        }
    }

    /// Guess the stage from a shader path.
    pub fn by_location(path: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|stage| path.ends_with(stage.extension()))
    }
}

/// Type of a declared uniform value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Int,
    IVec3,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Matrix4x4,
}

impl UniformType {
    /// Number of scalar components.
    pub fn count(&self) -> u32 {
        match self {
            Self::Int | Self::Float => 1,
            Self::Vec2 => 2,
            Self::IVec3 | Self::Vec3 => 3,
            Self::Vec4 => 4,
            Self::Matrix4x4 => 16,
        }
    }

    /// Size in bytes (all components are 32-bit).
    pub fn size_in_bytes(&self) -> u32 {
        self.count() * 4
    }

    /// Returns true if the components are integers.
    pub fn is_integer_data(&self) -> bool {
        matches!(self, Self::Int | Self::IVec3)
    }

    /// Name as written in pipeline descriptions.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::IVec3 => "ivec3",
            Self::Float => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::Matrix4x4 => "matrix4x4",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_type_by_location() {
        assert_eq!(
            ShaderType::by_location("shaders/core/position.vsh"),
            Some(ShaderType::Vertex)
        );
        assert_eq!(
            ShaderType::by_location("shaders/core/position.fsh"),
            Some(ShaderType::Fragment)
        );
        assert_eq!(ShaderType::by_location("shaders/core/position.json"), None);
    }

    #[test]
    fn test_uniform_sizes() {
        assert_eq!(UniformType::Matrix4x4.size_in_bytes(), 64);
        assert_eq!(UniformType::IVec3.count(), 3);
        assert!(UniformType::IVec3.is_integer_data());
        assert!(!UniformType::Vec3.is_integer_data());
        assert_eq!(UniformType::Vec4.name(), "vec4");
    }
}
