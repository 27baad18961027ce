use glam::{Vec3, Vec4};

/// Triangle corners in normalized device coordinates.
pub const TRIANGLE_POSITIONS: [Vec3; 3] = [
    Vec3::new(0.0, 0.5, 0.0),
    Vec3::new(-0.5, -0.5, 0.0),
    Vec3::new(0.5, -0.5, 0.0),
];

/// One saturated primary per corner: red, green, blue.
pub const TRIANGLE_COLORS: [Vec4; 3] = [
    Vec4::new(1.0, 0.0, 0.0, 1.0),
    Vec4::new(0.0, 1.0, 0.0, 1.0),
    Vec4::new(0.0, 0.0, 1.0, 1.0),
];

pub const POSITION_COMPONENTS: u32 = 3;
pub const COLOR_COMPONENTS: u32 = 4;

/// Flattened position data, three floats per vertex.
pub fn position_data() -> Vec<f32> {
    TRIANGLE_POSITIONS.iter().flat_map(|p| p.to_array()).collect()
}

/// Flattened RGBA data, four floats per vertex.
pub fn color_data() -> Vec<f32> {
    TRIANGLE_COLORS.iter().flat_map(|c| c.to_array()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_data_is_flat() {
        #[rustfmt::skip]
        let expected: [f32; 9] = [
            0.0, 0.5, 0.0,
            -0.5, -0.5, 0.0,
            0.5, -0.5, 0.0,
        ];
        assert_eq!(position_data(), expected);
    }

    #[test]
    fn color_data_is_flat() {
        #[rustfmt::skip]
        let expected: [f32; 12] = [
            1.0, 0.0, 0.0, 1.0,
            0.0, 1.0, 0.0, 1.0,
            0.0, 0.0, 1.0, 1.0,
        ];
        assert_eq!(color_data(), expected);
    }
}
