//! 3D Math Utilities for Demoscene Effects
//!
//! Vectors, axis rotations, perspective projection and the cube wireframe.

use std::ops::{Add, Mul, Sub};

/// 3D Vector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Approximate equality check for floating point comparison
    #[inline]
    pub fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self.x - other.x).abs() < epsilon
            && (self.y - other.y).abs() < epsilon
            && (self.z - other.z).abs() < epsilon
    }

    /// Rotate around X axis
    #[inline]
    pub fn rotate_x(&self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x,
            y: self.y * cos - self.z * sin,
            z: self.y * sin + self.z * cos,
        }
    }

    /// Rotate around Y axis
    #[inline]
    pub fn rotate_y(&self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos + self.z * sin,
            y: self.y,
            z: -self.x * sin + self.z * cos,
        }
    }

    /// Rotate around Z axis
    #[inline]
    pub fn rotate_z(&self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
            z: self.z,
        }
    }

    /// X, then Y, then Z
    #[inline]
    pub fn rotate_xyz(&self, rx: f32, ry: f32, rz: f32) -> Self {
        self.rotate_x(rx).rotate_y(ry).rotate_z(rz)
    }
}

impl Add for Vec3 {
    type Output = Self;
    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    #[inline]
    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

/// 2D Vector (screen space and particle physics)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector at `angle` radians scaled by `length`
    #[inline]
    pub fn from_angle(angle: f32, length: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(cos * length, sin * length)
    }
}

impl Add for Vec2 {
    type Output = Self;
    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    #[inline]
    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

/// A point after perspective projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub x: f32,
    pub y: f32,
    /// Camera-space depth
    pub z: f32,
}

/// Project a camera-space point onto the screen.
///
/// `focal` is the eye-to-plane distance in world units and `scale` maps
/// world units to pixels. Points at or behind the eye (z <= 0.01) give `None`.
#[inline]
pub fn project(point: Vec3, focal: f32, scale: f32, cx: f32, cy: f32) -> Option<Projected> {
    if point.z <= 0.01 {
        return None;
    }
    let k = focal / point.z * scale;
    Some(Projected {
        x: cx + point.x * k,
        y: cy + point.y * k,
        z: point.z,
    })
}

// ============================================================================
// Cube wireframe
// ============================================================================

/// Unit cube corners, centred on the origin with side 2
pub const CUBE_VERTICES: [Vec3; 8] = [
    Vec3::new(-1.0, -1.0, -1.0), // 0: back-bottom-left
    Vec3::new(1.0, -1.0, -1.0),  // 1: back-bottom-right
    Vec3::new(1.0, 1.0, -1.0),   // 2: back-top-right
    Vec3::new(-1.0, 1.0, -1.0),  // 3: back-top-left
    Vec3::new(-1.0, -1.0, 1.0),  // 4: front-bottom-left
    Vec3::new(1.0, -1.0, 1.0),   // 5: front-bottom-right
    Vec3::new(1.0, 1.0, 1.0),    // 6: front-top-right
    Vec3::new(-1.0, 1.0, 1.0),   // 7: front-top-left
];

/// Vertex index pairs for the cube's 12 edges
pub const CUBE_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_quarter_turns() {
        let v = Vec3::new(1.0, 0.0, 0.0);
        assert!(v.rotate_z(FRAC_PI_2).approx_eq(&Vec3::new(0.0, 1.0, 0.0), 1e-6));
        assert!(v.rotate_y(FRAC_PI_2).approx_eq(&Vec3::new(0.0, 0.0, -1.0), 1e-6));
        let up = Vec3::new(0.0, 1.0, 0.0);
        assert!(up.rotate_x(FRAC_PI_2).approx_eq(&Vec3::new(0.0, 0.0, 1.0), 1e-6));
    }

    #[test]
    fn test_project_rejects_points_behind_eye() {
        assert!(project(Vec3::new(1.0, 1.0, 0.0), 4.0, 10.0, 0.0, 0.0).is_none());
        assert!(project(Vec3::new(1.0, 1.0, -3.0), 4.0, 10.0, 0.0, 0.0).is_none());

        let p = project(Vec3::new(1.0, -1.0, 4.0), 4.0, 10.0, 50.0, 50.0).expect("in front");
        assert_eq!((p.x, p.y, p.z), (60.0, 40.0, 4.0));
    }

    #[test]
    fn test_cube_edges_have_unit_length_in_one_axis() {
        for (a, b) in CUBE_EDGES {
            let d = CUBE_VERTICES[a] - CUBE_VERTICES[b];
            let changed = [d.x, d.y, d.z].iter().filter(|c| c.abs() > 0.0).count();
            assert_eq!(changed, 1, "edge {a}-{b}");
        }
    }
}
