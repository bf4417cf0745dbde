//! Target points in cylindrical and cartesian coordinates.
use core::f32::consts::PI;
#[cfg(not(test))]
use micromath::F32Ext;

/// Point around the vertical axis of the arm base.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CylindricalPoint {
    /// Horizontal distance from the vertical axis.
    pub radius: f32,
    /// Degrees from the positive X axis in the XY plane.
    pub angle: f32,
    /// Height above the base.
    pub height: f32,
}

impl CylindricalPoint {
    pub const fn new(radius: f32, angle: f32, height: f32) -> Self {
        Self {
            radius,
            angle,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CartesianPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl CartesianPoint {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<CartesianPoint> for CylindricalPoint {
    fn from(p: CartesianPoint) -> Self {
        Self {
            radius: (p.x.powi(2) + p.y.powi(2)).sqrt(),
            angle: p.y.atan2(p.x) * 180.0 / PI,
            height: p.z,
        }
    }
}

impl From<CylindricalPoint> for CartesianPoint {
    fn from(p: CylindricalPoint) -> Self {
        let angle = p.angle * PI / 180.0;
        Self {
            x: p.radius * angle.cos(),
            y: p.radius * angle.sin(),
            z: p.height,
        }
    }
}
