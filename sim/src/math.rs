//! Vector and matrix helpers on top of `glam`.
//!
//! Angles handed to this module are in degrees, matching the units the flight
//! controls and configuration use. Everything here is pure and stateless.

use glam::{Mat4, Quat, Vec3, Vec4};

/// World up axis.
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Base forward axis of an unrotated aircraft.
pub const BASE_FORWARD: Vec3 = Vec3::NEG_Z;

/// Quaternion rotating `degrees` around `axis`. The axis is normalized here.
pub fn axis_angle(axis: Vec3, degrees: f32) -> Quat {
    match axis.try_normalize() {
        Some(axis) => Quat::from_axis_angle(axis, degrees.to_radians()),
        None => Quat::IDENTITY,
    }
}

/// Rotate `v` around `axis` by `degrees` (right-handed).
pub fn rotate_about(v: Vec3, axis: Vec3, degrees: f32) -> Vec3 {
    axis_angle(axis, degrees) * v
}

/// Rotation-only matrix whose columns are `right`, `up` and `forward`.
///
/// Local +Z is mapped onto `forward`. `right = up x forward` and the up axis is
/// re-orthogonalised as `forward x right`. If `forward` is zero the identity is
/// returned; if it is parallel to `up` an alternate up axis is used.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Mat4 {
    let Some(forward) = forward.try_normalize() else {
        return Mat4::IDENTITY;
    };
    let right = match up.cross(forward).try_normalize() {
        Some(right) => right,
        None => {
            let alternate = if forward.z.abs() < 0.9 { Vec3::Z } else { Vec3::X };
            alternate.cross(forward).normalize()
        }
    };
    let up = forward.cross(right).normalize();

    Mat4::from_cols(
        right.extend(0.0),
        up.extend(0.0),
        forward.extend(0.0),
        Vec4::W,
    )
}

/// Compose translate * rotate * scale.
pub fn model_matrix(position: Vec3, rotation: Mat4, scale: f32) -> Mat4 {
    translate(position) * rotation * scale_uniform(scale)
}

pub fn translate(offset: Vec3) -> Mat4 {
    Mat4::from_translation(offset)
}

pub fn scale_uniform(factor: f32) -> Mat4 {
    Mat4::from_scale(Vec3::splat(factor))
}

pub fn rotate_x(degrees: f32) -> Mat4 {
    Mat4::from_rotation_x(degrees.to_radians())
}

pub fn rotate_y(degrees: f32) -> Mat4 {
    Mat4::from_rotation_y(degrees.to_radians())
}

pub fn rotate_z(degrees: f32) -> Mat4 {
    Mat4::from_rotation_z(degrees.to_radians())
}

/// Base world-to-view rotation (90 degrees about X) that renderers compose
/// with their own axis flips for z-up model data.
pub fn world_to_gl() -> Mat4 {
    rotate_x(90.0)
}

/// Lift a point into homogeneous coordinates (w = 1).
pub fn to_homogeneous(point: Vec3) -> Vec4 {
    point.extend(1.0)
}

/// Apply a full 4x4 transform to a point, dividing by w when needed.
pub fn transform_point(matrix: Mat4, point: Vec3) -> Vec3 {
    let h = matrix * to_homogeneous(point);
    if h.w.abs() > f32::EPSILON {
        h.truncate() / h.w
    } else {
        h.truncate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_rotate_about_yaw_left() {
        let turned = rotate_about(BASE_FORWARD, WORLD_UP, 90.0);
        assert!(approx(turned, Vec3::NEG_X), "got {:?}", turned);
    }

    #[test]
    fn test_look_rotation_maps_z_to_forward() {
        let forward = Vec3::new(1.0, 0.0, 1.0).normalize();
        let m = look_rotation(forward, WORLD_UP);
        assert!(approx(m.transform_vector3(Vec3::Z), forward));

        // Columns stay orthonormal.
        let right = m.x_axis.truncate();
        let up = m.y_axis.truncate();
        assert!(right.dot(up).abs() < 1e-5);
        assert!((up.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_look_rotation_degenerate_inputs() {
        assert_eq!(look_rotation(Vec3::ZERO, WORLD_UP), Mat4::IDENTITY);

        let m = look_rotation(Vec3::Y, WORLD_UP);
        assert!(approx(m.transform_vector3(Vec3::Z), Vec3::Y));
    }

    #[test]
    fn test_model_matrix_order() {
        let m = model_matrix(Vec3::new(10.0, 0.0, 0.0), rotate_y(90.0), 2.0);
        // Scale first, then rotate +X onto -Z, then translate.
        let p = transform_point(m, Vec3::X);
        assert!(approx(p, Vec3::new(10.0, 0.0, -2.0)), "got {:?}", p);
    }

    #[test]
    fn test_world_to_gl_maps_z_up_to_y_up() {
        let p = transform_point(world_to_gl(), Vec3::Z);
        assert!(approx(p, Vec3::NEG_Y));
        assert!(approx(transform_point(world_to_gl(), Vec3::Y), Vec3::Z));
    }
}
