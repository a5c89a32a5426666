/// Matrix and vector helpers for the scene transform stack.
///
/// Matrices are stored as nalgebra types, but element `(i, j)` always
/// corresponds to index `4 * i + j` of the flat row-major array handed to
/// the rendering backend. Vectors are treated as row vectors, so a point is
/// transformed as `p * M` and composed transforms read left to right in
/// application order.
use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

use crate::error::AlgebraError;

pub type Mat4 = Matrix4<f32>;
pub type Mat3 = Matrix3<f32>;
pub type Vec3 = Vector3<f32>;

/// Vectors shorter than this normalize to zero.
pub const NORMALIZE_EPSILON: f32 = 1e-5;

pub fn identity() -> Mat4 {
    Mat4::identity()
}

pub fn translation(tx: f32, ty: f32, tz: f32) -> Mat4 {
    Mat4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        tx, ty, tz, 1.0,
    )
}

/// Rotation about X. `+sin` sits at row 1, column 2.
pub fn x_rotation(angle: f32) -> Mat4 {
    let (s, c) = angle.sin_cos();
    Mat4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, c, s, 0.0,
        0.0, -s, c, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

pub fn y_rotation(angle: f32) -> Mat4 {
    let (s, c) = angle.sin_cos();
    Mat4::new(
        c, 0.0, -s, 0.0,
        0.0, 1.0, 0.0, 0.0,
        s, 0.0, c, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

pub fn z_rotation(angle: f32) -> Mat4 {
    let (s, c) = angle.sin_cos();
    Mat4::new(
        c, s, 0.0, 0.0,
        -s, c, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

pub fn scaling(sx: f32, sy: f32, sz: f32) -> Mat4 {
    Mat4::new(
        sx, 0.0, 0.0, 0.0,
        0.0, sy, 0.0, 0.0,
        0.0, 0.0, sz, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Perspective projection for a vertical field of view in radians.
pub fn perspective(field_of_view: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = (std::f32::consts::FRAC_PI_2 - 0.5 * field_of_view).tan();
    let range_inv = 1.0 / (near - far);

    Mat4::new(
        f / aspect, 0.0, 0.0, 0.0,
        0.0, f, 0.0, 0.0,
        0.0, 0.0, (near + far) * range_inv, -1.0,
        0.0, 0.0, near * far * range_inv * 2.0, 0.0,
    )
}

/// Returns the transform equivalent to applying `a` first and then `b`.
///
/// Flat element `4 * i + j` of the result is `sum_t a[4 * i + t] * b[4 * t + j]`,
/// which is the ordinary product `a * b` under the row-major mapping.
pub fn multiply(b: &Mat4, a: &Mat4) -> Mat4 {
    a * b
}

pub fn translate(m: &Mat4, tx: f32, ty: f32, tz: f32) -> Mat4 {
    multiply(m, &translation(tx, ty, tz))
}

pub fn x_rotate(m: &Mat4, angle: f32) -> Mat4 {
    multiply(m, &x_rotation(angle))
}

pub fn y_rotate(m: &Mat4, angle: f32) -> Mat4 {
    multiply(m, &y_rotation(angle))
}

pub fn z_rotate(m: &Mat4, angle: f32) -> Mat4 {
    multiply(m, &z_rotation(angle))
}

pub fn scale(m: &Mat4, sx: f32, sy: f32, sz: f32) -> Mat4 {
    multiply(m, &scaling(sx, sy, sz))
}

/// General 4x4 inverse. A zero determinant is reported instead of
/// producing a matrix of NaNs.
pub fn inverse(m: &Mat4) -> Result<Mat4, AlgebraError> {
    m.try_inverse().ok_or(AlgebraError::Singular)
}

/// Normal matrix for `m`: the transposed upper 3x3 of its inverse.
///
/// Returns `None` when `m` is singular.
pub fn normal_from_mat4(m: &Mat4) -> Option<Mat3> {
    let inv = m.try_inverse()?;
    Some(inv.fixed_view::<3, 3>(0, 0).transpose())
}

pub fn normalize(v: &Vec3) -> Vec3 {
    let length = v.norm();
    if length > NORMALIZE_EPSILON {
        v / length
    } else {
        Vec3::zeros()
    }
}

pub fn radians(degrees: f32) -> f32 {
    degrees.to_radians()
}

/// Applies `m` to a point given as a row vector with `w = 1`.
pub fn transform_point(m: &Mat4, p: &Vec3) -> Vector4<f32> {
    m.transpose() * Vector4::new(p.x, p.y, p.z, 1.0)
}

/// Applies a normal matrix to a row-vector normal.
pub fn transform_normal(m: &Mat3, n: &Vec3) -> Vec3 {
    m.transpose() * n
}

/// Flat row-major copy of `m`, in the order the backend uploads it.
pub fn to_flat(m: &Mat4) -> [f32; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(m.transpose().as_slice());
    out
}

pub fn from_flat(flat: &[f32; 16]) -> Mat4 {
    Mat4::from_row_slice(flat)
}

pub fn mat3_to_flat(m: &Mat3) -> [f32; 9] {
    let mut out = [0.0; 9];
    out.copy_from_slice(m.transpose().as_slice());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_mat_eq(a: &Mat4, b: &Mat4) {
        assert!((a - b).norm() < 1e-5, "{a} != {b}");
    }

    /// Literal flat-array product used to pin the operand order.
    fn flat_multiply(b: &[f32; 16], a: &[f32; 16]) -> [f32; 16] {
        let mut out = [0.0; 16];
        for i in 0..4 {
            for j in 0..4 {
                let mut sum = 0.0;
                for t in 0..4 {
                    sum += a[4 * i + t] * b[4 * t + j];
                }
                out[4 * i + j] = sum;
            }
        }
        out
    }

    fn sample() -> Mat4 {
        from_flat(&[
            2.0, 0.5, 0.0, 1.0,
            -1.0, 3.0, 0.25, 0.0,
            0.0, 1.5, 1.0, -2.0,
            4.0, -3.0, 2.0, 1.0,
        ])
    }

    #[test]
    fn test_translation_layout() {
        let flat = to_flat(&translation(1.0, 2.0, 3.0));
        assert_eq!(&flat[12..15], &[1.0, 2.0, 3.0]);
        assert_eq!(flat[15], 1.0);
        assert_eq!(flat[3], 0.0);
    }

    #[test]
    fn test_x_rotation_sign_placement() {
        let angle = 0.3_f32;
        let flat = to_flat(&x_rotation(angle));
        assert!((flat[4 + 2] - angle.sin()).abs() < 1e-6);
        assert!((flat[2 * 4 + 1] + angle.sin()).abs() < 1e-6);
    }

    #[test]
    fn test_y_and_z_rotation_sign_placement() {
        let angle = 0.7_f32;
        let y = to_flat(&y_rotation(angle));
        assert!((y[2] + angle.sin()).abs() < 1e-6);
        assert!((y[8] - angle.sin()).abs() < 1e-6);
        let z = to_flat(&z_rotation(angle));
        assert!((z[1] - angle.sin()).abs() < 1e-6);
        assert!((z[4] + angle.sin()).abs() < 1e-6);
    }

    #[test]
    fn test_multiply_matches_flat_formula() {
        let a = sample();
        let b = x_rotate(&translation(0.5, -1.0, 2.0), 0.4);
        let expected = flat_multiply(&to_flat(&b), &to_flat(&a));
        let actual = to_flat(&multiply(&b, &a));
        for (x, y) in actual.iter().zip(expected.iter()) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_multiply_applies_right_operand_first() {
        // Translate then scale: (0,0,0) -> (1,0,0) -> (2,0,0)
        let m = multiply(&scaling(2.0, 2.0, 2.0), &translation(1.0, 0.0, 0.0));
        let p = transform_point(&m, &Vec3::zeros());
        assert!((p.x - 2.0).abs() < 1e-6);

        // Scale then translate keeps the offset unscaled
        let m = multiply(&translation(1.0, 0.0, 0.0), &scaling(2.0, 2.0, 2.0));
        let p = transform_point(&m, &Vec3::zeros());
        assert!((p.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_multiply_identity() {
        let m = sample();
        assert_mat_eq(&multiply(&identity(), &m), &m);
        assert_mat_eq(&multiply(&m, &identity()), &m);
    }

    #[test]
    fn test_translate_helper_is_post_multiply() {
        let m = x_rotation(0.5);
        assert_mat_eq(&translate(&m, 1.0, 2.0, 3.0), &multiply(&m, &translation(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_inverse_of_translation() {
        let inv = inverse(&translation(3.0, -2.0, 7.5)).unwrap();
        assert_mat_eq(&inv, &translation(-3.0, 2.0, -7.5));
    }

    #[test]
    fn test_inverse_round_trip() {
        let m = sample();
        let inv = inverse(&m).unwrap();
        assert_mat_eq(&multiply(&inv, &m), &identity());
    }

    #[test]
    fn test_inverse_singular() {
        let m = scaling(1.0, 0.0, 1.0);
        assert!(matches!(inverse(&m), Err(AlgebraError::Singular)));
    }

    #[test]
    fn test_normal_matrix_of_rotation_is_rotation() {
        let r = z_rotation(0.8);
        let n = normal_from_mat4(&r).unwrap();
        let upper: Mat3 = r.fixed_view::<3, 3>(0, 0).into_owned();
        assert!((n - upper).norm() < 1e-5);
    }

    #[test]
    fn test_normal_matrix_ignores_translation() {
        let n = normal_from_mat4(&translation(5.0, 6.0, 7.0)).unwrap();
        assert!((n - Mat3::identity()).norm() < 1e-6);
    }

    #[test]
    fn test_normal_matrix_nonuniform_scale() {
        let n = normal_from_mat4(&scaling(2.0, 1.0, 1.0)).unwrap();
        let flat = mat3_to_flat(&n);
        assert!((flat[0] - 0.5).abs() < 1e-6);
        assert!((flat[4] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normal_matrix_singular() {
        assert!(normal_from_mat4(&scaling(0.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn test_normalize() {
        let v = Vec3::new(3.0, 4.0, 0.0);
        let n = normalize(&v);
        assert!((n - Vec3::new(0.6, 0.8, 0.0)).norm() < 1e-6);
        assert!((normalize(&n) - n).norm() < 1e-6);
        assert_eq!(normalize(&Vec3::zeros()), Vec3::zeros());
        assert_eq!(normalize(&Vec3::new(1e-6, 0.0, 0.0)), Vec3::zeros());
    }

    #[test]
    fn test_perspective_layout() {
        let (near, far) = (1.0, 2000.0);
        let flat = to_flat(&perspective(radians(60.0), 1.5, near, far));
        assert_eq!(flat[11], -1.0);
        assert_eq!(flat[15], 0.0);
        assert!((flat[14] - 2.0 * near * far / (near - far)).abs() < 1e-3);
        let f = (std::f32::consts::FRAC_PI_2 - radians(30.0)).tan();
        assert!((flat[5] - f).abs() < 1e-5);
        assert!((flat[0] - f / 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_flat_round_trip() {
        let m = sample();
        assert_eq!(from_flat(&to_flat(&m)), m);
    }
}
