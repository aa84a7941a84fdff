#![allow(non_snake_case)]

//! Finite rotations represented by versors (unit quaternions).
//!
//! Composition is always left-multiplication of the increment,
//! `q_new = dq * q_old`, i.e. increments are spatial.

use crate::prelude::*;

/// Below this vector-part magnitude the logarithm uses its first-order form.
const SMALL_SINE: f64 = 1.0e-8;

/// Versor of a proper orthogonal matrix.
pub fn versor_from_matrix(R: &Matrix3) -> UnitQuaternion {
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*R))
}

/// Versor of the rotation vector `v` (axis times angle); identity for `v = 0`.
pub fn versor_from_vector(v: &Vector3) -> UnitQuaternion {
    UnitQuaternion::from_scaled_axis(*v)
}

/// Hamilton product `q1 * q2`: rotation `q2` followed by `q1`.
pub fn compose(q1: &UnitQuaternion, q2: &UnitQuaternion) -> UnitQuaternion {
    UnitQuaternion::new_normalize(q1.quaternion() * q2.quaternion())
}

pub fn matrix_from_versor(q: &UnitQuaternion) -> Matrix3 {
    q.to_rotation_matrix().into_inner()
}

/// Rotation vector of a versor.
///
/// The versor is mapped to the hemisphere `w >= 0` first, so the result has
/// magnitude in `[0, π]`. At exactly π the sign of the axis is arbitrary;
/// callers are expected to stay well below that.
pub fn log_versor(q: &UnitQuaternion) -> Vector3 {
    let (w, v) = if q.w < 0. {
        (-q.w, -q.imag())
    } else {
        (q.w, q.imag())
    };
    let s = v.norm();
    if s < SMALL_SINE {
        v * (2. / w)
    } else {
        v * (2. * s.atan2(w) / s)
    }
}

/// SO(3) logarithm of a rotation matrix.
pub fn log(R: &Matrix3) -> Vector3 {
    log_versor(&versor_from_matrix(R))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rodrigues(v: &Vector3) -> Matrix3 {
        let phi = v.norm();
        let vt = v.tilde();
        Matrix3::identity()
            + phi.sin() / phi * vt
            + (1. - phi.cos()) / phi.powi(2) * (vt * vt)
    }

    #[test]
    fn test_vector_to_matrix() {
        let v = Vector3::new(0.2, -0.7, 1.1);
        assert_relative_eq!(
            matrix_from_versor(&versor_from_vector(&v)),
            rodrigues(&v),
            epsilon = 1e-14
        );
        assert_relative_eq!(
            versor_from_vector(&Vector3::zeros()).wijk(),
            nalgebra::Vector4::new(1., 0., 0., 0.)
        );
    }

    #[test]
    fn test_matrix_round_trip() {
        let R = rodrigues(&Vector3::new(-1.3, 0.4, 2.2));
        assert_relative_eq!(
            matrix_from_versor(&versor_from_matrix(&R)),
            R,
            epsilon = 1e-13
        );
    }

    #[test]
    fn test_compose_order() {
        let q1 = versor_from_vector(&Vector3::new(0.5, 0., 0.));
        let q2 = versor_from_vector(&Vector3::new(0., 0., 0.8));
        let R12 = matrix_from_versor(&compose(&q1, &q2));
        assert_relative_eq!(
            R12,
            matrix_from_versor(&q1) * matrix_from_versor(&q2),
            epsilon = 1e-14
        );
        assert!((R12 - matrix_from_versor(&compose(&q2, &q1))).norm() > 1e-2);
    }

    #[test]
    fn test_log_inverts_exp() {
        for v in [
            Vector3::new(0.1, 0.2, -0.3),
            Vector3::new(1e-10, -2e-10, 0.),
            Vector3::new(-1.5, 1.9, 0.7),
            Vector3::zeros(),
        ] {
            assert_relative_eq!(log(&rodrigues_or_identity(&v)), v, epsilon = 1e-12);
            assert_relative_eq!(log_versor(&versor_from_vector(&v)), v, epsilon = 1e-12);
        }
    }

    fn rodrigues_or_identity(v: &Vector3) -> Matrix3 {
        if v.norm() == 0. {
            Matrix3::identity()
        } else {
            rodrigues(v)
        }
    }

    #[test]
    fn test_log_uses_short_hemisphere() {
        let q = versor_from_vector(&Vector3::new(0., 0.4, 0.));
        let flipped = UnitQuaternion::new_unchecked(-q.into_inner());
        assert_relative_eq!(log_versor(&flipped), log_versor(&q), epsilon = 1e-14);
    }

    #[test]
    fn test_repeated_composition_stays_unit() {
        let dq = versor_from_vector(&Vector3::new(1e-3, -2e-3, 5e-4));
        let mut q = versor_from_vector(&Vector3::new(0.3, 0.1, -0.2));
        for _ in 0..10_000 {
            q = compose(&dq, &q);
        }
        assert_relative_eq!(q.wijk().norm(), 1., epsilon = 1e-12);
    }
}
