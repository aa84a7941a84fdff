#![allow(non_snake_case)]

use nalgebra::{SMatrix, SVector};

pub use itertools::{izip, Itertools};
pub use std::ops::AddAssign;

//------------------------------------------------------------------------------
// Types
//------------------------------------------------------------------------------

/// Matrix (3 x 3)
pub type Matrix3 = nalgebra::Matrix3<f64>;

/// Matrix (3 x element DOFs)
pub type Matrix3x12 = SMatrix<f64, 3, 12>;

/// Row vector (element DOFs)
pub type Matrix1x12 = SMatrix<f64, 1, 12>;

/// Matrix (element DOFs x element DOFs)
pub type Matrix12 = SMatrix<f64, 12, 12>;

pub type Vector3 = nalgebra::Vector3<f64>;
pub type Vector6 = nalgebra::Vector6<f64>;

/// Column vector (element DOFs)
pub type Vector12 = SVector<f64, 12>;

pub type Quaternion = nalgebra::Quaternion<f64>;
pub type UnitQuaternion = nalgebra::UnitQuaternion<f64>;

pub type Rotation3 = nalgebra::Rotation3<f64>;

//------------------------------------------------------------------------------
// Traits
//------------------------------------------------------------------------------

/// Below this angle the SO(3) Jacobian coefficients use their Taylor series.
const SMALL_ANGLE: f64 = 1.0e-3;

/// Same for the coefficient derivatives, whose closed forms cancel badly.
const SMALL_ANGLE_GRAD: f64 = 0.3;

pub trait RotVecExt {
    fn tilde(&self) -> Matrix3;
    fn tangent_matrix(&self) -> Matrix3;
    fn tangent_matrix_inv(&self) -> Matrix3;
    fn tangent_matrix_grad(&self, y: &Vector3) -> Matrix3;
    fn tangent_matrix_inv_grad(&self, y: &Vector3) -> Matrix3;
}

/// Coefficients of the left Jacobian `I + c1 W + c2 W²` and `c'(φ)/φ`.
fn tangent_coefficients(phi: f64) -> (f64, f64, f64, f64) {
    let p2 = phi * phi;
    let (c1, c2) = if phi < SMALL_ANGLE {
        (
            0.5 - p2 / 24. + p2 * p2 / 720.,
            1. / 6. - p2 / 120. + p2 * p2 / 5040.,
        )
    } else {
        ((1. - phi.cos()) / p2, (1. - phi.sin() / phi) / p2)
    };
    let (dc1, dc2) = if phi < SMALL_ANGLE_GRAD {
        let p4 = p2 * p2;
        (
            -1. / 12. + p2 / 180. - p4 / 6720. + p4 * p2 / 453600.,
            -1. / 60. + p2 / 1260. - p4 / 60480. + p4 * p2 / 4989600.,
        )
    } else {
        ((phi.sin() / phi - 2. * c1) / p2, (c1 - 3. * c2) / p2)
    };
    (c1, c2, dc1, dc2)
}

/// Coefficient of `W²` in the inverse left Jacobian and `c'(φ)/φ`.
fn tangent_inv_coefficients(phi: f64) -> (f64, f64) {
    let p2 = phi * phi;
    let c = if phi < SMALL_ANGLE {
        1. / 12. + p2 / 720. + p2 * p2 / 30240.
    } else {
        1. / p2 - (1. + phi.cos()) / (2. * phi * phi.sin())
    };
    let dc = if phi < SMALL_ANGLE_GRAD {
        let p4 = p2 * p2;
        1. / 360. + p2 / 7560. + p4 / 201600. + p4 * p2 / 5987520.
    } else {
        let s = (0.5 * phi).sin();
        -2. / (p2 * p2) + 1. / ((0.5 * phi).tan() * 2. * p2 * phi) + 1. / (4. * p2 * s * s)
    };
    (c, dc)
}

/// Gradient of `(I + c1 W(v) + c2 W(v)²)ᵀ y` with respect to `v`.
fn transposed_product_grad(v: &Vector3, y: &Vector3, c: (f64, f64, f64, f64)) -> Matrix3 {
    let (c1, c2, dc1, dc2) = c;
    let vy = v.cross(y);
    let vvy = v.cross(&vy);
    c1 * y.tilde() - dc1 * vy * v.transpose()
        + c2 * (v * y.transpose() + v.dot(y) * Matrix3::identity() - 2. * y * v.transpose())
        + dc2 * vvy * v.transpose()
}

impl RotVecExt for Vector3 {
    fn tilde(&self) -> Matrix3 {
        Matrix3::new(
            0.0, -self[2], self[1], self[2], 0.0, -self[0], -self[1], self[0], 0.0,
        )
    }

    /// Left Jacobian of the exponential map: `d exp(v) = tilde(T(v) dv) exp(v)`.
    fn tangent_matrix(&self) -> Matrix3 {
        let (c1, c2, _, _) = tangent_coefficients(self.magnitude());
        let vt = self.tilde();
        Matrix3::identity() + c1 * vt + c2 * (vt * vt)
    }

    /// Inverse of [`RotVecExt::tangent_matrix`]; singular at |v| = 2π.
    fn tangent_matrix_inv(&self) -> Matrix3 {
        let (c, _) = tangent_inv_coefficients(self.magnitude());
        let vt = self.tilde();
        Matrix3::identity() - 0.5 * vt + c * (vt * vt)
    }

    /// `∂(T(v)ᵀ y) / ∂v`
    fn tangent_matrix_grad(&self, y: &Vector3) -> Matrix3 {
        transposed_product_grad(self, y, tangent_coefficients(self.magnitude()))
    }

    /// `∂(T(v)⁻ᵀ y) / ∂v`
    fn tangent_matrix_inv_grad(&self, y: &Vector3) -> Matrix3 {
        let (c, dc) = tangent_inv_coefficients(self.magnitude());
        transposed_product_grad(self, y, (-0.5, c, 0., dc))
    }
}

pub trait QuatExt {
    fn wijk(&self) -> nalgebra::Vector4<f64>;
}

impl QuatExt for UnitQuaternion {
    fn wijk(&self) -> nalgebra::Vector4<f64> {
        nalgebra::Vector4::new(self.w, self.i, self.j, self.k)
    }
}
