#![allow(non_snake_case)]

//! Crisfield's mean-rotation isometry.
//!
//! The nodal rotations `R_I`, `R_J` are averaged on SO(3),
//!
//! ```text
//! γ  = Log(R_J R_Iᵀ)
//! Rm = exp(γ/2) R_I
//! ```
//!
//! and the corotated triad `Rbar = [r1 r2 r3]` is obtained by aligning `r1`
//! with the deformed chord and orthogonalizing the second axis `m` of `Rm`
//! against it. Both nodal rotations measured against `Rbar` are then
//! balanced around the chord.
//!
//! All variations are taken with respect to the element DOFs
//! `[u_I α_I u_J α_J]`, where the rotational DOFs are spatial increments.

use crate::error::{Result, TransformError};
use crate::prelude::*;
use crate::rotation::{compose, log_versor, matrix_from_versor, versor_from_vector};

use super::{IMX, JMX, JNX};

/// Column of the first rotational DOF of each end node.
const ROT: [usize; 2] = [3, 9];

#[derive(Debug, Clone)]
pub struct CrisfieldIsometry {
    nodes: [usize; 2],
    /// Corotated triad
    Rbar: Matrix3,
    /// Mean nodal rotation
    Rm: Matrix3,
    /// `Log(R_J R_Iᵀ)`
    gamma: Vector3,
    /// Deformed chord length
    Ln: f64,
    /// Rigid offsets in the current configuration
    c: [Vector3; 2],
    /// `(m·r1) / (m·r2)` with `m` the second axis of `Rm`
    eta: f64,
    /// Spin of `Rm`: `δω_m = B δα_I + A δα_J`
    A: Matrix3,
    B: Matrix3,
    /// Chord variation `δdx = D δd`
    D: Matrix3x12,
    /// `δω_m = Mw δd`
    Mw: Matrix3x12,
    /// Spin of `Rbar` in its own axes: `Rbarᵀ δω = G δd`
    G: Matrix3x12,
}

impl Default for CrisfieldIsometry {
    fn default() -> Self {
        CrisfieldIsometry {
            nodes: [0, 1],
            Rbar: Matrix3::identity(),
            Rm: Matrix3::identity(),
            gamma: Vector3::zeros(),
            Ln: 0.,
            c: [Vector3::zeros(); 2],
            eta: 0.,
            A: 0.5 * Matrix3::identity(),
            B: 0.5 * Matrix3::identity(),
            D: Matrix3x12::zeros(),
            Mw: Matrix3x12::zeros(),
            G: Matrix3x12::zeros(),
        }
    }
}

impl CrisfieldIsometry {
    /// Reset to the reference configuration of an element with `num_nodes`
    /// nodes; the first and last are the endpoints.
    pub fn initialize(&mut self, num_nodes: usize, R0: &Matrix3, L: f64) {
        *self = CrisfieldIsometry {
            nodes: [0, num_nodes.saturating_sub(1)],
            Rbar: *R0,
            Rm: *R0,
            Ln: L,
            ..Default::default()
        };
    }

    pub fn endpoints(&self) -> [usize; 2] {
        self.nodes
    }

    pub fn update(
        &mut self,
        QI: &UnitQuaternion,
        QJ: &UnitQuaternion,
        dx: &Vector3,
        offsets: &[Vector3; 2],
    ) -> Result<()> {
        let Ln = dx.norm();
        if Ln == 0. {
            return Err(TransformError::DegenerateGeometry(
                "deformed chord has zero length".into(),
            ));
        }

        // Mean of the nodal rotations
        let dQ = compose(QJ, &QI.inverse());
        let gamma = log_versor(&dQ);
        let Qh = versor_from_vector(&(0.5 * gamma));
        let Rm = matrix_from_versor(&compose(&Qh, QI));

        let A = 0.5 * (0.5 * gamma).tangent_matrix() * gamma.tangent_matrix_inv();
        let B = matrix_from_versor(&Qh) - A * matrix_from_versor(&dQ);

        // Corotated triad
        let r1 = dx / Ln;
        let m = Vector3::from(Rm.column(1));
        let n = r1.cross(&m);
        let n_norm = n.norm();
        if n_norm == 0. {
            return Err(TransformError::DegenerateGeometry(
                "deformed chord is parallel to the mean section axis".into(),
            ));
        }
        let r3 = n / n_norm;
        let r2 = r3.cross(&r1);
        let eta = m.dot(&r1) / m.dot(&r2);

        let mut D = Matrix3x12::zeros();
        D.fixed_view_mut::<3, 3>(0, 0).copy_from(&(-Matrix3::identity()));
        D.fixed_view_mut::<3, 3>(0, 3).copy_from(&offsets[0].tilde());
        D.fixed_view_mut::<3, 3>(0, 6).copy_from(&Matrix3::identity());
        D.fixed_view_mut::<3, 3>(0, 9).copy_from(&(-offsets[1].tilde()));

        let mut Mw = Matrix3x12::zeros();
        Mw.fixed_view_mut::<3, 3>(0, ROT[0]).copy_from(&B);
        Mw.fixed_view_mut::<3, 3>(0, ROT[1]).copy_from(&A);

        // Spin of the triad: chord rotation about r2, r3 and the
        // mean twist, corrected for the skew of m about r1
        let mut Gx = Matrix3::zeros();
        Gx.set_row(0, &(-eta / Ln * r3.transpose()));
        Gx.set_row(1, &(-r3.transpose() / Ln));
        Gx.set_row(2, &(r2.transpose() / Ln));
        let mut Gm = Matrix3::zeros();
        Gm.set_row(0, &(r1 - eta * r2).transpose());

        self.G = Gx * D + Gm * Mw;
        self.Rbar = Matrix3::from_columns(&[r1, r2, r3]);
        self.Rm = Rm;
        self.gamma = gamma;
        self.Ln = Ln;
        self.c = *offsets;
        self.eta = eta;
        self.A = A;
        self.B = B;
        self.D = D;
        self.Mw = Mw;
        Ok(())
    }

    pub fn rotation(&self) -> Matrix3 {
        self.Rbar
    }

    pub fn mean_rotation(&self) -> Matrix3 {
        self.Rm
    }

    /// Spin of node `n` relative to the triad, in triad axes, per element DOF.
    fn relative_spin(&self, n: usize) -> Matrix3x12 {
        let mut S: Matrix3x12 = -self.G;
        S.fixed_view_mut::<3, 3>(0, ROT[n]).add_assign(&self.Rbar.transpose());
        S
    }

    /// Derivative of the local vector `ul` with respect to the element DOFs.
    ///
    /// The rotation rows carry the inverse left Jacobian of the logarithm at
    /// the current local rotations, so `T` depends on `ul`.
    pub fn compute_tangent(&self, ul: &Vector12) -> Matrix12 {
        let r1 = Vector3::from(self.Rbar.column(0));

        let mut T = Matrix12::zeros();
        T.fixed_view_mut::<1, 12>(JNX, 0).copy_from(&(r1.transpose() * self.D));

        for (n, imx) in [IMX, JMX].into_iter().enumerate() {
            let theta = Vector3::from(ul.fixed_rows::<3>(imx));
            T.fixed_view_mut::<3, 12>(imx, 0)
                .copy_from(&(theta.tangent_matrix_inv() * self.relative_spin(n)));
        }
        T
    }

    /// Add the derivative of `Tᵀ pl` with respect to the element DOFs, for
    /// fixed `pl`.
    ///
    /// This covers the moving triad, the moving chord, the rotating offsets,
    /// the pull-back of the local moments through the logarithm and the
    /// partials `A`, `B` of the mean rotation.
    pub fn add_tangent(&self, kg: &mut Matrix12, pl: &Vector12, ul: &Vector12) {
        let r1 = Vector3::from(self.Rbar.column(0));
        let r2 = Vector3::from(self.Rbar.column(1));
        let r3 = Vector3::from(self.Rbar.column(2));
        let m = Vector3::from(self.Rm.column(1));
        let Ln = self.Ln;
        let eta = self.eta;
        let N = pl[JNX];

        let mu: [Vector3; 2] = [IMX, JMX].map(|i| {
            let theta = Vector3::from(ul.fixed_rows::<3>(i));
            theta.tangent_matrix_inv().transpose() * Vector3::from(pl.fixed_rows::<3>(i))
        });
        let ms = mu[0] + mu[1];

        let Omega: Matrix3x12 = self.Rbar * self.G;
        let P = Matrix3::identity() - r1 * r1.transpose();
        let dr1: Matrix3x12 = P * self.D / Ln;
        let dLn: Matrix1x12 = r1.transpose() * self.D;

        let deta: Matrix1x12 = (m.cross(&r1).transpose() * self.Mw + m.transpose() * dr1
            - eta * (m.cross(&r2).transpose() * self.Mw + r2.cross(&m).transpose() * Omega))
            / m.dot(&r2);

        // Force carried by the chord
        let a = ms[0] * eta + ms[1];
        let v = a * r3 - ms[2] * r2;
        let h = N * r1 + v / Ln;
        let dh: Matrix3x12 = N * dr1
            + (ms[0] * r3 * deta - a * r3.tilde() * Omega + ms[2] * r2.tilde() * Omega) / Ln
            - v * dLn / (Ln * Ln);

        // Moment carried by the mean rotation
        let k = -ms[0] * (r1 - eta * r2);
        let dq: Matrix3x12 = dr1 - r2 * deta + eta * r2.tilde() * Omega;
        let dk: Matrix3x12 = -ms[0] * dq;

        kg.add_assign(&(self.D.transpose() * dh + self.Mw.transpose() * dk));

        for (mu_n, col) in izip!(mu.iter(), ROT) {
            kg.fixed_view_mut::<3, 12>(col, 0)
                .add_assign(&(-(self.Rbar * mu_n).tilde() * Omega));
        }

        kg.fixed_view_mut::<3, 3>(ROT[0], ROT[0])
            .add_assign(&(-h.tilde() * self.c[0].tilde()));
        kg.fixed_view_mut::<3, 3>(ROT[1], ROT[1])
            .add_assign(&(h.tilde() * self.c[1].tilde()));

        // Pulled-back moments follow the local rotations
        for (n, imx) in [IMX, JMX].into_iter().enumerate() {
            let theta = Vector3::from(ul.fixed_rows::<3>(imx));
            let m_n = Vector3::from(pl.fixed_rows::<3>(imx));
            let S = self.relative_spin(n);
            let dmu: Matrix3x12 =
                theta.tangent_matrix_inv_grad(&m_n) * theta.tangent_matrix_inv() * S;
            kg.add_assign(&(S.transpose() * dmu));
        }

        // A and B follow γ
        let gamma = self.gamma;
        let half = 0.5 * gamma;
        let E = matrix_from_versor(&versor_from_vector(&gamma));
        let H = matrix_from_versor(&versor_from_vector(&half));
        let Jinv = gamma.tangent_matrix_inv();

        let mut dgamma = Matrix3x12::zeros();
        dgamma.fixed_view_mut::<3, 3>(0, ROT[0]).copy_from(&(-Jinv * E));
        dgamma.fixed_view_mut::<3, 3>(0, ROT[1]).copy_from(&Jinv);

        let Ak = self.A.transpose() * k;
        let y = half.tangent_matrix().transpose() * k;
        let dAk: Matrix3 = 0.5
            * (gamma.tangent_matrix_inv_grad(&y)
                + 0.5 * Jinv.transpose() * half.tangent_matrix_grad(&k));
        let dBk: Matrix3 = 0.5 * H.transpose() * k.tilde() * half.tangent_matrix()
            - E.transpose() * (Ak.tilde() * gamma.tangent_matrix() + dAk);

        kg.fixed_view_mut::<3, 12>(ROT[0], 0).add_assign(&(dBk * dgamma));
        kg.fixed_view_mut::<3, 12>(ROT[1], 0).add_assign(&(dAk * dgamma));
    }
}
