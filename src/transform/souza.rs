#![allow(non_snake_case)]

//! Corotational transformation with incremental versor tracking of the
//! nodal rotations and Crisfield's mean-rotation triad.

use std::fmt;

use crate::error::{Result, TransformError};
use crate::node::FrameNode;
use crate::prelude::*;
use crate::rotation::{self, compose, matrix_from_versor, versor_from_matrix, versor_from_vector};

use super::{
    json_record, offsets_or_zero, CrisfieldIsometry, FrameTransform, Reference,
    TransformConfig, IMX, INX, JMX, JNX,
};

const CLASS_NAME: &str = "SouzaFrameTransf";

#[derive(Debug, Clone)]
pub struct SouzaFrameTransf<N> {
    vz: Vector3,
    offsets: Option<[Vector3; 2]>,
    nodes: Option<[N; 2]>,
    reference: Reference,

    /// Trial nodal rotations
    Q_pres: [UnitQuaternion; 2],
    /// Committed nodal rotations
    Q_past: [UnitQuaternion; 2],
    /// Nodal rotation DOFs seen by the last update
    alpha: [Vector3; 2],

    ul: Vector12,
    ulpr: Vector12,
    ulcommit: Vector12,

    T: Matrix12,
    /// Tangent in the reference configuration
    T0: Matrix12,
    Ln: f64,
    crs: CrisfieldIsometry,
}

impl<N> SouzaFrameTransf<N> {
    pub fn new(vecxz: Vector3) -> Self {
        SouzaFrameTransf {
            vz: vecxz,
            offsets: None,
            nodes: None,
            reference: Reference::default(),
            Q_pres: [UnitQuaternion::identity(); 2],
            Q_past: [UnitQuaternion::identity(); 2],
            alpha: [Vector3::zeros(); 2],
            ul: Vector12::zeros(),
            ulpr: Vector12::zeros(),
            ulcommit: Vector12::zeros(),
            T: Matrix12::zeros(),
            T0: Matrix12::zeros(),
            Ln: 0.,
            crs: CrisfieldIsometry::default(),
        }
    }

    /// Rigid offsets from node I and node J to the element ends.
    pub fn with_offsets(mut self, oi: Vector3, oj: Vector3) -> Self {
        self.offsets = Some([oi, oj]);
        self
    }

    pub fn from_config(config: &TransformConfig) -> Self {
        let mut transf = Self::new(config.vecxz);
        transf.offsets = config.offsets;
        transf
    }

    pub fn vecxz(&self) -> Vector3 {
        self.vz
    }

    pub fn offsets(&self) -> Option<[Vector3; 2]> {
        self.offsets
    }

    /// Trial nodal rotations.
    pub fn nodal_rotations(&self) -> [UnitQuaternion; 2] {
        self.Q_pres
    }

    pub fn committed_rotations(&self) -> [UnitQuaternion; 2] {
        self.Q_past
    }

    /// Nodal displacements found when the transformation was initialized.
    ///
    /// They are recorded only; `update` measures every displacement from the
    /// reference geometry.
    pub fn initial_displacements(&self) -> Option<[Vector6; 2]> {
        self.reference.u_init
    }

    pub fn isometry(&self) -> &CrisfieldIsometry {
        &self.crs
    }

    /// `Tᵀ diag(m ⊙ tan θ) T` over the local rotation components.
    ///
    /// This is added on top of the derivative of `Tᵀ pl`, so
    /// [`FrameTransform::push_stiffness`] differs from the Jacobian of
    /// [`FrameTransform::push_force`] by exactly this matrix. It vanishes when
    /// the local moments or rotations vanish and is unbounded as any local
    /// rotation component approaches π/2.
    pub fn tan_stiffness(&self, pl: &Vector12) -> Matrix12 {
        let mut kt = Matrix12::zeros();
        for k in (IMX..IMX + 3).chain(JMX..JMX + 3) {
            let row = self.T.row(k);
            kt += (pl[k] * self.ul[k].tan()) * (row.transpose() * row);
        }
        kt
    }

    fn bound_nodes(&self) -> Result<&[N; 2]> {
        self.nodes.as_ref().ok_or(TransformError::Uninitialized)
    }

    fn reset_rotations(&mut self) {
        let Q0 = versor_from_matrix(&self.reference.R0);
        self.Q_pres = [Q0; 2];
        self.Q_past = [Q0; 2];
        self.alpha = [Vector3::zeros(); 2];
    }
}

impl<N: FrameNode + Clone + 'static> FrameTransform<N> for SouzaFrameTransf<N> {
    fn class_name(&self) -> &'static str {
        CLASS_NAME
    }

    fn initialize(&mut self, nodes: [Option<N>; 2]) -> Result<()> {
        let [ni, nj] = nodes;
        let nodes = [
            ni.ok_or(TransformError::InvalidNode(0))?,
            nj.ok_or(TransformError::InvalidNode(1))?,
        ];
        let offsets = offsets_or_zero(&self.offsets);
        let reference = Reference::new(&nodes, &self.vz, &offsets)?;
        if reference.u_init.is_some() {
            log::debug!("{CLASS_NAME}: nodes carry displacement at initialization");
        }

        let Q0 = versor_from_matrix(&reference.R0);
        let mut crs = CrisfieldIsometry::default();
        crs.initialize(2, &reference.R0, reference.L);
        crs.update(&Q0, &Q0, &reference.dX, &offsets)?;
        let T = crs.compute_tangent(&Vector12::zeros());

        log::debug!(
            "{CLASS_NAME}: L = {}, axes = {:?}",
            reference.L,
            reference.R0.column_iter().map(|e| [e[0], e[1], e[2]]).collect_vec()
        );

        self.Ln = reference.L;
        self.reference = reference;
        self.nodes = Some(nodes);
        self.crs = crs;
        self.T = T;
        self.T0 = T;
        self.ul = Vector12::zeros();
        self.ulpr = Vector12::zeros();
        self.ulcommit = Vector12::zeros();
        self.reset_rotations();
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        let nodes = self.bound_nodes()?;
        let reference = &self.reference;
        let o = offsets_or_zero(&self.offsets);
        let disp = [nodes[0].trial_disp(), nodes[1].trial_disp()];

        // Apply the rotation increments since the previous update
        let mut Q = self.Q_pres;
        let mut alpha = self.alpha;
        for (q, a, d) in izip!(Q.iter_mut(), alpha.iter_mut(), disp.iter()) {
            let rot = Vector3::from(d.fixed_rows::<3>(3));
            let incr = rot - *a;
            if incr.norm() != 0. {
                *q = compose(&versor_from_vector(&incr), q);
            }
            *a = rot;
        }
        let R = Q.map(|q| matrix_from_versor(&q));

        // Offsets follow the nodal rotation accumulated since the reference
        let c = [
            R[0] * reference.R0.transpose() * o[0],
            R[1] * reference.R0.transpose() * o[1],
        ];
        let uI = Vector3::from(disp[0].fixed_rows::<3>(0));
        let uJ = Vector3::from(disp[1].fixed_rows::<3>(0));
        let dx = reference.dX + (uJ - uI) + (c[1] - o[1]) - (c[0] - o[0]);

        let Ln = dx.norm();
        if Ln == 0. {
            log::warn!("{CLASS_NAME}: deformed length is zero");
            return Err(TransformError::DegenerateGeometry(
                "deformed length is zero".into(),
            ));
        }

        let mut crs = self.crs.clone();
        crs.update(&Q[0], &Q[1], &dx, &c).map_err(|e| {
            log::warn!("{CLASS_NAME}: {e}");
            e
        })?;

        let Rbar = crs.rotation();
        let mut ul = Vector12::zeros();
        // Elongation is carried by the J end alone
        ul[INX] = 0.;
        ul[JNX] = Ln - reference.L;
        ul.fixed_rows_mut::<3>(IMX).copy_from(&rotation::log(&(Rbar.transpose() * R[0])));
        ul.fixed_rows_mut::<3>(JMX).copy_from(&rotation::log(&(Rbar.transpose() * R[1])));
        let T = crs.compute_tangent(&ul);

        log::trace!("{CLASS_NAME}: Ln = {Ln}");

        self.Q_pres = Q;
        self.alpha = alpha;
        self.ulpr = self.ul;
        self.ul = ul;
        self.T = T;
        self.Ln = Ln;
        self.crs = crs;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.bound_nodes()?;
        self.Q_past = self.Q_pres;
        self.ulcommit = self.ul;
        Ok(())
    }

    fn revert_to_last_commit(&mut self) -> Result<()> {
        let nodes = self.bound_nodes()?;
        let alpha = [
            Vector3::from(nodes[0].trial_disp().fixed_rows::<3>(3)),
            Vector3::from(nodes[1].trial_disp().fixed_rows::<3>(3)),
        ];
        self.alpha = alpha;
        self.ul = self.ulcommit;
        self.Q_pres = self.Q_past;
        self.update()
    }

    fn revert_to_start(&mut self) -> Result<()> {
        self.bound_nodes()?;
        self.ul = Vector12::zeros();
        self.ulpr = Vector12::zeros();
        self.ulcommit = Vector12::zeros();
        self.reset_rotations();
        self.update()
    }

    fn initial_length(&self) -> f64 {
        self.reference.L
    }

    fn deformed_length(&self) -> f64 {
        self.Ln
    }

    fn local_axes(&self) -> (Vector3, Vector3, Vector3) {
        let R0 = &self.reference.R0;
        (
            R0.column(0).into(),
            R0.column(1).into(),
            R0.column(2).into(),
        )
    }

    fn local_displacement(&self) -> Vector12 {
        self.ul
    }

    fn basic_incr_disp(&self) -> Vector12 {
        self.ul - self.ulcommit
    }

    fn basic_incr_delta_disp(&self) -> Vector12 {
        self.ul - self.ulpr
    }

    fn tangent(&self) -> Matrix12 {
        self.T
    }

    fn push_force(&self, pl: &Vector12) -> Vector12 {
        self.T.transpose() * pl
    }

    /// `Tᵀ kl T` plus the derivative of `Tᵀ pl`, plus
    /// [`SouzaFrameTransf::tan_stiffness`].
    fn push_stiffness(&self, kl: &Matrix12, pl: &Vector12) -> Matrix12 {
        let mut kg = self.T.transpose() * kl * self.T;
        self.crs.add_tangent(&mut kg, pl, &self.ul);
        kg + self.tan_stiffness(pl)
    }

    fn initial_global_stiffness(&self, kl: &Matrix12) -> Matrix12 {
        self.T0.transpose() * kl * self.T0
    }

    fn point_global_coord_from_local(&self, xl: &Vector3) -> Result<Vector3> {
        let nodes = self.bound_nodes()?;
        let o = offsets_or_zero(&self.offsets);
        Ok(nodes[0].crds() + o[0] + self.reference.R0 * xl)
    }

    fn to_json(&self, tag: usize) -> serde_json::Value {
        json_record(tag, CLASS_NAME, &self.vz, &self.offsets)
    }

    fn boxed_clone(&self) -> Box<dyn FrameTransform<N>> {
        Box::new(self.clone())
    }

    fn is_shape_sensitivity(&self) -> bool {
        self.nodes
            .iter()
            .flatten()
            .any(|n| n.crds_sensitivity().is_some())
    }
}

impl<N> fmt::Display for SouzaFrameTransf<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{CLASS_NAME}")?;
        writeln!(
            f,
            "  vecxz: [{}, {}, {}]",
            self.vz[0], self.vz[1], self.vz[2]
        )?;
        if let Some([oi, oj]) = &self.offsets {
            writeln!(f, "  offset I: [{}, {}, {}]", oi[0], oi[1], oi[2])?;
            writeln!(f, "  offset J: [{}, {}, {}]", oj[0], oj[1], oj[2])?;
        }
        write!(f, "  L: {}, Ln: {}", self.reference.L, self.Ln)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use approx::assert_relative_eq;

    fn cantilever() -> SouzaFrameTransf<Node> {
        let mut transf = SouzaFrameTransf::new(Vector3::new(0., 0., 1.));
        transf
            .initialize([Some(Node::new(0., 0., 0.)), Some(Node::new(2., 0., 0.))])
            .unwrap();
        transf
    }

    #[test]
    fn test_initialize() {
        let transf = cantilever();
        assert_eq!(transf.initial_length(), 2.);
        assert_eq!(transf.deformed_length(), 2.);
        assert_eq!(transf.local_displacement(), Vector12::zeros());
        assert!(transf.initial_displacements().is_none());
        assert_relative_eq!(
            transf.nodal_rotations()[1].wijk(),
            nalgebra::Vector4::new(1., 0., 0., 0.)
        );
        // Axial row of the reference tangent
        assert_relative_eq!(transf.tangent()[(JNX, 0)], -1.);
        assert_relative_eq!(transf.tangent()[(JNX, 6)], 1.);
    }

    #[test]
    fn test_missing_node() {
        let mut transf = SouzaFrameTransf::<Node>::new(Vector3::new(0., 0., 1.));
        assert_eq!(
            transf.initialize([Some(Node::new(0., 0., 0.)), None]),
            Err(TransformError::InvalidNode(1))
        );
        assert_eq!(transf.update(), Err(TransformError::Uninitialized));
    }

    #[test]
    fn test_update_is_incremental() {
        // Node values are fixed, so repeated updates must not accumulate
        let mut transf = SouzaFrameTransf::new(Vector3::new(0., 0., 1.));
        let mut nj = Node::new(2., 0., 0.);
        nj.set_trial_parts(&Vector3::zeros(), &Vector3::new(0., 0., 0.05));
        transf
            .initialize([Some(Node::new(0., 0., 0.)), Some(nj)])
            .unwrap();
        assert!(transf.initial_displacements().is_some());

        transf.update().unwrap();
        let ul = transf.local_displacement();
        transf.update().unwrap();
        assert_relative_eq!(transf.local_displacement(), ul, epsilon = 1e-15);
        assert_relative_eq!(transf.basic_incr_delta_disp(), Vector12::zeros());
        // The chord does not move, so the triad stays put
        assert_relative_eq!(ul[JMX + 2], 0.05, epsilon = 1e-12);
        assert_relative_eq!(ul[IMX + 2], 0., epsilon = 1e-12);
    }

    #[test]
    fn test_display() {
        let transf = cantilever();
        let text = transf.to_string();
        assert!(text.starts_with(CLASS_NAME));
        assert!(text.contains("L: 2"));
    }
}
