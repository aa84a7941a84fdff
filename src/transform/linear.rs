#![allow(non_snake_case)]

//! Small-displacement transformation: the tangent is evaluated once in the
//! reference configuration and `ul = T d`.

use std::fmt;

use crate::error::{Result, TransformError};
use crate::node::FrameNode;
use crate::prelude::*;

use super::{
    json_record, offsets_or_zero, FrameTransform, Reference, TransformConfig, IMX, JMX, JNX,
};

const CLASS_NAME: &str = "LinearFrameTransf";

#[derive(Debug, Clone)]
pub struct LinearFrameTransf<N> {
    vz: Vector3,
    offsets: Option<[Vector3; 2]>,
    nodes: Option<[N; 2]>,
    reference: Reference,
    T: Matrix12,
    ul: Vector12,
    ulpr: Vector12,
}

impl<N> LinearFrameTransf<N> {
    pub fn new(vecxz: Vector3) -> Self {
        LinearFrameTransf {
            vz: vecxz,
            offsets: None,
            nodes: None,
            reference: Reference::default(),
            T: Matrix12::zeros(),
            ul: Vector12::zeros(),
            ulpr: Vector12::zeros(),
        }
    }

    pub fn with_offsets(mut self, oi: Vector3, oj: Vector3) -> Self {
        self.offsets = Some([oi, oj]);
        self
    }

    pub fn from_config(config: &TransformConfig) -> Self {
        let mut transf = Self::new(config.vecxz);
        transf.offsets = config.offsets;
        transf
    }

    fn bound_nodes(&self) -> Result<&[N; 2]> {
        self.nodes.as_ref().ok_or(TransformError::Uninitialized)
    }
}

/// Global displacement vector `[u_I α_I u_J α_J]`.
fn element_disp(d: [Vector6; 2]) -> Vector12 {
    let mut v = Vector12::zeros();
    v.fixed_rows_mut::<6>(0).copy_from(&d[0]);
    v.fixed_rows_mut::<6>(6).copy_from(&d[1]);
    v
}

/// Reference tangent of the corotational map.
///
/// The chord variation is `D = [-I, W(o_I), I, -W(o_J)]`; the triad spins
/// with the mean twist about `e1` and with the transverse chord rotation
/// about `e2`, `e3`.
fn reference_tangent(R0: &Matrix3, L: f64, offsets: &[Vector3; 2]) -> Matrix12 {
    let e1 = Vector3::from(R0.column(0));
    let e2 = Vector3::from(R0.column(1));
    let e3 = Vector3::from(R0.column(2));

    let mut D = Matrix3x12::zeros();
    D.fixed_view_mut::<3, 3>(0, 0).copy_from(&(-Matrix3::identity()));
    D.fixed_view_mut::<3, 3>(0, 3).copy_from(&offsets[0].tilde());
    D.fixed_view_mut::<3, 3>(0, 6).copy_from(&Matrix3::identity());
    D.fixed_view_mut::<3, 3>(0, 9).copy_from(&(-offsets[1].tilde()));

    let mut W = Matrix3x12::zeros();
    let twist = 0.5 * e1.transpose();
    W.fixed_view_mut::<1, 3>(0, 3).copy_from(&twist);
    W.fixed_view_mut::<1, 3>(0, 9).copy_from(&twist);
    W.set_row(1, &(-e3.transpose() * D / L));
    W.set_row(2, &(e2.transpose() * D / L));

    let mut T = Matrix12::zeros();
    T.fixed_view_mut::<1, 12>(JNX, 0).copy_from(&(e1.transpose() * D));
    for (imx, col) in [(IMX, 3), (JMX, 9)] {
        let mut S: Matrix3x12 = -W;
        S.fixed_view_mut::<3, 3>(0, col).add_assign(&R0.transpose());
        T.fixed_view_mut::<3, 12>(imx, 0).copy_from(&S);
    }
    T
}

impl<N: FrameNode + Clone + 'static> FrameTransform<N> for LinearFrameTransf<N> {
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
        log::debug!("{CLASS_NAME}: L = {}", reference.L);

        self.T = reference_tangent(&reference.R0, reference.L, &offsets);
        self.reference = reference;
        self.nodes = Some(nodes);
        self.ul = Vector12::zeros();
        self.ulpr = Vector12::zeros();
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        let nodes = self.bound_nodes()?;
        let ul = self.T * element_disp([nodes[0].trial_disp(), nodes[1].trial_disp()]);
        self.ulpr = self.ul;
        self.ul = ul;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.bound_nodes()?;
        Ok(())
    }

    fn revert_to_last_commit(&mut self) -> Result<()> {
        self.update()
    }

    fn revert_to_start(&mut self) -> Result<()> {
        self.ul = Vector12::zeros();
        self.ulpr = Vector12::zeros();
        self.update()
    }

    fn initial_length(&self) -> f64 {
        self.reference.L
    }

    fn deformed_length(&self) -> f64 {
        self.reference.L
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
        match &self.nodes {
            Some(nodes) => {
                let trial = element_disp([nodes[0].trial_disp(), nodes[1].trial_disp()]);
                let committed = element_disp([nodes[0].disp(), nodes[1].disp()]);
                self.T * (trial - committed)
            }
            None => Vector12::zeros(),
        }
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

    fn push_stiffness(&self, kl: &Matrix12, _pl: &Vector12) -> Matrix12 {
        self.T.transpose() * kl * self.T
    }

    fn initial_global_stiffness(&self, kl: &Matrix12) -> Matrix12 {
        self.T.transpose() * kl * self.T
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

impl<N> fmt::Display for LinearFrameTransf<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{CLASS_NAME}")?;
        write!(
            f,
            "  vecxz: [{}, {}, {}], L: {}",
            self.vz[0], self.vz[1], self.vz[2], self.reference.L
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use approx::assert_relative_eq;

    #[test]
    fn test_axial_and_bending() {
        // Transverse tip translation rotates the chord about z
        let mut nj = Node::new(4., 0., 0.);
        nj.set_trial_parts(&Vector3::new(0.01, 0.2, 0.), &Vector3::zeros());
        let mut transf = LinearFrameTransf::new(Vector3::new(0., 0., 1.));
        transf
            .initialize([Some(Node::new(0., 0., 0.)), Some(nj)])
            .unwrap();
        transf.update().unwrap();

        let ul = transf.local_displacement();
        assert_relative_eq!(ul[JNX], 0.01, epsilon = 1e-15);
        assert_relative_eq!(ul[IMX + 2], -0.05, epsilon = 1e-15);
        assert_relative_eq!(ul[JMX + 2], -0.05, epsilon = 1e-15);
        assert_eq!(transf.deformed_length(), 4.);
    }

    #[test]
    fn test_incremental_displacement() {
        let mut nj = Node::new(1., 0., 0.);
        nj.set_trial_parts(&Vector3::new(0.1, 0., 0.), &Vector3::zeros());
        nj.commit_state();
        nj.set_trial_parts(&Vector3::new(0.3, 0., 0.), &Vector3::zeros());

        let mut transf = LinearFrameTransf::new(Vector3::new(0., 1., 0.));
        transf
            .initialize([Some(Node::new(0., 0., 0.)), Some(nj)])
            .unwrap();
        transf.update().unwrap();
        assert_relative_eq!(transf.basic_incr_disp()[JNX], 0.2, epsilon = 1e-15);
        assert_relative_eq!(transf.local_displacement()[JNX], 0.3, epsilon = 1e-15);
    }

    #[test]
    fn test_stiffness_has_no_geometric_part() {
        let mut transf = LinearFrameTransf::new(Vector3::new(0., 0., 1.));
        transf
            .initialize([Some(Node::new(0., 0., 0.)), Some(Node::new(3., 0., 0.))])
            .unwrap();
        let mut pl = Vector12::zeros();
        pl[JNX] = 10.;
        assert_eq!(
            transf.push_stiffness(&Matrix12::zeros(), &pl),
            Matrix12::zeros()
        );
        assert_relative_eq!(transf.push_force(&pl)[0], -10.);
        assert_relative_eq!(transf.push_force(&pl)[6], 10.);
    }
}
