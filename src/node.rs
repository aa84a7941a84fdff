//! End-node collaborator of a frame transformation.
//!
//! Transformations never own node data. They hold a handle implementing
//! [`FrameNode`] and read coordinates and displacements through it.

use std::cell::RefCell;
use std::rc::Rc;

use crate::prelude::*;

/// Read access a frame transformation needs from each end node.
pub trait FrameNode {
    /// Reference coordinates.
    fn crds(&self) -> Vector3;

    /// Trial displacement `[ux uy uz rx ry rz]`.
    fn trial_disp(&self) -> Vector6;

    /// Last committed displacement.
    fn disp(&self) -> Vector6;

    /// Coordinate-sensitivity parameter index, if any.
    fn crds_sensitivity(&self) -> Option<usize> {
        None
    }
}

/// Plain node holding its own displacement state.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    position: Vector3,
    trial: Vector6,
    committed: Vector6,
    sensitivity: Option<usize>,
}

impl Node {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Node {
            position: Vector3::new(x, y, z),
            trial: Vector6::zeros(),
            committed: Vector6::zeros(),
            sensitivity: None,
        }
    }

    pub fn with_crds_sensitivity(mut self, grad: usize) -> Self {
        self.sensitivity = Some(grad);
        self
    }

    pub fn set_trial_disp(&mut self, disp: Vector6) {
        self.trial = disp;
    }

    /// Set translation and rotation parts of the trial displacement.
    pub fn set_trial_parts(&mut self, u: &Vector3, r: &Vector3) {
        self.trial.fixed_rows_mut::<3>(0).copy_from(u);
        self.trial.fixed_rows_mut::<3>(3).copy_from(r);
    }

    pub fn commit_state(&mut self) {
        self.committed = self.trial;
    }

    pub fn revert_to_last_commit(&mut self) {
        self.trial = self.committed;
    }

    pub fn revert_to_start(&mut self) {
        self.trial.fill(0.);
        self.committed.fill(0.);
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl FrameNode for Node {
    fn crds(&self) -> Vector3 {
        self.position
    }
    fn trial_disp(&self) -> Vector6 {
        self.trial
    }
    fn disp(&self) -> Vector6 {
        self.committed
    }
    fn crds_sensitivity(&self) -> Option<usize> {
        self.sensitivity
    }
}

/// Shared handle; the owning framework keeps mutating the node between calls.
impl<T: FrameNode> FrameNode for Rc<RefCell<T>> {
    fn crds(&self) -> Vector3 {
        self.borrow().crds()
    }
    fn trial_disp(&self) -> Vector6 {
        self.borrow().trial_disp()
    }
    fn disp(&self) -> Vector6 {
        self.borrow().disp()
    }
    fn crds_sensitivity(&self) -> Option<usize> {
        self.borrow().crds_sensitivity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_state() {
        let mut node = Node::new(1.0, 2.0, 3.0);
        assert_eq!(node.crds(), Vector3::new(1.0, 2.0, 3.0));

        node.set_trial_parts(&Vector3::new(0.1, 0., 0.), &Vector3::new(0., 0., 0.2));
        assert_eq!(node.trial_disp(), Vector6::new(0.1, 0., 0., 0., 0., 0.2));
        assert_eq!(node.disp(), Vector6::zeros());

        node.commit_state();
        node.set_trial_disp(Vector6::zeros());
        node.revert_to_last_commit();
        assert_eq!(node.trial_disp(), node.disp());
    }

    #[test]
    fn test_shared_handle() {
        let node = Rc::new(RefCell::new(Node::new(0., 0., 1.).with_crds_sensitivity(2)));
        let handle = node.clone();
        node.borrow_mut().set_trial_disp(Vector6::new(1., 0., 0., 0., 0., 0.));
        assert_eq!(handle.trial_disp()[0], 1.);
        assert_eq!(handle.crds_sensitivity(), Some(2));
    }
}
