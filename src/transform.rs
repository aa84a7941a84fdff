#![allow(non_snake_case)]

//! Coordinate transformations for two-node frame elements.
//!
//! A transformation maps the twelve global DOFs of the end nodes,
//! `[u_I α_I u_J α_J]`, onto the twelve-component local vector
//!
//! ```text
//! [inx iny inz imx imy imz jnx jny jnz jmx jmy jmz]
//! ```
//!
//! and pushes local forces and stiffness back to the global frame.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};
use crate::node::FrameNode;
use crate::prelude::*;

pub mod isometry;
pub mod linear;
pub mod souza;

pub use isometry::CrisfieldIsometry;
pub use linear::LinearFrameTransf;
pub use souza::SouzaFrameTransf;

pub const INX: usize = 0;
pub const IMX: usize = 3;
pub const JNX: usize = 6;
pub const JMX: usize = 9;

//------------------------------------------------------------------------------
// Configuration
//------------------------------------------------------------------------------

/// Construction parameters shared by all transformation variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Vector in the local x-z plane; fixes the section orientation
    pub vecxz: Vector3,
    /// Rigid end offsets (global axes, reference configuration)
    #[serde(default)]
    pub offsets: Option<[Vector3; 2]>,
}

impl TransformConfig {
    pub fn new(vecxz: Vector3) -> Self {
        TransformConfig {
            vecxz,
            offsets: None,
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

//------------------------------------------------------------------------------
// Interface
//------------------------------------------------------------------------------

/// Common interface of the frame transformation family.
///
/// Mutating operations are meant to be driven by the owning element only;
/// instances are not shared between threads.
pub trait FrameTransform<N: FrameNode> {
    fn class_name(&self) -> &'static str;

    /// Bind the end nodes and capture the reference geometry.
    fn initialize(&mut self, nodes: [Option<N>; 2]) -> Result<()>;

    /// Recompute the trial state from the nodes' trial displacements.
    fn update(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;
    fn revert_to_last_commit(&mut self) -> Result<()>;
    fn revert_to_start(&mut self) -> Result<()>;

    fn initial_length(&self) -> f64;
    fn deformed_length(&self) -> f64;

    /// Reference local axes `(x, y, z)`.
    fn local_axes(&self) -> (Vector3, Vector3, Vector3);

    /// Current local vector `ul`.
    fn local_displacement(&self) -> Vector12;

    /// `ul` relative to the last commit.
    fn basic_incr_disp(&self) -> Vector12;

    /// `ul` relative to the previous update.
    fn basic_incr_delta_disp(&self) -> Vector12;

    /// Current transformation tangent `T`.
    fn tangent(&self) -> Matrix12;

    /// Global resisting force `Tᵀ pl`.
    fn push_force(&self, pl: &Vector12) -> Vector12;

    /// Global tangent stiffness for local stiffness `kl` and force `pl`.
    fn push_stiffness(&self, kl: &Matrix12, pl: &Vector12) -> Matrix12;

    /// Global stiffness in the reference configuration.
    fn initial_global_stiffness(&self, kl: &Matrix12) -> Matrix12;

    /// Global coordinates of a point given in reference local axes
    /// relative to the first end point.
    fn point_global_coord_from_local(&self, xl: &Vector3) -> Result<Vector3>;

    fn to_json(&self, tag: usize) -> serde_json::Value;

    fn boxed_clone(&self) -> Box<dyn FrameTransform<N>>;

    //--------------------------------------------------------------------------
    // Sensitivity capability (not provided by any variant yet)
    //--------------------------------------------------------------------------

    fn is_shape_sensitivity(&self) -> bool {
        false
    }

    fn basic_displacement_fixed_grad(&self) -> Result<Vector12> {
        Err(unsupported(self.class_name(), "basic_displacement_fixed_grad"))
    }

    fn basic_displacement_total_grad(&self, _grad: usize) -> Result<Vector12> {
        Err(unsupported(self.class_name(), "basic_displacement_total_grad"))
    }

    fn global_resisting_force_shape_sensitivity(
        &self,
        _pb: &Vector12,
        _grad: usize,
    ) -> Result<Vector12> {
        Err(unsupported(
            self.class_name(),
            "global_resisting_force_shape_sensitivity",
        ))
    }

    fn length_grad(&self) -> Result<f64> {
        Err(unsupported(self.class_name(), "length_grad"))
    }
}

fn unsupported(transform: &'static str, operation: &'static str) -> TransformError {
    log::warn!("{transform}: {operation} is not implemented");
    TransformError::UnsupportedOperation {
        transform,
        operation,
    }
}

//------------------------------------------------------------------------------
// Reference geometry
//------------------------------------------------------------------------------

/// Reference geometry shared by the transformation variants.
#[derive(Debug, Clone, Default)]
pub(crate) struct Reference {
    /// Chord between the offset end points
    pub dX: Vector3,
    pub L: f64,
    /// Local axes as columns
    pub R0: Matrix3,
    /// Nodal displacement present at initialization, if any
    pub u_init: Option<[Vector6; 2]>,
}

impl Reference {
    pub fn new<N: FrameNode>(
        nodes: &[N; 2],
        vecxz: &Vector3,
        offsets: &[Vector3; 2],
    ) -> Result<Self> {
        let dX = (nodes[1].crds() + offsets[1]) - (nodes[0].crds() + offsets[0]);
        let L = dX.norm();
        if L == 0. {
            log::warn!("frame element has zero initial length");
            return Err(TransformError::DegenerateGeometry(
                "initial length is zero".into(),
            ));
        }
        let R0 = local_triad(&dX, vecxz)?;

        let disp = [nodes[0].trial_disp(), nodes[1].trial_disp()];
        let u_init = if disp.iter().any(|d| d.norm() != 0.) {
            Some(disp)
        } else {
            None
        };

        Ok(Reference { dX, L, R0, u_init })
    }
}

/// Local triad with x along `dX` and z in the plane of x and `vecxz`.
pub(crate) fn local_triad(dX: &Vector3, vecxz: &Vector3) -> Result<Matrix3> {
    let e1 = dX.normalize();
    let e2 = vecxz.cross(&e1);
    let n = e2.norm();
    if n == 0. {
        log::warn!("orientation vector {vecxz:?} is parallel to the element axis");
        return Err(TransformError::DegenerateGeometry(
            "orientation vector is parallel to the element axis".into(),
        ));
    }
    let e2 = e2 / n;
    let e3 = e1.cross(&e2);
    Ok(Matrix3::from_columns(&[e1, e2, e3]))
}

pub(crate) fn offsets_or_zero(offsets: &Option<[Vector3; 2]>) -> [Vector3; 2] {
    offsets.unwrap_or([Vector3::zeros(); 2])
}

/// Diagnostic record common to the variants.
pub(crate) fn json_record(
    tag: usize,
    class_name: &str,
    vecxz: &Vector3,
    offsets: &Option<[Vector3; 2]>,
) -> serde_json::Value {
    let mut record = serde_json::json!({
        "name": tag,
        "type": class_name,
        "vecxz": [vecxz[0], vecxz[1], vecxz[2]],
    });
    if let Some([oi, oj]) = offsets {
        record["offsets"] = serde_json::json!([
            [oi[0], oi[1], oi[2]],
            [oj[0], oj[1], oj[2]],
        ]);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_local_triad() {
        let R0 = local_triad(&Vector3::new(2., 0., 0.), &Vector3::new(0., 0., 1.)).unwrap();
        assert_relative_eq!(R0, Matrix3::identity());

        // Vertical column with vecxz along global x
        let R0 = local_triad(&Vector3::new(0., 0., 3.), &Vector3::new(1., 0., 0.)).unwrap();
        assert_relative_eq!(Vector3::from(R0.column(1)), Vector3::new(0., -1., 0.));
        assert_relative_eq!(Vector3::from(R0.column(2)), Vector3::new(1., 0., 0.));

        assert!(matches!(
            local_triad(&Vector3::new(0., 0., 3.), &Vector3::new(0., 0., 1.)),
            Err(TransformError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_config_from_json() {
        let config = TransformConfig::from_json(
            r#"{"vecxz": [0.0, 0.0, 1.0], "offsets": [[0.0, 0.1, 0.0], [0.0, -0.1, 0.0]]}"#,
        )
        .unwrap();
        assert_eq!(config.vecxz, Vector3::new(0., 0., 1.));
        assert_eq!(
            config.offsets,
            Some([Vector3::new(0., 0.1, 0.), Vector3::new(0., -0.1, 0.)])
        );

        let config = TransformConfig::from_json(r#"{"vecxz": [0.0, 1.0, 0.0]}"#).unwrap();
        assert_eq!(config, TransformConfig::new(Vector3::new(0., 1., 0.)));
    }

    #[test]
    fn test_json_record() {
        let record = json_record(7, "SouzaFrameTransf", &Vector3::new(0., 0., 1.), &None);
        assert_eq!(record["name"], 7);
        assert_eq!(record["type"], "SouzaFrameTransf");
        assert!(record.get("offsets").is_none());
    }
}
