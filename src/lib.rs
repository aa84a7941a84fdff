pub mod error;
pub mod node;
pub mod prelude;
pub mod rotation;
pub mod transform;

pub use error::{Result, TransformError};
pub use node::{FrameNode, Node};
pub use transform::{
    CrisfieldIsometry, FrameTransform, LinearFrameTransf, SouzaFrameTransf, TransformConfig,
};
