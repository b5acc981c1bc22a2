//! 布局错误定义

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Curve point out of range: {s} not in [{start}, {end}]")]
    DomainRange { s: f64, start: f64, end: f64 },

    #[error("Path segment `{segment}` not found in `{container}` (resolved so far: `{path}`)")]
    PathNotFound {
        segment: String,
        container: String,
        path: String,
    },

    #[error("Node `{node}` overlaps with `{previous}` but has different angle or roll")]
    OverlapConflict { previous: String, node: String },

    #[error("Node `{node}` has an unresolved anchor: {reason}")]
    UnresolvedAnchor { node: String, reason: String },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Duplicate name `{name}` in `{container}`")]
    DuplicateName { name: String, container: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Matrix is not a rigid transform")]
    NotRigid,
}
