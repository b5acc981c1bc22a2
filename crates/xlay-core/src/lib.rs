//! XLAY 核心引擎
//!
//! 在三维空间中定位具名元素，按层级组合成框架与组件，并沿参考轨道生成
//! 由直线段和圆弧段组成的参数曲线，用于束线排布。
//!
//! # 架构设计
//!
//! - `Transform`: 带标识的刚体位姿，可引用被它定位的元素
//! - `Element`: 图元、曲线、框架、组件的统一枚举，暴露具名定位点
//! - `Curve`: 首尾相接的段 + 弧长查找表
//! - `Beamline`: 节点排序与重叠合并，输出可重放为曲线的段记录
//!
//! 核心库不负责绘制，只通过 `render(style)` 输出有序图元。
//!
//! # 示例
//!
//! ```rust
//! use xlay_core::prelude::*;
//!
//! // 直线 10 后接 90° 弯转
//! let mut curve = Curve::new();
//! curve.line_by(10.0)?.bend_by(5.0, 90.0, 0.0)?;
//!
//! let pose = curve.point(12.5)?;
//! assert!(pose.x() < 0.0);
//! # Ok::<(), LayoutError>(())
//! ```

pub mod assembly;
pub mod beamline;
pub mod curve;
pub mod element;
pub mod error;
pub mod frame;
pub mod math;
pub mod pose;
pub mod render;
pub mod segment;
pub mod shapes;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::assembly::{Assembly, AssemblyKind, AssemblyOverrides};
    pub use crate::beamline::{Beamline, Node, SegmentRecord};
    pub use crate::curve::{Curve, CurveParams};
    pub use crate::element::{Addressable, Element};
    pub use crate::error::LayoutError;
    pub use crate::frame::{Frame, FrameOverrides, Prototype};
    pub use crate::math::{Matrix3, Matrix4, Point3, Vector3};
    pub use crate::pose::{Axis, LocalOp, Transform};
    pub use crate::render::{Primitive, PrimitiveKind, Style};
    pub use crate::segment::{ArcTo, BendBy, LineBy, LineTo, Segment, SegmentSpec};
    pub use crate::shapes::{Line, Polygon, Polyline, Rectangle, Text};
}
