//! 曲线段与段生成器
//!
//! 段生成器是从起始位姿到 `(段, 弧长, 终止位姿)` 的纯函数：
//! - `LineBy(length, axis)`：沿起始位姿的局部轴直线前进
//! - `BendBy(length, angle, roll)`：在局部 x–z 平面（绕局部 z 轴滚转 `roll`）内的圆弧
//! - `LineTo(end)`：直线到绝对目标位姿
//! - `ArcTo(radius, end)`：暂不支持，返回 `Unsupported`

use crate::error::LayoutError;
use crate::math::{self, Matrix3, Vector3, EPSILON};
use crate::pose::{Axis, Transform};
use crate::shapes::Line;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 圆弧段
///
/// 起始位姿的局部 z 轴为切向，弯曲平面为局部 x–z 平面绕 z 轴滚转 `roll` 后的平面。
/// 角度单位为度，正角度弯向局部 -x。
#[derive(Debug, Clone)]
pub struct Bend {
    pub start: Transform,
    /// 弧长
    pub length: f64,
    /// 圆心角（度）
    pub angle: f64,
    /// 滚转角（度）
    pub roll: f64,
}

impl Bend {
    pub fn new(start: Transform, length: f64, angle: f64, roll: f64) -> Self {
        Self {
            start,
            length,
            angle,
            roll,
        }
    }

    /// 曲率半径；零角度时为直线，没有有限半径
    pub fn radius(&self) -> Option<f64> {
        let full = self.angle.to_radians();
        (full.abs() >= EPSILON).then(|| self.length / full)
    }

    /// 局部位移 `R(s)` 与局部旋转 `S(s)`，均已按滚转角变换
    fn local_motion(&self, s: f64) -> (Vector3, Matrix3) {
        let full = self.angle.to_radians();
        if self.length.abs() < EPSILON || full.abs() < EPSILON {
            // 退化为沿局部 z 的直线
            return (Vector3::new(0.0, 0.0, s), Matrix3::identity());
        }

        let radius = self.length / full;
        let alpha = full * s / self.length;
        let (sa, ca) = alpha.sin_cos();

        let displacement = Vector3::new(radius * (ca - 1.0), 0.0, radius * sa);
        let rotation = Matrix3::new(
            ca, 0.0, -sa, //
            0.0, 1.0, 0.0, //
            sa, 0.0, ca,
        );

        let roll = math::rotation_z(self.roll.to_radians());
        let roll_inv = roll.transpose();
        (roll * displacement, roll * rotation * roll_inv)
    }

    /// 弧长 `s` 处的位姿
    pub fn point(&self, s: f64) -> Transform {
        let (displacement, rotation) = self.local_motion(s);
        let start_rot = self.start.rot();
        Transform::from_loc_rot(
            start_rot * displacement + self.start.loc(),
            start_rot * rotation,
        )
    }

    /// 弧长 `s` 处的单位切向（即该处位姿的局部 z 轴）
    pub fn tangent(&self, s: f64) -> Vector3 {
        let (_, rotation) = self.local_motion(s);
        self.start.rot() * rotation * Vector3::z()
    }

    pub fn end(&self) -> Transform {
        self.point(self.length)
    }

    pub fn points(&self, steps: usize) -> Vec<Transform> {
        math::linspace(0.0, self.length, steps)
            .map(|s| self.point(s))
            .collect()
    }
}

/// 曲线段
#[derive(Debug, Clone)]
pub enum Segment {
    Line(Line),
    Bend(Bend),
}

impl Segment {
    pub fn start(&self) -> &Transform {
        match self {
            Segment::Line(line) => &line.start,
            Segment::Bend(bend) => &bend.start,
        }
    }

    pub fn end(&self) -> Transform {
        match self {
            Segment::Line(line) => line.end.clone(),
            Segment::Bend(bend) => bend.end(),
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            Segment::Line(line) => line.length(),
            Segment::Bend(bend) => bend.length,
        }
    }

    /// 段内弧长 `s ∈ [0, length]` 处的位姿
    pub fn point(&self, s: f64) -> Transform {
        match self {
            Segment::Line(line) => line.point(s),
            Segment::Bend(bend) => bend.point(s),
        }
    }

    pub fn tangent(&self, s: f64) -> Vector3 {
        match self {
            Segment::Line(line) => line.tangent(s),
            Segment::Bend(bend) => bend.tangent(s),
        }
    }

    /// 段内等弧长采样（含两端）
    pub fn points(&self, steps: usize) -> Vec<Transform> {
        match self {
            Segment::Line(line) => line.points(steps),
            Segment::Bend(bend) => bend.points(steps),
        }
    }
}

/// 段生成结果
#[derive(Debug, Clone)]
pub struct SegmentOutput {
    pub segment: Segment,
    /// 走过的弧长
    pub length: f64,
    pub end: Transform,
}

/// 沿局部轴直线前进
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineBy {
    pub length: f64,
    #[serde(default)]
    pub axis: Axis,
}

impl LineBy {
    pub fn new(length: f64) -> Self {
        Self::along(length, Axis::Z)
    }

    pub fn along(length: f64, axis: Axis) -> Self {
        Self { length, axis }
    }

    pub fn segment(&self, start: &Transform) -> SegmentOutput {
        let start = start.anonymous();
        let end = start.clone().translate(self.axis, self.length);
        SegmentOutput {
            segment: Segment::Line(Line::new(start, end.clone())),
            length: self.length,
            end,
        }
    }
}

/// 圆弧弯转
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BendBy {
    pub length: f64,
    /// 圆心角（度）
    pub angle: f64,
    /// 滚转角（度）
    #[serde(default)]
    pub roll: f64,
}

impl BendBy {
    pub fn new(length: f64, angle: f64, roll: f64) -> Self {
        Self {
            length,
            angle,
            roll,
        }
    }

    pub fn segment(&self, start: &Transform) -> SegmentOutput {
        let bend = Bend::new(start.anonymous(), self.length, self.angle, self.roll);
        let end = bend.end();
        SegmentOutput {
            segment: Segment::Bend(bend),
            length: self.length,
            end,
        }
    }
}

/// 直线到绝对目标
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineTo {
    pub end: Transform,
}

impl LineTo {
    pub fn new(end: Transform) -> Self {
        Self { end }
    }

    pub fn segment(&self, start: &Transform) -> SegmentOutput {
        let end = self.end.anonymous();
        let line = Line::new(start.anonymous(), end.clone());
        SegmentOutput {
            length: line.length(),
            segment: Segment::Line(line),
            end,
        }
    }
}

/// 圆弧到绝对目标
///
/// 起始切向、半径与目标点三者在三维中一般是超定的，因此不做近似求解。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcTo {
    pub radius: f64,
    pub end: Transform,
}

impl ArcTo {
    pub fn new(radius: f64, end: Transform) -> Self {
        Self { radius, end }
    }

    pub fn segment(&self, _start: &Transform) -> Result<SegmentOutput, LayoutError> {
        Err(LayoutError::Unsupported(format!(
            "ArcTo(radius={}) cannot be built from a start pose",
            self.radius
        )))
    }
}

/// 段生成器
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SegmentSpec {
    LineBy(LineBy),
    BendBy(BendBy),
    LineTo(LineTo),
    ArcTo(ArcTo),
}

impl SegmentSpec {
    /// 从起始位姿生成段
    pub fn build(&self, start: &Transform) -> Result<SegmentOutput, LayoutError> {
        match self {
            SegmentSpec::LineBy(spec) => Ok(spec.segment(start)),
            SegmentSpec::BendBy(spec) => Ok(spec.segment(start)),
            SegmentSpec::LineTo(spec) => Ok(spec.segment(start)),
            SegmentSpec::ArcTo(spec) => spec.segment(start),
        }
    }
}

impl From<LineBy> for SegmentSpec {
    fn from(spec: LineBy) -> Self {
        SegmentSpec::LineBy(spec)
    }
}

impl From<BendBy> for SegmentSpec {
    fn from(spec: BendBy) -> Self {
        SegmentSpec::BendBy(spec)
    }
}

impl From<LineTo> for SegmentSpec {
    fn from(spec: LineTo) -> Self {
        SegmentSpec::LineTo(spec)
    }
}

impl From<ArcTo> for SegmentSpec {
    fn from(spec: ArcTo) -> Self {
        SegmentSpec::ArcTo(spec)
    }
}

impl fmt::Display for SegmentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentSpec::LineBy(s) if s.axis == Axis::Z => write!(f, "LineBy(length={})", s.length),
            SegmentSpec::LineBy(s) => {
                write!(f, "LineBy(length={},axis={})", s.length, s.axis.name())
            }
            SegmentSpec::BendBy(s) if s.roll == 0.0 => {
                write!(f, "BendBy(length={},angle={})", s.length, s.angle)
            }
            SegmentSpec::BendBy(s) => write!(
                f,
                "BendBy(length={},angle={},roll={})",
                s.length, s.angle, s.roll
            ),
            SegmentSpec::LineTo(s) => write!(f, "LineTo({})", s.end),
            SegmentSpec::ArcTo(s) => write!(f, "ArcTo({},{})", s.radius, s.end),
        }
    }
}
