//! 基本图元
//!
//! 支持的图元：
//! - 矩形 (Rectangle)：带九个具名定位点
//! - 线段 (Line)：起止位姿，方向按球面插值
//! - 多段线 (Polyline) / 多边形 (Polygon)
//! - 文本 (Text)

use crate::element::Element;
use crate::math::{self, Matrix3, Point3, Vector3, EPSILON};
use crate::pose::Transform;
use crate::render::{Primitive, Style};
use nalgebra::{Rotation3, UnitQuaternion};

/// 矩形，中心位于原点，位于局部 x–y 平面
#[derive(Debug, Clone)]
pub struct Rectangle {
    pub name: Option<String>,
    /// x 方向边长
    pub lx: f64,
    /// y 方向边长
    pub ly: f64,
    pub label: Option<String>,
    pub layer: Option<String>,
}

impl Rectangle {
    /// 定位点名称
    pub const LANDMARKS: [&'static str; 9] = [
        "center", "ul", "ur", "ll", "lr", "left", "right", "top", "bottom",
    ];

    pub fn new(lx: f64, ly: f64) -> Self {
        Self {
            name: None,
            lx,
            ly,
            label: None,
            layer: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    /// 定位点的局部坐标
    fn landmark_offset(&self, key: &str) -> Option<(f64, f64)> {
        let hx = self.lx / 2.0;
        let hy = self.ly / 2.0;
        let offset = match key {
            "center" => (0.0, 0.0),
            "ul" => (-hx, hy),
            "ur" => (hx, hy),
            "ll" => (-hx, -hy),
            "lr" => (hx, -hy),
            "left" => (-hx, 0.0),
            "right" => (hx, 0.0),
            "top" => (0.0, hy),
            "bottom" => (0.0, -hy),
            _ => return None,
        };
        Some(offset)
    }

    pub fn landmark(&self, key: &str) -> Option<Transform> {
        let (x, y) = self.landmark_offset(key)?;
        Some(Transform::new(x, y, 0.0).named(key))
    }

    /// 闭合轮廓：ul → ur → lr → ll → ul
    pub fn outline(&self) -> Vec<Point3> {
        ["ul", "ur", "lr", "ll", "ul"]
            .iter()
            .filter_map(|key| self.landmark_offset(key))
            .map(|(x, y)| Point3::new(x, y, 0.0))
            .collect()
    }

    pub fn render(&self, _style: &Style) -> Vec<Primitive> {
        let mut polygon = Polygon::new(self.outline());
        polygon.name = self.name.clone();
        polygon.layer = self.layer.clone();
        vec![Element::Polygon(polygon).as_primitive()]
    }
}

/// 线段
#[derive(Debug, Clone)]
pub struct Line {
    pub start: Transform,
    pub end: Transform,
    pub name: Option<String>,
    pub label: Option<String>,
    pub layer: Option<String>,
}

impl Line {
    pub fn new(start: Transform, end: Transform) -> Self {
        Self {
            start,
            end,
            name: None,
            label: None,
            layer: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 起止点之间的距离
    pub fn length(&self) -> f64 {
        self.start.distance(&self.end)
    }

    /// 弧长 `s` 处的位姿
    ///
    /// 位置线性插值，方向在起止旋转之间球面插值。
    pub fn point(&self, s: f64) -> Transform {
        let length = self.length();
        let t = if length < EPSILON { 0.0 } else { s / length };
        let loc = self.start.loc() + (self.end.loc() - self.start.loc()) * t;
        Transform::from_loc_rot(loc, self.orientation_at(t))
    }

    fn orientation_at(&self, t: f64) -> Matrix3 {
        let from = rotation_quaternion(&self.start.rot());
        let to = rotation_quaternion(&self.end.rot());
        match from.try_slerp(&to, t, EPSILON) {
            Some(q) => q.to_rotation_matrix().into_inner(),
            // 两端方向几乎相同
            None => self.start.rot(),
        }
    }

    /// 行进方向
    pub fn tangent(&self, _s: f64) -> Vector3 {
        let delta = self.end.loc() - self.start.loc();
        if delta.norm() < EPSILON {
            self.start.dz()
        } else {
            delta.normalize()
        }
    }

    /// 等弧长取 `steps` 个位姿（含两端）
    pub fn points(&self, steps: usize) -> Vec<Transform> {
        math::linspace(0.0, self.length(), steps)
            .map(|s| self.point(s))
            .collect()
    }

    pub fn landmark(&self, key: &str) -> Option<Transform> {
        match key {
            "start" => Some(self.start.anonymous().named(key)),
            "end" => Some(self.end.anonymous().named(key)),
            _ => None,
        }
    }
}

fn rotation_quaternion(rot: &Matrix3) -> UnitQuaternion<f64> {
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*rot))
}

/// 多段线
#[derive(Debug, Clone, Default)]
pub struct Polyline {
    pub name: Option<String>,
    pub points: Vec<Point3>,
    pub label: Option<String>,
    pub layer: Option<String>,
}

impl Polyline {
    pub fn new(points: Vec<Point3>) -> Self {
        Self {
            points,
            ..Default::default()
        }
    }

    /// 折线总长
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
    }
}

/// 多边形（闭合轮廓）
#[derive(Debug, Clone, Default)]
pub struct Polygon {
    pub name: Option<String>,
    pub points: Vec<Point3>,
    pub label: Option<String>,
    pub layer: Option<String>,
}

impl Polygon {
    pub fn new(points: Vec<Point3>) -> Self {
        Self {
            points,
            ..Default::default()
        }
    }
}

/// 文本
#[derive(Debug, Clone, Default)]
pub struct Text {
    pub text: String,
    pub name: Option<String>,
    pub label: Option<String>,
    pub layer: Option<String>,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}
