//! 位姿（Pose）
//!
//! `Transform` 是带标识的 4×4 齐次刚体变换：左上 3×3 为旋转，最后一行恒为
//! `[0, 0, 0, 1]`。它可以引用一个被它定位的元素（图元、框架或组件）。
//!
//! # 值语义
//!
//! 增量操作 `tx`/`ty`/`tz`/`rx`/`ry`/`rz` 消耗 `self` 并返回新的位姿，
//! 在位姿自身的局部坐标系中右乘基本变换，因此调用顺序有意义。
//! 需要从同一位姿分出两支几何时必须显式 `clone()`。
//! 原地修改只通过 `translate_mut`/`rotate_mut` 提供，供唯一持有实例的构建者使用。
//!
//! # 组合约定
//!
//! `parent.compose(&child)` 的矩阵为 `parent.matrix * child.matrix`，
//! 即父变换在左：子位姿的局部变换乘上父位姿的绝对变换得到子位姿的绝对变换。

use crate::element::{resolve_path, Addressable, Element};
use crate::error::LayoutError;
use crate::math::{self, Matrix3, Matrix4, Vector3, RIGID_TOLERANCE};
use crate::render::{Primitive, Style};
use crate::shapes::Text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Mul;
use std::sync::Arc;

/// 局部坐标轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Axis {
    X,
    Y,
    /// 束流前进方向
    #[default]
    Z,
}

impl Axis {
    /// 轴在矩阵中的列索引
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }

    /// 单位向量
    pub fn unit(self) -> Vector3 {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
        }
    }
}

/// 局部增量操作（平移距离或旋转角度，角度单位为度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LocalOp {
    Translate(Axis, f64),
    Rotate(Axis, f64),
}

impl LocalOp {
    /// 从 `tx`、`ry` 这类键名解析
    pub fn parse(key: &str, value: f64) -> Result<Self, LayoutError> {
        let axis = match key.get(1..) {
            Some("x") => Axis::X,
            Some("y") => Axis::Y,
            Some("z") => Axis::Z,
            _ => {
                return Err(LayoutError::InvalidArgument(format!(
                    "unknown local operation `{key}`"
                )))
            }
        };
        match key.chars().next() {
            Some('t') => Ok(LocalOp::Translate(axis, value)),
            Some('r') => Ok(LocalOp::Rotate(axis, value)),
            _ => Err(LayoutError::InvalidArgument(format!(
                "unknown local operation `{key}`"
            ))),
        }
    }
}

/// 位姿：刚体变换 + 标识 + 可选元素引用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transform {
    matrix: Matrix4,

    /// 名称，在所属容器内唯一，用于路径查找
    pub name: Option<String>,

    /// 显示标签
    pub label: Option<String>,

    /// 样式路由图层
    pub layer: Option<String>,

    /// 被定位的元素（浅拷贝共享，元素本身不可变）
    #[serde(skip)]
    element: Option<Arc<Element>>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// 原点处的单位位姿
    pub fn identity() -> Self {
        Self::from_matrix(Matrix4::identity())
    }

    /// 指定位置、坐标轴与全局轴对齐
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self::from_matrix(math::translation(x, y, z))
    }

    /// 由原点和三根轴（矩阵的列）构造
    ///
    /// 不检查正交性：调用者需保证 `dx`、`dy`、`dz` 构成右手正交基。
    pub fn from_axes(loc: Vector3, dx: Vector3, dy: Vector3, dz: Vector3) -> Self {
        Self::from_loc_rot(loc, Matrix3::from_columns(&[dx, dy, dz]))
    }

    /// 由位置与旋转矩阵构造（不检查旋转矩阵）
    pub fn from_loc_rot(loc: Vector3, rot: Matrix3) -> Self {
        Self::from_matrix(math::homogeneous(&rot, &loc))
    }

    /// 由原始矩阵构造（不检查刚性，见 [`Transform::try_from_matrix`]）
    pub fn from_matrix(matrix: Matrix4) -> Self {
        Self {
            matrix,
            name: None,
            label: None,
            layer: None,
            element: None,
        }
    }

    /// 由原始矩阵构造并检查刚性
    pub fn try_from_matrix(matrix: Matrix4) -> Result<Self, LayoutError> {
        if !math::is_rigid(&matrix, RIGID_TOLERANCE) {
            return Err(LayoutError::NotRigid);
        }
        Ok(Self::from_matrix(matrix))
    }

    /// 在原点放置一个元素
    pub fn placing(element: &Arc<Element>, name: impl Into<String>) -> Self {
        Self::identity()
            .named(name)
            .with_element(Arc::clone(element))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    pub fn with_element(mut self, element: Arc<Element>) -> Self {
        self.element = Some(element);
        self
    }

    pub fn matrix(&self) -> &Matrix4 {
        &self.matrix
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn element(&self) -> Option<&Arc<Element>> {
        self.element.as_ref()
    }

    pub fn x(&self) -> f64 {
        self.matrix[(0, 3)]
    }

    pub fn y(&self) -> f64 {
        self.matrix[(1, 3)]
    }

    pub fn z(&self) -> f64 {
        self.matrix[(2, 3)]
    }

    /// 原点位置
    pub fn loc(&self) -> Vector3 {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// 旋转部分
    pub fn rot(&self) -> Matrix3 {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// 局部 x 轴在父坐标系中的方向
    pub fn dx(&self) -> Vector3 {
        self.axis(Axis::X)
    }

    pub fn dy(&self) -> Vector3 {
        self.axis(Axis::Y)
    }

    pub fn dz(&self) -> Vector3 {
        self.axis(Axis::Z)
    }

    pub fn axis(&self, axis: Axis) -> Vector3 {
        self.matrix.fixed_view::<3, 1>(0, axis.index()).into_owned()
    }

    /// 组合：`self.matrix * other.matrix`，保留 `self` 的标识
    pub fn compose(&self, other: &Transform) -> Transform {
        let mut result = self.clone();
        result.matrix = self.matrix * other.matrix;
        result
    }

    /// 仅组合旋转部分，位置保持不变
    pub fn rotate_by(&self, other: &Transform) -> Transform {
        let mut result = self.clone();
        let rot = self.rot() * other.rot();
        result.matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(&rot);
        result
    }

    /// 仅叠加位置，旋转保持不变
    pub fn offset_by(&self, other: &Transform) -> Transform {
        let mut result = self.clone();
        let loc = self.loc() + other.loc();
        result.matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&loc);
        result
    }

    /// 放入父坐标系：矩阵变为 `parent.matrix * self.matrix`，并重新命名
    pub fn at(&self, name: impl Into<String>, parent: &Transform) -> Transform {
        let mut result = self.clone();
        result.matrix = parent.matrix * self.matrix;
        result.name = Some(name.into());
        result
    }

    /// 相同矩阵、全新标识（名称、标签、图层、元素均清空）
    pub fn anonymous(&self) -> Transform {
        Self::from_matrix(self.matrix)
    }

    /// 原点之间的欧氏距离
    pub fn distance(&self, other: &Transform) -> f64 {
        (self.loc() - other.loc()).norm()
    }

    /// 旋转部分是否正交且行列式为 1
    pub fn is_rigid(&self, tolerance: f64) -> bool {
        math::is_rigid(&self.matrix, tolerance)
    }

    /// 在局部坐标系中原地平移
    pub fn translate_mut(&mut self, axis: Axis, distance: f64) {
        let step = axis.unit() * distance;
        self.matrix *= math::translation(step.x, step.y, step.z);
    }

    /// 在局部坐标系中原地旋转（度）
    pub fn rotate_mut(&mut self, axis: Axis, angle: f64) {
        let rad = angle.to_radians();
        let rot = match axis {
            Axis::X => math::rotation_x(rad),
            Axis::Y => math::rotation_y(rad),
            Axis::Z => math::rotation_z(rad),
        };
        self.matrix *= rot.to_homogeneous();
    }

    pub fn apply_mut(&mut self, op: LocalOp) {
        match op {
            LocalOp::Translate(axis, distance) => self.translate_mut(axis, distance),
            LocalOp::Rotate(axis, angle) => self.rotate_mut(axis, angle),
        }
    }

    pub fn apply(mut self, op: LocalOp) -> Self {
        self.apply_mut(op);
        self
    }

    pub fn translate(mut self, axis: Axis, distance: f64) -> Self {
        self.translate_mut(axis, distance);
        self
    }

    pub fn rotate(mut self, axis: Axis, angle: f64) -> Self {
        self.rotate_mut(axis, angle);
        self
    }

    pub fn tx(self, distance: f64) -> Self {
        self.translate(Axis::X, distance)
    }

    pub fn ty(self, distance: f64) -> Self {
        self.translate(Axis::Y, distance)
    }

    pub fn tz(self, distance: f64) -> Self {
        self.translate(Axis::Z, distance)
    }

    pub fn rx(self, angle: f64) -> Self {
        self.rotate(Axis::X, angle)
    }

    pub fn ry(self, angle: f64) -> Self {
        self.rotate(Axis::Y, angle)
    }

    pub fn rz(self, angle: f64) -> Self {
        self.rotate(Axis::Z, angle)
    }

    /// 按 `/` 分隔的路径查找元素的子位姿，结果在本位姿的父坐标系中表达
    pub fn resolve(&self, path: &str) -> Result<Transform, LayoutError> {
        resolve_path(self, path)
    }

    fn child_name(&self, key: &str) -> String {
        match &self.name {
            Some(name) => format!("{name}/{key}"),
            None => key.to_string(),
        }
    }

    /// 生成绘制图元
    ///
    /// 依次输出：可选的名称标签、可选的中心标记、元素图元（由本位姿重新放置，
    /// 命名为 `"{位姿名}/{图元名}"`）。
    pub fn render(&self, style: &Style) -> Vec<Primitive> {
        let mut primitives = Vec::new();

        if style.labels {
            let text = self
                .name
                .clone()
                .or_else(|| self.label.clone())
                .unwrap_or_default();
            let element = Arc::new(Element::Text(Text::new(text)));
            let mut pose = self.anonymous().with_element(element);
            pose.name = self.name.clone();
            pose.layer = self.layer.clone();
            primitives.push(Primitive::new(pose));
        }

        if style.centers {
            let mut marker = self.anonymous();
            marker.name = self.name.clone();
            marker.layer = self.layer.clone();
            primitives.push(Primitive::new(marker));
        }

        if let Some(element) = &self.element {
            for primitive in element.render(style) {
                let name = match primitive.name() {
                    Some(child) => self.child_name(child),
                    None => self.name.clone().unwrap_or_default(),
                };
                let mut placed = primitive.at(name, self);
                if placed.pose.layer.is_none() {
                    placed.pose.layer = self.layer.clone();
                }
                primitives.push(placed);
            }
        }

        primitives
    }
}

impl Addressable for Transform {
    fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "<pose>".to_string())
    }

    fn child(&self, key: &str) -> Option<Transform> {
        let landmark = self.element.as_ref()?.landmark(key)?;
        Some(landmark.at(self.child_name(key), self))
    }
}

impl Mul<&Transform> for &Transform {
    type Output = Transform;

    fn mul(self, rhs: &Transform) -> Transform {
        self.compose(rhs)
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<")?;
        if let Some(name) = &self.name {
            write!(f, "{name:?}: ")?;
        }
        if let Some(element) = &self.element {
            match element.name() {
                Some(name) => write!(f, "{name:?} ")?,
                None => write!(f, "{} ", element.type_name())?,
            }
        }
        write!(f, "at [{:.6}, {:.6}, {:.6}]>", self.x(), self.y(), self.z())
    }
}
