//! 框架（Frame）
//!
//! 框架是具名的部件容器：部件名 → 位姿（位姿可引用元素或嵌套框架）。
//! 部件名在同一框架内唯一，部件按添加顺序渲染。
//!
//! `frame.resolve("a/left")` 的矩阵等于 `parts["a"].matrix * left.matrix`，
//! 其中 `left` 是部件 `a` 所引用元素的局部定位点。

use crate::element::{resolve_path, Addressable};
use crate::error::LayoutError;
use crate::pose::Transform;
use crate::render::{Primitive, Style};
use indexmap::IndexMap;
use std::sync::Arc;

/// 派生来源：原型的共享引用 + 派生时覆盖字段的快照
///
/// 只用于追溯，派生对象从不修改原型。
#[derive(Debug, Clone)]
pub struct Prototype<T, O> {
    source: Arc<T>,
    overrides: O,
}

impl<T, O> Prototype<T, O> {
    pub fn new(source: Arc<T>, overrides: O) -> Self {
        Self { source, overrides }
    }

    pub fn source(&self) -> &Arc<T> {
        &self.source
    }

    pub fn overrides(&self) -> &O {
        &self.overrides
    }
}

/// 派生框架时覆盖的字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOverrides {
    pub name: Option<String>,
    pub parent: Option<String>,
    pub data: Option<serde_json::Value>,
}

/// 部件容器
#[derive(Debug, Clone)]
pub struct Frame {
    pub name: String,

    /// 部件位姿（按添加顺序）
    parts: IndexMap<String, Transform>,

    /// 其他元数据
    pub data: Option<serde_json::Value>,

    /// 上级容器名称（仅记录，不持有）
    pub parent: Option<String>,

    prototype: Option<Prototype<Frame, FrameOverrides>>,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parts: IndexMap::new(),
            data: None,
            parent: None,
            prototype: None,
        }
    }

    /// 创建并添加部件
    pub fn with_parts(
        name: impl Into<String>,
        parts: impl IntoIterator<Item = Transform>,
    ) -> Result<Self, LayoutError> {
        let mut frame = Self::new(name);
        for part in parts {
            frame.add_part(part)?;
        }
        Ok(frame)
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// 添加部件；部件必须具名且名称未被占用
    pub fn add_part(&mut self, part: Transform) -> Result<&mut Self, LayoutError> {
        let Some(name) = part.name.clone() else {
            return Err(LayoutError::InvalidArgument(format!(
                "part added to frame `{}` has no name",
                self.name
            )));
        };
        if self.parts.contains_key(&name) {
            return Err(LayoutError::DuplicateName {
                name,
                container: self.name.clone(),
            });
        }
        tracing::debug!("Frame {}: added part {}", self.name, part);
        self.parts.insert(name, part);
        Ok(self)
    }

    pub fn part(&self, name: &str) -> Option<&Transform> {
        self.parts.get(name)
    }

    pub fn parts(&self) -> impl Iterator<Item = &Transform> {
        self.parts.values()
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn prototype(&self) -> Option<&Prototype<Frame, FrameOverrides>> {
        self.prototype.as_ref()
    }

    /// 按路径查找，结果在本框架坐标系中表达
    pub fn resolve(&self, path: &str) -> Result<Transform, LayoutError> {
        resolve_path(self, path)
    }

    /// 派生新框架：复制部件，应用覆盖字段，并记录来源
    pub fn derive(self: &Arc<Self>, overrides: FrameOverrides) -> Frame {
        let mut derived = Frame {
            name: self.name.clone(),
            parts: self.parts.clone(),
            data: self.data.clone(),
            parent: self.parent.clone(),
            prototype: None,
        };
        if let Some(name) = &overrides.name {
            derived.name = name.clone();
        }
        if let Some(parent) = &overrides.parent {
            derived.parent = Some(parent.clone());
        }
        if let Some(data) = &overrides.data {
            derived.data = Some(data.clone());
        }
        derived.prototype = Some(Prototype::new(Arc::clone(self), overrides));
        derived
    }

    /// 依次渲染所有部件
    pub fn render(&self, style: &Style) -> Vec<Primitive> {
        self.parts
            .values()
            .flat_map(|part| part.render(style))
            .collect()
    }
}

impl Addressable for Frame {
    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn child(&self, key: &str) -> Option<Transform> {
        self.parts.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::shapes::Rectangle;
    use approx::assert_relative_eq;

    fn rect_frame() -> (Arc<Element>, Frame) {
        let rect = Arc::new(Element::from(Rectangle::new(1.0, 1.0).named("R1")));
        let frame = Frame::with_parts(
            "F",
            [
                Transform::placing(&rect, "a").tx(1.0).rz(45.0),
                Transform::placing(&rect, "b").tx(-1.0).rz(45.0),
                Transform::placing(&rect, "c").ty(1.0).rz(45.0),
                Transform::placing(&rect, "d").ty(-1.0).rz(45.0),
            ],
        )
        .unwrap();
        (rect, frame)
    }

    #[test]
    fn test_resolve_matches_manual_product() {
        let (rect, frame) = rect_frame();
        let resolved = frame.resolve("a/left").unwrap();
        let manual = frame.part("a").unwrap().matrix() * rect.landmark("left").unwrap().matrix();
        assert_eq!(*resolved.matrix(), manual);

        // 左点在 a 的坐标系中位于 (-0.5, 0)，a 转了 45°
        let h = 0.5 / 2f64.sqrt();
        assert_relative_eq!(resolved.x(), 1.0 - h, epsilon = 1e-12);
        assert_relative_eq!(resolved.y(), -h, epsilon = 1e-12);
    }

    #[test]
    fn test_resolve_part_only() {
        let (_, frame) = rect_frame();
        let part = frame.resolve("b").unwrap();
        assert_eq!(part.matrix(), frame.part("b").unwrap().matrix());
    }

    #[test]
    fn test_nested_frame_composes_all_levels() {
        let (rect, inner) = rect_frame();
        let inner = Arc::new(Element::from(inner));
        let outer = Frame::with_parts("outer", [Transform::placing(&inner, "sub").tz(2.0).rx(30.0)])
            .unwrap();

        let resolved = outer.resolve("sub/c/top").unwrap();
        let expected = outer.part("sub").unwrap().matrix()
            * inner.landmark("c").unwrap().matrix()
            * rect.landmark("top").unwrap().matrix();
        assert_relative_eq!(*resolved.matrix(), expected, epsilon = 1e-12);
        assert_eq!(resolved.name(), Some("sub/c/top"));
    }

    #[test]
    fn test_missing_segment_names_container() {
        let (_, frame) = rect_frame();
        let err = frame.resolve("z/left").unwrap_err();
        assert_eq!(
            err,
            LayoutError::PathNotFound {
                segment: "z".to_string(),
                container: "F".to_string(),
                path: String::new(),
            }
        );

        let err = frame.resolve("a/nowhere").unwrap_err();
        assert_eq!(
            err,
            LayoutError::PathNotFound {
                segment: "nowhere".to_string(),
                container: "a".to_string(),
                path: "a".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_and_unnamed_parts() {
        let (rect, mut frame) = rect_frame();
        let err = frame.add_part(Transform::placing(&rect, "a")).unwrap_err();
        assert!(matches!(err, LayoutError::DuplicateName { .. }));
        assert!(frame.add_part(Transform::identity()).is_err());
        assert_eq!(frame.len(), 4);
    }

    #[test]
    fn test_render_in_part_order() {
        let (_, frame) = rect_frame();
        let primitives = frame.render(&Style::default());
        // 每个部件：中心标记 + 矩形轮廓
        assert_eq!(primitives.len(), 8);
        let names: Vec<_> = primitives.iter().filter_map(|p| p.name()).collect();
        assert_eq!(
            names,
            vec!["a", "a/R1", "b", "b/R1", "c", "c/R1", "d", "d/R1"]
        );
    }

    #[test]
    fn test_derive_keeps_prototype_untouched() {
        let (_, frame) = rect_frame();
        let original = Arc::new(frame.with_data(serde_json::json!({"owner": "ring"})));
        let derived = original.derive(FrameOverrides {
            name: Some("F2".to_string()),
            ..Default::default()
        });

        assert_eq!(derived.name, "F2");
        assert_eq!(original.name, "F");
        assert_eq!(derived.data, original.data);
        assert_eq!(derived.len(), original.len());

        let prototype = derived.prototype().unwrap();
        assert!(Arc::ptr_eq(prototype.source(), &original));
        assert_eq!(prototype.overrides().name.as_deref(), Some("F2"));
        assert!(original.prototype().is_none());
    }
}
