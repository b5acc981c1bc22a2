//! 绘制契约
//!
//! 核心库不做任何绘制：元素、曲线与框架通过 `render(style)` 输出有序的图元列表，
//! 每个图元携带自己的绝对位姿、图层、名称与所代表的元素（裸位姿标记则没有元素）。
//! 样式解析和像素输出由渲染端负责，渲染端按 [`PrimitiveKind`] 分派。

use crate::element::Element;
use crate::pose::Transform;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 生成图元时的样式选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    /// 为每个位姿输出名称标签
    pub labels: bool,

    /// 为每个位姿输出中心标记
    pub centers: bool,

    /// 曲线每段的采样点数
    pub curve_steps: usize,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            labels: false,
            centers: true,
            curve_steps: 5,
        }
    }
}

/// 图元类型，供渲染端分派
///
/// 内置渲染只产生 `Marker`、`Text`、`Line`、`Polyline`、`Polygon` 和 `Assembly`：
/// 矩形输出为多边形，曲线输出为折线，框架展开为各部件的图元。
/// `Rectangle`、`Curve`、`Frame` 仅出现在调用方用 [`Primitive::new`]
/// 直接包装此类元素的图元上，渲染端可按元素自行绘制。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// 裸位姿标记
    Marker,
    Text,
    Line,
    Polyline,
    Polygon,
    Rectangle,
    Curve,
    Frame,
    Assembly,
}

impl PrimitiveKind {
    pub fn of(element: Option<&Element>) -> Self {
        match element {
            None => PrimitiveKind::Marker,
            Some(Element::Text(_)) => PrimitiveKind::Text,
            Some(Element::Line(_)) => PrimitiveKind::Line,
            Some(Element::Polyline(_)) => PrimitiveKind::Polyline,
            Some(Element::Polygon(_)) => PrimitiveKind::Polygon,
            Some(Element::Rectangle(_)) => PrimitiveKind::Rectangle,
            Some(Element::Curve(_)) => PrimitiveKind::Curve,
            Some(Element::Frame(_)) => PrimitiveKind::Frame,
            Some(Element::Assembly(_)) => PrimitiveKind::Assembly,
        }
    }
}

/// 可绘制图元：已解析的位姿 + 可选元素
#[derive(Debug, Clone)]
pub struct Primitive {
    pub pose: Transform,
}

impl Primitive {
    pub fn new(pose: Transform) -> Self {
        Self { pose }
    }

    pub fn name(&self) -> Option<&str> {
        self.pose.name()
    }

    pub fn layer(&self) -> Option<&str> {
        self.pose.layer.as_deref()
    }

    pub fn element(&self) -> Option<&Arc<Element>> {
        self.pose.element()
    }

    pub fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::of(self.element().map(|e| e.as_ref()))
    }

    /// 放入父位姿坐标系并重新命名
    pub fn at(self, name: impl Into<String>, parent: &Transform) -> Primitive {
        Primitive::new(self.pose.at(name, parent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Rectangle, Text};
    use approx::assert_relative_eq;

    #[test]
    fn test_style_defaults_from_partial_json() {
        let style: Style = serde_json::from_str(r#"{"labels": true}"#).unwrap();
        assert!(style.labels);
        assert!(style.centers);
        assert_eq!(style.curve_steps, 5);
    }

    #[test]
    fn test_pose_render_order_and_names() {
        let rect = Arc::new(Element::from(Rectangle::new(1.0, 1.0).named("R1")));
        let pose = Transform::placing(&rect, "a").tx(1.0).on_layer("magnets");
        let style = Style {
            labels: true,
            ..Style::default()
        };

        let primitives = pose.render(&style);
        let kinds: Vec<_> = primitives.iter().map(|p| p.kind()).collect();
        assert_eq!(
            kinds,
            vec![PrimitiveKind::Text, PrimitiveKind::Marker, PrimitiveKind::Polygon]
        );
        assert_eq!(primitives[0].name(), Some("a"));
        assert_eq!(primitives[1].name(), Some("a"));
        assert_eq!(primitives[2].name(), Some("a/R1"));

        // 图元位姿已被放置到 a 的位置，并继承图层
        assert_relative_eq!(primitives[2].pose.x(), 1.0);
        assert_eq!(primitives[2].layer(), Some("magnets"));
    }

    #[test]
    fn test_kind_of_wrapped_elements() {
        let rect = Arc::new(Element::from(Rectangle::new(1.0, 1.0).named("R1")));
        let wrapped = Primitive::new(Transform::placing(&rect, "r"));
        assert_eq!(wrapped.kind(), PrimitiveKind::Rectangle);

        // 经由渲染则为多边形
        let rendered = wrapped.pose.render(&Style::default());
        assert!(rendered.iter().all(|p| p.kind() != PrimitiveKind::Rectangle));
        assert_eq!(rendered.last().unwrap().kind(), PrimitiveKind::Polygon);

        assert_eq!(Primitive::new(Transform::identity()).kind(), PrimitiveKind::Marker);
    }

    #[test]
    fn test_hidden_centers() {
        let text = Arc::new(Element::from(Text::new("hello")));
        let pose = Transform::placing(&text, "t");
        let style = Style {
            centers: false,
            ..Style::default()
        };
        let primitives = pose.render(&style);
        assert_eq!(primitives.len(), 1);
        assert_eq!(primitives[0].kind(), PrimitiveKind::Text);
        // 无名元素图元沿用位姿名称
        assert_eq!(primitives[0].name(), Some("t"));
    }
}
