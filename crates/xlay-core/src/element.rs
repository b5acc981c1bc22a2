//! 元素与路径寻址
//!
//! `Element` 是所有可被位姿定位的对象：基本图元、曲线、框架与组件。
//! 每个元素暴露一组具名的子位姿（landmark），例如矩形的 `left`、曲线的 `end`、
//! 框架的各个部件。
//!
//! 路径 `a/b/c` 的解析由 [`resolve_path`] 统一完成：第一段在根容器中查找，
//! 后续各段在上一段结果所引用的元素中查找，途经的变换按访问顺序相乘。

use crate::assembly::Assembly;
use crate::curve::Curve;
use crate::error::LayoutError;
use crate::frame::Frame;
use crate::pose::Transform;
use crate::render::{Primitive, Style};
use crate::shapes::{Line, Polygon, Polyline, Rectangle, Text};
use std::sync::Arc;

/// 可寻址能力：按名称给出直接子位姿
pub trait Addressable {
    /// 容器名称（用于错误信息）
    fn display_name(&self) -> String;

    /// 查找直接子位姿，结果在本容器所在坐标系中表达
    fn child(&self, key: &str) -> Option<Transform>;
}

/// 解析 `/` 分隔的路径
pub fn resolve_path(root: &dyn Addressable, path: &str) -> Result<Transform, LayoutError> {
    let mut segments = path.split('/');
    let first = segments.next().unwrap_or_default();

    let mut current = lookup(root, first, "")?;
    let mut walked = first.to_string();

    for segment in segments {
        current = lookup(&current, segment, &walked)?;
        walked.push('/');
        walked.push_str(segment);
    }

    Ok(current)
}

fn lookup(
    container: &dyn Addressable,
    segment: &str,
    walked: &str,
) -> Result<Transform, LayoutError> {
    let found = if segment.is_empty() {
        None
    } else {
        container.child(segment)
    };
    found.ok_or_else(|| LayoutError::PathNotFound {
        segment: segment.to_string(),
        container: container.display_name(),
        path: walked.to_string(),
    })
}

/// 几何/组件元素
#[derive(Debug, Clone)]
pub enum Element {
    Rectangle(Rectangle),
    Line(Line),
    Polyline(Polyline),
    Polygon(Polygon),
    Text(Text),
    Curve(Curve),
    Frame(Frame),
    Assembly(Assembly),
}

impl Element {
    pub fn name(&self) -> Option<&str> {
        match self {
            Element::Rectangle(r) => r.name.as_deref(),
            Element::Line(l) => l.name.as_deref(),
            Element::Polyline(p) => p.name.as_deref(),
            Element::Polygon(p) => p.name.as_deref(),
            Element::Text(t) => t.name.as_deref(),
            Element::Curve(c) => c.name.as_deref(),
            Element::Frame(f) => Some(f.name.as_str()),
            Element::Assembly(a) => a.name.as_deref(),
        }
    }

    pub fn layer(&self) -> Option<&str> {
        match self {
            Element::Rectangle(r) => r.layer.as_deref(),
            Element::Line(l) => l.layer.as_deref(),
            Element::Polyline(p) => p.layer.as_deref(),
            Element::Polygon(p) => p.layer.as_deref(),
            Element::Text(t) => t.layer.as_deref(),
            Element::Curve(c) => c.layer.as_deref(),
            Element::Frame(_) | Element::Assembly(_) => None,
        }
    }

    /// 类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            Element::Rectangle(_) => "Rectangle",
            Element::Line(_) => "Line",
            Element::Polyline(_) => "Polyline",
            Element::Polygon(_) => "Polygon",
            Element::Text(_) => "Text",
            Element::Curve(_) => "Curve",
            Element::Frame(_) => "Frame",
            Element::Assembly(_) => "Assembly",
        }
    }

    /// 元素局部坐标系中的具名子位姿
    pub fn landmark(&self, key: &str) -> Option<Transform> {
        match self {
            Element::Rectangle(r) => r.landmark(key),
            Element::Line(l) => l.landmark(key),
            Element::Curve(c) => c.landmark(key),
            Element::Frame(f) => f.part(key).cloned(),
            Element::Assembly(a) => a.landmark(key),
            Element::Polyline(_) | Element::Polygon(_) | Element::Text(_) => None,
        }
    }

    /// 生成绘制图元（元素局部坐标系）
    pub fn render(&self, style: &Style) -> Vec<Primitive> {
        match self {
            Element::Rectangle(r) => r.render(style),
            Element::Curve(c) => c.render(style),
            Element::Frame(f) => f.render(style),
            Element::Assembly(a) => a.render(style),
            Element::Line(_) | Element::Polyline(_) | Element::Polygon(_) | Element::Text(_) => {
                vec![self.as_primitive()]
            }
        }
    }

    /// 在原点处代表元素自身的图元
    pub(crate) fn as_primitive(&self) -> Primitive {
        let mut pose = Transform::identity().with_element(Arc::new(self.clone()));
        pose.name = self.name().map(str::to_string);
        pose.layer = self.layer().map(str::to_string);
        Primitive::new(pose)
    }

    pub fn as_assembly(&self) -> Option<&Assembly> {
        match self {
            Element::Assembly(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_frame(&self) -> Option<&Frame> {
        match self {
            Element::Frame(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_curve(&self) -> Option<&Curve> {
        match self {
            Element::Curve(c) => Some(c),
            _ => None,
        }
    }

    /// 在元素中按路径查找子位姿（元素局部坐标系）
    pub fn resolve(&self, path: &str) -> Result<Transform, LayoutError> {
        resolve_path(self, path)
    }
}

impl Addressable for Element {
    fn display_name(&self) -> String {
        self.name().unwrap_or(self.type_name()).to_string()
    }

    fn child(&self, key: &str) -> Option<Transform> {
        self.landmark(key)
    }
}

macro_rules! impl_from_element {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Element {
                fn from(value: $variant) -> Self {
                    Element::$variant(value)
                }
            }
        )*
    };
}

impl_from_element!(Rectangle, Line, Polyline, Polygon, Text, Curve, Frame, Assembly);
