//! 组件（Assembly）
//!
//! 组件只携带静态属性：长度、偏转角、倾角、孔径，以及可选的内部部件框架。
//! 磁铁、二极铁、四极铁等只是 [`AssemblyKind`] 标签，不引入额外行为。
//!
//! 组件的定位点：内部部件，以及沿参考轨道的 `start`、`middle`、`end`
//! （按 `BendBy(length, angle, tilt)` 的闭式解计算）。

use crate::element::Element;
use crate::frame::{Frame, Prototype};
use crate::pose::Transform;
use crate::render::{Primitive, Style};
use crate::segment::Bend;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 组件类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AssemblyKind {
    #[default]
    Generic,
    Magnet,
    Bend,
    Quadrupole,
}

/// 派生组件时覆盖的字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyOverrides {
    pub name: Option<String>,
    pub length: Option<f64>,
    pub angle: Option<f64>,
    pub tilt: Option<f64>,
    pub aperture: Option<f64>,
    pub parent: Option<String>,
}

/// 组件
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub name: Option<String>,
    pub kind: AssemblyKind,

    /// 参考轨道长度
    pub length: f64,

    /// 偏转角（度）
    pub angle: f64,

    /// 倾角（度），即偏转平面绕前进方向的滚转
    pub tilt: f64,

    /// 孔径
    pub aperture: Option<f64>,

    /// 内部部件
    pub parts: Option<Frame>,

    pub data: Option<serde_json::Value>,
    pub parent: Option<String>,

    prototype: Option<Prototype<Assembly, AssemblyOverrides>>,
}

impl Assembly {
    pub fn new(name: impl Into<String>, kind: AssemblyKind) -> Self {
        Self {
            name: Some(name.into()),
            kind,
            ..Default::default()
        }
    }

    pub fn magnet(name: impl Into<String>, length: f64, angle: f64) -> Self {
        Self::new(name, AssemblyKind::Magnet)
            .with_length(length)
            .with_angle(angle)
    }

    /// 二极铁
    pub fn bend(name: impl Into<String>, length: f64, angle: f64) -> Self {
        Self::new(name, AssemblyKind::Bend)
            .with_length(length)
            .with_angle(angle)
    }

    /// 四极铁（不偏转）
    pub fn quadrupole(name: impl Into<String>, length: f64) -> Self {
        Self::new(name, AssemblyKind::Quadrupole).with_length(length)
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_tilt(mut self, tilt: f64) -> Self {
        self.tilt = tilt;
        self
    }

    pub fn with_aperture(mut self, aperture: f64) -> Self {
        self.aperture = Some(aperture);
        self
    }

    pub fn with_parts(mut self, parts: Frame) -> Self {
        self.parts = Some(parts);
        self
    }

    pub fn prototype(&self) -> Option<&Prototype<Assembly, AssemblyOverrides>> {
        self.prototype.as_ref()
    }

    /// 派生新组件并记录来源，原型保持不变
    pub fn derive(self: &Arc<Self>, overrides: AssemblyOverrides) -> Assembly {
        let mut derived = Assembly {
            prototype: None,
            ..(**self).clone()
        };
        if let Some(name) = &overrides.name {
            derived.name = Some(name.clone());
        }
        if let Some(length) = overrides.length {
            derived.length = length;
        }
        if let Some(angle) = overrides.angle {
            derived.angle = angle;
        }
        if let Some(tilt) = overrides.tilt {
            derived.tilt = tilt;
        }
        if let Some(aperture) = overrides.aperture {
            derived.aperture = Some(aperture);
        }
        if let Some(parent) = &overrides.parent {
            derived.parent = Some(parent.clone());
        }
        derived.prototype = Some(Prototype::new(Arc::clone(self), overrides));
        derived
    }

    /// 参考轨道
    pub fn reference_arc(&self) -> Bend {
        Bend::new(Transform::identity(), self.length, self.angle, self.tilt)
    }

    pub fn landmark(&self, key: &str) -> Option<Transform> {
        if let Some(part) = self.parts.as_ref().and_then(|parts| parts.part(key)) {
            return Some(part.clone());
        }
        let s = match key {
            "start" => 0.0,
            "middle" => self.length / 2.0,
            "end" => self.length,
            _ => return None,
        };
        Some(self.reference_arc().point(s).named(key))
    }

    pub fn render(&self, style: &Style) -> Vec<Primitive> {
        match &self.parts {
            Some(parts) if !parts.is_empty() => parts.render(style),
            _ => vec![Element::Assembly(self.clone()).as_primitive()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;
    use crate::render::PrimitiveKind;
    use crate::shapes::Rectangle;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_reference_landmarks() {
        let mb = Assembly::bend("MB", 5.0, 90.0);
        let radius = 5.0 / FRAC_PI_2;

        let start = mb.landmark("start").unwrap();
        assert_relative_eq!(start.loc(), Vector3::zeros());

        let end = mb.landmark("end").unwrap();
        assert_relative_eq!(end.loc(), Vector3::new(-radius, 0.0, radius), epsilon = 1e-12);

        let middle = mb.landmark("middle").unwrap();
        let half = std::f64::consts::FRAC_PI_4;
        assert_relative_eq!(
            middle.loc(),
            Vector3::new(radius * (half.cos() - 1.0), 0.0, radius * half.sin()),
            epsilon = 1e-12
        );
        assert!(mb.landmark("entry").is_none());
    }

    #[test]
    fn test_parts_take_precedence() {
        let rect = Arc::new(Element::from(Rectangle::new(0.2, 0.2).named("coil")));
        let parts = Frame::with_parts("MQ.parts", [Transform::placing(&rect, "end").tz(0.1)])
            .unwrap();
        let mq = Assembly::quadrupole("MQ", 1.0).with_parts(parts);
        assert_relative_eq!(mq.landmark("end").unwrap().z(), 0.1);
        assert_relative_eq!(mq.landmark("middle").unwrap().z(), 0.5);
    }

    #[test]
    fn test_render_without_parts() {
        let mq = Assembly::quadrupole("MQ", 1.0).with_aperture(0.02);
        let primitives = mq.render(&Style::default());
        assert_eq!(primitives.len(), 1);
        assert_eq!(primitives[0].kind(), PrimitiveKind::Assembly);
        assert_eq!(primitives[0].name(), Some("MQ"));
    }

    #[test]
    fn test_derive_records_overrides() {
        let base = Arc::new(Assembly::bend("MB", 3.4, 0.086).with_tilt(0.0));
        let derived = base.derive(AssemblyOverrides {
            name: Some("MB.1".to_string()),
            tilt: Some(90.0),
            ..Default::default()
        });
        assert_eq!(derived.name.as_deref(), Some("MB.1"));
        assert_eq!(derived.tilt, 90.0);
        assert_eq!(derived.length, 3.4);
        assert_eq!(base.tilt, 0.0);

        let prototype = derived.prototype().unwrap();
        assert!(Arc::ptr_eq(prototype.source(), &base));
        assert_eq!(prototype.overrides().tilt, Some(90.0));
        assert_eq!(derived.kind, AssemblyKind::Bend);
    }
}
