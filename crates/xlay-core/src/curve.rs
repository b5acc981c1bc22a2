//! 参数曲线引擎
//!
//! 曲线由起始位姿和首尾相接的段（直线、圆弧）组成，参数为累计弧长
//! `s ∈ [s_start, s_end]`。
//!
//! # 查找表
//!
//! 为了让 `point(s)` 在常数时间内定位到段，曲线维护一张分辨率为 `lookup_ds`
//! 的均匀查找表：第 `k` 格记录起点 `s_start + k·lookup_ds` 所在段的索引。
//! 段长一般不是 `lookup_ds` 的整数倍，所以同一格内可能跨越段边界，查询时
//! 需要修正：段起点在 `s` 之后则回退，`s` 已到达下一段起点则前进。
//! 段边界处恰好返回后一段的起点位姿。
//!
//! 构造的时间和查找表内存均为 `O(总长 / lookup_ds)`，换取重复随机查询的常数开销。

use crate::element::Element;
use crate::error::LayoutError;
use crate::math::{Point3, Vector3};
use crate::pose::{Axis, Transform};
use crate::render::{Primitive, Style};
use crate::segment::{ArcTo, BendBy, LineBy, LineTo, Segment, SegmentOutput, SegmentSpec};
use crate::shapes::Polyline;
use serde::{Deserialize, Serialize};

/// 查找表格数上限
pub const MAX_LOOKUP_LEN: usize = 1 << 24;

/// 曲线参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveParams {
    /// 起始弧长
    pub s_start: f64,

    /// 查找表分辨率
    pub lookup_ds: f64,
}

impl Default for CurveParams {
    fn default() -> Self {
        Self {
            s_start: 0.0,
            lookup_ds: 1.0,
        }
    }
}

impl CurveParams {
    pub fn validate(&self) -> Result<(), LayoutError> {
        if !self.s_start.is_finite() {
            return Err(LayoutError::InvalidArgument(format!(
                "s_start must be finite, got {}",
                self.s_start
            )));
        }
        if !(self.lookup_ds.is_finite() && self.lookup_ds > 0.0) {
            return Err(LayoutError::InvalidArgument(format!(
                "lookup_ds must be finite and positive, got {}",
                self.lookup_ds
            )));
        }
        Ok(())
    }
}

/// 光滑参数曲线
#[derive(Debug, Clone)]
pub struct Curve {
    pub name: Option<String>,
    pub label: Option<String>,
    pub layer: Option<String>,

    start: Transform,
    end: Transform,
    s_start: f64,
    s_end: f64,

    /// 已添加的段生成器（可重放）
    specs: Vec<SegmentSpec>,

    /// (段起始弧长, 段)
    segments: Vec<(f64, Segment)>,

    lookup_ds: f64,

    /// 每格起点所在段的索引
    lookup: Vec<usize>,
}

impl Default for Curve {
    fn default() -> Self {
        Self::new()
    }
}

impl Curve {
    /// 从原点出发、默认参数的空曲线
    pub fn new() -> Self {
        Self::starting_at(Transform::identity())
    }

    pub fn starting_at(start: Transform) -> Self {
        let params = CurveParams::default();
        Self::build(start, params)
    }

    /// 指定参数创建空曲线
    pub fn with_params(start: Transform, params: CurveParams) -> Result<Self, LayoutError> {
        params.validate()?;
        Ok(Self::build(start, params))
    }

    /// 依次添加段生成器
    pub fn from_specs(
        start: Transform,
        specs: impl IntoIterator<Item = SegmentSpec>,
        params: CurveParams,
    ) -> Result<Self, LayoutError> {
        let mut curve = Self::with_params(start, params)?;
        for spec in specs {
            curve.add_spec(spec)?;
        }
        Ok(curve)
    }

    fn build(start: Transform, params: CurveParams) -> Self {
        Self {
            name: None,
            label: None,
            layer: None,
            end: start.clone(),
            start,
            s_start: params.s_start,
            s_end: params.s_start,
            specs: Vec::new(),
            segments: Vec::new(),
            lookup_ds: params.lookup_ds,
            lookup: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn start(&self) -> &Transform {
        &self.start
    }

    pub fn end(&self) -> &Transform {
        &self.end
    }

    pub fn s_start(&self) -> f64 {
        self.s_start
    }

    pub fn s_end(&self) -> f64 {
        self.s_end
    }

    pub fn length(&self) -> f64 {
        self.s_end - self.s_start
    }

    pub fn lookup_ds(&self) -> f64 {
        self.lookup_ds
    }

    /// 查找表格数
    pub fn lookup_len(&self) -> usize {
        self.lookup.len()
    }

    pub fn segments(&self) -> &[(f64, Segment)] {
        &self.segments
    }

    pub fn specs(&self) -> &[SegmentSpec] {
        &self.specs
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// 追加一段
    pub fn add_spec(&mut self, spec: impl Into<SegmentSpec>) -> Result<&mut Self, LayoutError> {
        let spec = spec.into();
        let output = spec.build(&self.end)?;
        if !(output.length.is_finite() && output.length >= 0.0) {
            return Err(LayoutError::InvalidArgument(format!(
                "segment length must be finite and non-negative: {spec}"
            )));
        }
        let steps = self.lookup_steps(output.length)?;
        tracing::debug!(
            "Curve segment #{} {} at s={}",
            self.segments.len(),
            spec,
            self.s_end
        );
        self.specs.push(spec);
        self.push_segment(output, steps);
        Ok(self)
    }

    /// 追加长度 `length` 的段时查找表需要新增的格数
    fn lookup_steps(&self, length: f64) -> Result<usize, LayoutError> {
        let covered = self.s_start + self.lookup.len() as f64 * self.lookup_ds;
        let remaining = self.s_end + length - covered;
        if remaining <= 0.0 {
            return Ok(0);
        }
        let steps = (remaining / self.lookup_ds).ceil();
        let total = self.lookup.len() as f64 + steps;
        if !(total <= MAX_LOOKUP_LEN as f64) {
            return Err(LayoutError::InvalidArgument(format!(
                "lookup table would need {total} buckets (limit {MAX_LOOKUP_LEN}), increase lookup_ds={}",
                self.lookup_ds
            )));
        }
        Ok(steps as usize)
    }

    fn push_segment(&mut self, output: SegmentOutput, steps: usize) {
        let SegmentOutput {
            segment,
            length,
            end,
        } = output;

        let seg_start = self.s_end;
        self.s_end += length;
        self.end = end;
        self.segments.push((seg_start, segment));
        let idx = self.segments.len() - 1;

        // 为新覆盖到的每个格起点记录本段
        self.lookup.extend(std::iter::repeat(idx).take(steps));
    }

    pub fn line_by(&mut self, length: f64) -> Result<&mut Self, LayoutError> {
        self.add_spec(LineBy::new(length))
    }

    pub fn line_by_along(&mut self, length: f64, axis: Axis) -> Result<&mut Self, LayoutError> {
        self.add_spec(LineBy::along(length, axis))
    }

    pub fn bend_by(&mut self, length: f64, angle: f64, roll: f64) -> Result<&mut Self, LayoutError> {
        self.add_spec(BendBy::new(length, angle, roll))
    }

    pub fn line_to(&mut self, end: Transform) -> Result<&mut Self, LayoutError> {
        self.add_spec(LineTo::new(end))
    }

    pub fn arc_to(&mut self, radius: f64, end: Transform) -> Result<&mut Self, LayoutError> {
        self.add_spec(ArcTo::new(radius, end))
    }

    fn check_domain(&self, s: f64) -> Result<(), LayoutError> {
        if s >= self.s_start && s <= self.s_end {
            Ok(())
        } else {
            Err(LayoutError::DomainRange {
                s,
                start: self.s_start,
                end: self.s_end,
            })
        }
    }

    /// 定位 `s` 所在段的索引（要求曲线非空且 `s` 在定义域内）
    fn segment_index(&self, s: f64) -> usize {
        let last = self.segments.len() - 1;
        let bucket = ((s - self.s_start) / self.lookup_ds).floor() as usize;
        let bucket = bucket.min(self.lookup.len().saturating_sub(1));
        let mut idx = self.lookup.get(bucket).copied().unwrap_or(0).min(last);

        while idx > 0 && self.segments[idx].0 > s {
            tracing::trace!("lookup bucket {} stepped back from segment {}", bucket, idx);
            idx -= 1;
        }
        while idx < last && self.segments[idx + 1].0 <= s {
            tracing::trace!("lookup bucket {} stepped forward from segment {}", bucket, idx);
            idx += 1;
        }
        idx
    }

    /// 弧长 `s` 处的位姿
    pub fn point(&self, s: f64) -> Result<Transform, LayoutError> {
        self.check_domain(s)?;
        if self.segments.is_empty() {
            return Ok(self.start.anonymous());
        }
        let (seg_start, segment) = &self.segments[self.segment_index(s)];
        Ok(segment.point(s - seg_start))
    }

    /// 弧长 `s` 处的单位切向
    pub fn tangent(&self, s: f64) -> Result<Vector3, LayoutError> {
        self.check_domain(s)?;
        if self.segments.is_empty() {
            return Ok(self.start.dz());
        }
        let (seg_start, segment) = &self.segments[self.segment_index(s)];
        Ok(segment.tangent(s - seg_start))
    }

    /// 各段各自等距采样后的拼接
    ///
    /// 采样只在段内均匀，整条曲线上并不等弧长：短段的采样更密，
    /// 段边界点会在相邻两段中各出现一次。
    pub fn points(&self, steps_per_segment: usize) -> Vec<Transform> {
        self.segments
            .iter()
            .flat_map(|(_, segment)| segment.points(steps_per_segment))
            .collect()
    }

    pub fn landmark(&self, key: &str) -> Option<Transform> {
        match key {
            "start" => Some(self.start.anonymous().named(key)),
            "end" => Some(self.end.anonymous().named(key)),
            _ => None,
        }
    }

    /// 以采样点折线表示曲线
    pub fn render(&self, style: &Style) -> Vec<Primitive> {
        let points: Vec<Point3> = self
            .points(style.curve_steps)
            .iter()
            .map(|pose| Point3::from(pose.loc()))
            .collect();
        let mut polyline = Polyline::new(points);
        polyline.name = self.name.clone();
        polyline.layer = self.layer.clone();
        vec![Element::Polyline(polyline).as_primitive()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::PrimitiveKind;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn mixed_curve(lookup_ds: f64) -> Curve {
        let params = CurveParams {
            s_start: 0.0,
            lookup_ds,
        };
        let mut curve = Curve::with_params(Transform::identity(), params).unwrap();
        curve
            .line_by(2.3)
            .unwrap()
            .bend_by(1.7, 45.0, 0.0)
            .unwrap()
            .line_by(0.4)
            .unwrap()
            .bend_by(3.1, -60.0, 30.0)
            .unwrap()
            .line_by(1.25)
            .unwrap();
        curve
    }

    #[test]
    fn test_line_then_quarter_bend() {
        let mut curve = Curve::new();
        curve.line_by(10.0).unwrap().bend_by(5.0, 90.0, 0.0).unwrap();

        let radius = 5.0 / FRAC_PI_2;
        assert_relative_eq!(curve.length(), 15.0);
        assert_relative_eq!(
            curve.end().loc(),
            Vector3::new(-radius, 0.0, 10.0 + radius),
            epsilon = 1e-12
        );
        assert_relative_eq!(curve.point(15.0).unwrap().matrix(), curve.end().matrix(), epsilon = 1e-12);
    }

    #[test]
    fn test_lookup_table_covers_domain() {
        let curve = mixed_curve(1.0);
        // 总长 8.75 → 9 格
        assert_eq!(curve.lookup_len(), 9);
        assert_eq!(curve.lookup, vec![0, 0, 0, 1, 2, 3, 3, 3, 4]);
    }

    #[test]
    fn test_segments_are_contiguous() {
        let curve = mixed_curve(0.5);
        for pair in curve.segments().windows(2) {
            let (start_a, a) = &pair[0];
            let (start_b, b) = &pair[1];
            assert_relative_eq!(a.end().loc(), b.start().loc(), epsilon = 1e-9);
            assert_relative_eq!(start_a + a.length(), *start_b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_boundary_returns_later_segment_start() {
        for ds in [1.0, 0.3, 0.7, 2.0] {
            let curve = mixed_curve(ds);
            for (seg_start, segment) in curve.segments().iter().skip(1) {
                let pose = curve.point(*seg_start).unwrap();
                assert_relative_eq!(pose.matrix(), segment.start().matrix(), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_point_matches_linear_scan() {
        let curve = mixed_curve(0.6);
        let scan = |s: f64| {
            let (seg_start, segment) = curve
                .segments()
                .iter()
                .rev()
                .find(|(seg_start, _)| *seg_start <= s)
                .unwrap();
            segment.point(s - seg_start)
        };
        for i in 0..=875 {
            let s = (i as f64 * 0.01).min(curve.s_end());
            assert_relative_eq!(
                curve.point(s).unwrap().matrix(),
                scan(s).matrix(),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_out_of_range() {
        let curve = mixed_curve(1.0);
        let err = curve.point(-0.1).unwrap_err();
        assert!(matches!(err, LayoutError::DomainRange { .. }));
        assert!(curve.point(curve.s_end() + 1e-6).is_err());
        assert!(curve.point(f64::NAN).is_err());
        assert!(curve.point(curve.s_end()).is_ok());
    }

    #[test]
    fn test_shifted_domain() {
        let params = CurveParams {
            s_start: 100.0,
            lookup_ds: 0.25,
        };
        let mut curve = Curve::with_params(Transform::identity(), params).unwrap();
        curve.line_by(1.0).unwrap();
        assert!(curve.point(99.0).is_err());
        assert_relative_eq!(curve.point(100.5).unwrap().z(), 0.5);
        assert_eq!(curve.lookup_len(), 4);
    }

    #[test]
    fn test_empty_curve() {
        let start = Transform::new(1.0, 2.0, 3.0);
        let curve = Curve::starting_at(start.clone());
        assert!(curve.is_empty());
        assert_relative_eq!(curve.point(0.0).unwrap().loc(), start.loc());
        assert!(curve.point(0.5).is_err());
        assert!(curve.points(5).is_empty());
    }

    #[test]
    fn test_zero_length_segments_are_skipped() {
        let mut curve = Curve::new();
        curve
            .line_by(1.0)
            .unwrap()
            .line_by(0.0)
            .unwrap()
            .bend_by(2.0, 90.0, 0.0)
            .unwrap();
        let pose = curve.point(1.0).unwrap();
        assert_relative_eq!(pose.matrix(), curve.segments()[2].1.start().matrix(), epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_params_and_lengths() {
        let params = CurveParams {
            s_start: 0.0,
            lookup_ds: 0.0,
        };
        assert!(Curve::with_params(Transform::identity(), params).is_err());

        let mut curve = Curve::new();
        assert!(matches!(
            curve.line_by(-1.0),
            Err(LayoutError::InvalidArgument(_))
        ));
        assert!(curve.is_empty());
        assert!(curve.specs().is_empty());
    }

    #[test]
    fn test_arc_to_leaves_curve_unchanged() {
        let mut curve = Curve::new();
        curve.line_by(1.0).unwrap();
        let err = curve.arc_to(1.0, Transform::new(1.0, 0.0, 2.0)).unwrap_err();
        assert!(matches!(err, LayoutError::Unsupported(_)));
        assert_eq!(curve.segments().len(), 1);
        assert_relative_eq!(curve.s_end(), 1.0);
    }

    #[test]
    fn test_oversized_lookup_table_is_rejected() {
        let params = CurveParams {
            s_start: 0.0,
            lookup_ds: 1e-300,
        };
        let mut curve = Curve::with_params(Transform::identity(), params).unwrap();
        let err = curve.line_by(1.0).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidArgument(_)));
        assert!(curve.is_empty());
        assert!(curve.specs().is_empty());
        assert_eq!(curve.lookup_len(), 0);
        assert_eq!(curve.s_end(), 0.0);

        // 较细的分辨率在上限内仍可用
        let params = CurveParams {
            s_start: 0.0,
            lookup_ds: 1e-3,
        };
        let mut curve = Curve::with_params(Transform::identity(), params).unwrap();
        curve.line_by(1.0).unwrap();
        assert_eq!(curve.lookup_len(), 1000);
    }

    #[test]
    fn test_line_to_continues_from_end() {
        let mut curve = Curve::new();
        curve.line_by(1.0).unwrap().line_to(Transform::new(3.0, 0.0, 1.0)).unwrap();
        assert_relative_eq!(curve.length(), 4.0);
        assert_relative_eq!(curve.point(2.0).unwrap().loc(), Vector3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn test_points_are_per_segment() {
        let curve = mixed_curve(1.0);
        let points = curve.points(4);
        assert_eq!(points.len(), 5 * 4);
        // 段边界点重复出现
        assert_relative_eq!(points[3].loc(), points[4].loc(), epsilon = 1e-9);
    }

    #[test]
    fn test_tangent_is_unit_and_continuous() {
        let curve = mixed_curve(1.0);
        for (seg_start, _) in curve.segments().iter().skip(1) {
            let before = curve.tangent(seg_start - 1e-9).unwrap();
            let at = curve.tangent(*seg_start).unwrap();
            assert_relative_eq!(at.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(before, at, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_from_specs_replays() {
        let curve = mixed_curve(1.0);
        let replayed = Curve::from_specs(
            Transform::identity(),
            curve.specs().to_vec(),
            CurveParams::default(),
        )
        .unwrap();
        assert_relative_eq!(replayed.end().matrix(), curve.end().matrix(), epsilon = 1e-12);
    }

    #[test]
    fn test_render_as_polyline() {
        let curve = mixed_curve(1.0).named("orbit");
        let primitives = curve.render(&Style::default());
        assert_eq!(primitives.len(), 1);
        assert_eq!(primitives[0].kind(), PrimitiveKind::Polyline);
        assert_eq!(primitives[0].name(), Some("orbit"));
    }

    #[test]
    fn test_landmarks() {
        let curve = mixed_curve(1.0);
        assert_relative_eq!(
            curve.landmark("end").unwrap().matrix(),
            curve.end().matrix()
        );
        assert!(curve.landmark("middle").is_none());
    }
}
