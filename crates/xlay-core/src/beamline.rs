//! 束线排布
//!
//! 束线是具名节点的集合。每个节点把一个元素（通常是组件）放到参考轨道上：
//! `at` 给出绝对起始弧长，`from` 给出相对锚点（另一节点的起点 + `at`）。
//!
//! 排布分三步：
//! 1. 不动点迭代求出每个节点的绝对起点，未知引用、无锚点和循环引用均报错；
//! 2. 按起点稳定排序（起点相同的节点保持插入顺序）；
//! 3. 从左到右扫描：与上一段重叠的节点必须偏转角、滚转角一致，此时合并到上一段
//!    （终点更远则延长），否则为冲突；不重叠的节点新开一段。
//!
//! 得到的段记录与曲线段生成器使用同一套 (长度, 角度, 滚转) 词汇，
//! 可以用 [`Beamline::to_curve`] 重放为曲线。

use crate::curve::{Curve, CurveParams};
use crate::element::Element;
use crate::error::LayoutError;
use crate::math::EPSILON;
use crate::pose::{LocalOp, Transform};
use crate::segment::{BendBy, LineBy, SegmentSpec};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 放置请求
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    element: Arc<Element>,

    /// 绝对起点；与 `from` 同时给出时为相对偏移
    pub at: Option<f64>,

    /// 相对锚点节点
    pub from: Option<String>,

    pub ref_length: f64,
    pub ref_angle: f64,
    pub ref_roll: f64,

    /// 放置后依次施加的局部调整
    pub adjustments: Vec<LocalOp>,
}

impl Node {
    /// 参考长度、角度、滚转默认取自组件的 `length`、`angle`、`tilt`，其他元素为 0
    pub fn new(name: impl Into<String>, element: Arc<Element>) -> Self {
        let (ref_length, ref_angle, ref_roll) = element
            .as_assembly()
            .map_or((0.0, 0.0, 0.0), |a| (a.length, a.angle, a.tilt));
        Self {
            name: name.into(),
            element,
            at: None,
            from: None,
            ref_length,
            ref_angle,
            ref_roll,
            adjustments: Vec::new(),
        }
    }

    pub fn anchored_at(mut self, at: f64) -> Self {
        self.at = Some(at);
        self
    }

    /// 相对 `from` 节点起点偏移 `offset`
    pub fn relative_to(mut self, from: impl Into<String>, offset: f64) -> Self {
        self.from = Some(from.into());
        self.at = Some(offset);
        self
    }

    pub fn with_ref_length(mut self, length: f64) -> Self {
        self.ref_length = length;
        self
    }

    pub fn with_ref_angle(mut self, angle: f64) -> Self {
        self.ref_angle = angle;
        self
    }

    pub fn with_ref_roll(mut self, roll: f64) -> Self {
        self.ref_roll = roll;
        self
    }

    pub fn with_adjustment(mut self, op: LocalOp) -> Self {
        self.adjustments.push(op);
        self
    }

    pub fn element(&self) -> &Arc<Element> {
        &self.element
    }

    fn unresolved(&self, reason: impl Into<String>) -> LayoutError {
        let reason = reason.into();
        tracing::warn!("Node {} cannot be anchored: {}", self.name, reason);
        LayoutError::UnresolvedAnchor {
            node: self.name.clone(),
            reason,
        }
    }
}

/// 排布结果中的一段
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub length: f64,
    pub angle: f64,
    pub roll: f64,

    /// 绝对起始弧长
    pub start: f64,
}

impl SegmentRecord {
    pub fn end(&self) -> f64 {
        self.start + self.length
    }

    fn agrees_with(&self, node: &Node) -> bool {
        (self.angle - node.ref_angle).abs() <= EPSILON
            && (self.roll - node.ref_roll).abs() <= EPSILON
    }

    /// 对应的段生成器：零角度为直线，否则为圆弧
    pub fn spec(&self) -> SegmentSpec {
        if self.angle.abs() < EPSILON {
            LineBy::new(self.length).into()
        } else {
            BendBy::new(self.length, self.angle, self.roll).into()
        }
    }
}

/// 束线
#[derive(Debug, Clone)]
pub struct Beamline {
    pub name: String,
    nodes: IndexMap<String, Node>,
}

impl Beamline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
        }
    }

    pub fn with_nodes(
        name: impl Into<String>,
        nodes: impl IntoIterator<Item = Node>,
    ) -> Result<Self, LayoutError> {
        let mut beamline = Self::new(name);
        for node in nodes {
            beamline.add_node(node)?;
        }
        Ok(beamline)
    }

    pub fn add_node(&mut self, node: Node) -> Result<&mut Self, LayoutError> {
        if self.nodes.contains_key(&node.name) {
            return Err(LayoutError::DuplicateName {
                name: node.name,
                container: self.name.clone(),
            });
        }
        tracing::debug!("Beamline {}: added node {}", self.name, node.name);
        self.nodes.insert(node.name.clone(), node);
        Ok(self)
    }

    pub fn node(&self, name: &str) -> Result<&Node, LayoutError> {
        self.nodes.get(name).ok_or_else(|| LayoutError::PathNotFound {
            segment: name.to_string(),
            container: self.name.clone(),
            path: String::new(),
        })
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 求出所有节点的绝对起点（按节点插入顺序）
    pub fn resolve_starts(&self) -> Result<IndexMap<String, f64>, LayoutError> {
        for node in self.nodes.values() {
            if !(node.ref_length.is_finite() && node.ref_length >= 0.0) {
                tracing::warn!("Node {} has reference length {}", node.name, node.ref_length);
                return Err(LayoutError::InvalidArgument(format!(
                    "node `{}` must have a finite, non-negative reference length, got {}",
                    node.name, node.ref_length
                )));
            }
            match (&node.from, node.at) {
                (None, None) => return Err(node.unresolved("neither `at` nor `from` is set")),
                (Some(from), _) if !self.nodes.contains_key(from) => {
                    return Err(node.unresolved(format!("`from` refers to unknown node `{from}`")))
                }
                (_, Some(at)) if !at.is_finite() => {
                    return Err(node.unresolved(format!("offset {at} is not finite")))
                }
                _ => {}
            }
        }

        let mut resolved: IndexMap<&str, f64> = IndexMap::with_capacity(self.nodes.len());
        let mut pending: Vec<&Node> = self.nodes.values().collect();
        let mut pass = 0;
        while !pending.is_empty() {
            pass += 1;
            let before = pending.len();
            pending.retain(|node| {
                let node = *node;
                let offset = node.at.unwrap_or(0.0);
                let start = match &node.from {
                    None => offset,
                    Some(from) => match resolved.get(from.as_str()) {
                        Some(base) => base + offset,
                        None => return true,
                    },
                };
                resolved.insert(node.name.as_str(), start);
                false
            });
            tracing::debug!(
                "Beamline {} anchor pass {}: {} resolved, {} pending",
                self.name,
                pass,
                before - pending.len(),
                pending.len()
            );
            if pending.len() == before {
                let names: Vec<&str> = pending.iter().map(|node| node.name.as_str()).collect();
                return Err(pending[0].unresolved(format!(
                    "cyclic `from` references among {}",
                    names.join(", ")
                )));
            }
        }

        Ok(self
            .nodes
            .keys()
            .filter_map(|name| {
                resolved
                    .get(name.as_str())
                    .map(|start| (name.clone(), *start))
            })
            .collect())
    }

    /// 按绝对起点稳定排序的节点
    pub fn sorted_nodes(&self) -> Result<Vec<(&Node, f64)>, LayoutError> {
        let starts = self.resolve_starts()?;
        let mut sorted: Vec<(&Node, f64)> = self
            .nodes
            .values()
            .filter_map(|node| starts.get(&node.name).map(|start| (node, *start)))
            .collect();
        sorted.sort_by(|a, b| a.1.total_cmp(&b.1));
        Ok(sorted)
    }

    /// 扫描排序后的节点，合并重叠，生成段记录
    pub fn segments(&self) -> Result<Vec<SegmentRecord>, LayoutError> {
        let mut records: Vec<SegmentRecord> = Vec::new();
        let mut previous: Option<&Node> = None;
        let mut cur_s = f64::NEG_INFINITY;

        for (node, start) in self.sorted_nodes()? {
            let end = start + node.ref_length;
            // 首尾相接（差在舍入误差内）不算重叠
            let overlaps = start < cur_s - EPSILON;

            if overlaps {
                if let Some(last) = records.last_mut() {
                    let previous_name = previous.map(|p| p.name.clone()).unwrap_or_default();
                    if !last.agrees_with(node) {
                        tracing::warn!(
                            "Node {} at s={} overlaps {} with different angle or roll",
                            node.name,
                            start,
                            previous_name
                        );
                        return Err(LayoutError::OverlapConflict {
                            previous: previous_name,
                            node: node.name.clone(),
                        });
                    }
                    if end > cur_s {
                        last.length = end - last.start;
                        cur_s = end;
                    }
                    tracing::debug!("Node {} merged into segment at s={}", node.name, last.start);
                }
            } else {
                records.push(SegmentRecord {
                    length: node.ref_length,
                    angle: node.ref_angle,
                    roll: node.ref_roll,
                    start,
                });
                cur_s = end;
                tracing::debug!("Node {} opens segment #{} at s={}", node.name, records.len() - 1, start);
            }
            previous = Some(node);
        }

        Ok(records)
    }

    /// 把段记录重放为曲线：段间空隙补直线
    ///
    /// 曲线弧长即束线的绝对弧长，因此第一段不能早于 `params.s_start`。
    pub fn to_curve(&self, start: Transform, params: CurveParams) -> Result<Curve, LayoutError> {
        let records = self.segments()?;
        let mut curve = Curve::with_params(start, params)?;
        for record in &records {
            let gap = record.start - curve.s_end();
            if gap < -EPSILON {
                return Err(LayoutError::InvalidArgument(format!(
                    "segment at s={} starts before the curve end s={}",
                    record.start,
                    curve.s_end()
                )));
            }
            if gap > EPSILON {
                curve.line_by(gap)?;
            }
            curve.add_spec(record.spec())?;
        }
        tracing::info!(
            "Beamline {}: {} nodes, {} segments, length {}",
            self.name,
            self.nodes.len(),
            records.len(),
            curve.length()
        );
        Ok(curve.named(self.name.clone()))
    }

    /// 节点在曲线上的位姿：绝对起点处的曲线位姿，再施加局部调整
    ///
    /// `path` 的首段为节点名，其余部分经由节点元素的定位点解析。
    pub fn placement(&self, curve: &Curve, path: &str) -> Result<Transform, LayoutError> {
        let (head, rest) = match path.split_once('/') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let node = self.node(head)?;
        let starts = self.resolve_starts()?;
        let start = starts
            .get(head)
            .copied()
            .ok_or_else(|| node.unresolved("start was not resolved"))?;

        let mut pose = curve.point(start)?;
        for op in &node.adjustments {
            pose.apply_mut(*op);
        }
        let pose = pose
            .named(node.name.clone())
            .with_element(Arc::clone(&node.element));

        match rest {
            Some(rest) => pose.resolve(rest),
            None => Ok(pose),
        }
    }
}
