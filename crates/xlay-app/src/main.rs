//! XLAY 演示程序
//! 构建三个示例场景（演示曲线、二极铁链、矩形框架）并输出关键位姿

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use xlay_core::prelude::*;

/// 演示曲线：直线与各向圆弧交替
fn demo_curve() -> Result<()> {
    let mut curve = Curve::new().named("demo");
    curve
        .line_by(10.0)?
        .bend_by(5.0, 45.0, 0.0)?
        .line_by(10.0)?
        .bend_by(5.0, -45.0, 0.0)?
        .line_by(10.0)?
        .bend_by(5.0, 90.0, 0.0)?
        .line_by(10.0)?
        .bend_by(5.0, 90.0, 0.0)?
        .line_by(30.0)?
        .bend_by(5.0, 30.0, 0.0)?
        .line_by(5.0)?
        .bend_by(5.0, 60.0, 0.0)?
        .line_by(16.0)?
        .bend_by(5.0, 90.0, 0.0)?
        .line_by(2.0)?;

    info!(
        "Curve {}: {} segments, length {:.3}, end {}",
        curve.name.as_deref().unwrap_or_default(),
        curve.segments().len(),
        curve.length(),
        curve.end()
    );
    let points = curve.points(5);
    info!("Sampled {} points", points.len());
    Ok(())
}

/// 二极铁链：6 块二极铁等间距排布后重放为曲线
fn dipole_chain() -> Result<()> {
    let angle = (1.5e-3 / 2.0 / std::f64::consts::PI) * 360.0;
    let (length, drift) = (3.4, 0.866);

    let mb = Arc::new(Element::from(Assembly::bend("MB", length, angle)));
    let nodes = (0..6).map(|i| {
        Node::new(format!("MB.{}", i + 1), Arc::clone(&mb))
            .anchored_at(4.0 + i as f64 * (length + drift))
    });
    let beamline = Beamline::with_nodes("D1", nodes)?;

    for record in beamline.segments()? {
        info!(
            "Segment at s={:.3}: length {:.3}, angle {:.6}",
            record.start, record.length, record.angle
        );
    }

    let curve = beamline.to_curve(Transform::identity(), CurveParams::default())?;
    for node in beamline.nodes() {
        let start = beamline.placement(&curve, &node.name)?;
        info!("{}", start);
    }
    info!("Chain end {}", curve.end());
    Ok(())
}

/// 矩形框架：四个旋转 45° 的方块
fn rectangle_frame() -> Result<()> {
    let r = Arc::new(Element::from(Rectangle::new(1.0, 1.0).named("R1")));
    let frame = Frame::with_parts(
        "F",
        [
            Transform::placing(&r, "a").tx(1.0).rz(45.0),
            Transform::placing(&r, "b").tx(-1.0).rz(45.0),
            Transform::placing(&r, "c").ty(1.0).rz(45.0),
            Transform::placing(&r, "d").ty(-1.0).rz(45.0),
        ],
    )?;

    if let Some(left) = r.landmark("left") {
        info!("R1 left in its own frame: {}", left);
    }
    info!("a/left in frame F: {}", frame.resolve("a/left")?);

    let primitives = frame.render(&Style::default());
    info!("Frame {} renders {} primitives", frame.name, primitives.len());
    Ok(())
}

fn main() -> Result<()> {
    // 初始化日志
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(Level::INFO).finish(),
    )?;

    info!("Starting XLAY demo...");

    demo_curve()?;
    dipole_chain()?;
    rectangle_frame()?;

    Ok(())
}
