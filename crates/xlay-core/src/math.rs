//! 数学基础类型
//!
//! 基于 nalgebra 的三维类型别名，以及构造基本齐次变换的辅助函数。
//! 所有角度参数在公共接口上使用度，内部换算为弧度。

pub type Matrix4 = nalgebra::Matrix4<f64>;
pub type Matrix3 = nalgebra::Matrix3<f64>;
pub type Vector3 = nalgebra::Vector3<f64>;
pub type Point3 = nalgebra::Point3<f64>;

/// 通用浮点比较容差
pub const EPSILON: f64 = 1e-10;

/// 刚性检查（正交性、行列式）的默认容差
pub const RIGID_TOLERANCE: f64 = 1e-9;

/// 平移矩阵
pub fn translation(x: f64, y: f64, z: f64) -> Matrix4 {
    Matrix4::new_translation(&Vector3::new(x, y, z))
}

/// 绕 x 轴旋转（弧度）
pub fn rotation_x(angle: f64) -> Matrix3 {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, c, -s, //
        0.0, s, c,
    )
}

/// 绕 y 轴旋转（弧度）
pub fn rotation_y(angle: f64) -> Matrix3 {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, 0.0, s, //
        0.0, 1.0, 0.0, //
        -s, 0.0, c,
    )
}

/// 绕 z 轴旋转（弧度）
pub fn rotation_z(angle: f64) -> Matrix3 {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, -s, 0.0, //
        s, c, 0.0, //
        0.0, 0.0, 1.0,
    )
}

/// 由旋转与平移组装齐次矩阵
pub fn homogeneous(rot: &Matrix3, loc: &Vector3) -> Matrix4 {
    let mut matrix = rot.to_homogeneous();
    matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(loc);
    matrix
}

/// 在 `[start, end]` 上均匀取 `steps` 个值（含两端）
///
/// `steps == 1` 时只返回 `start`，`steps == 0` 时为空。
pub fn linspace(start: f64, end: f64, steps: usize) -> impl Iterator<Item = f64> {
    let span = end - start;
    let last = steps.saturating_sub(1).max(1) as f64;
    (0..steps).map(move |i| {
        if i + 1 == steps && steps > 1 {
            end
        } else {
            start + span * i as f64 / last
        }
    })
}

/// 检查矩阵是否为刚体变换
///
/// 要求最后一行为 `[0, 0, 0, 1]`，旋转部分满足 `RᵗR ≈ I` 且 `det(R) ≈ 1`。
pub fn is_rigid(matrix: &Matrix4, tolerance: f64) -> bool {
    let bottom = matrix.fixed_view::<1, 4>(3, 0);
    let expected = [0.0, 0.0, 0.0, 1.0];
    if bottom
        .iter()
        .zip(expected.iter())
        .any(|(a, b)| (a - b).abs() > tolerance)
    {
        return false;
    }

    let rot: Matrix3 = matrix.fixed_view::<3, 3>(0, 0).into_owned();
    let gram = rot.transpose() * rot;
    if (gram - Matrix3::identity()).amax() > tolerance {
        return false;
    }
    (rot.determinant() - 1.0).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rotation_z_quarter_turn() {
        let rot = rotation_z(std::f64::consts::FRAC_PI_2);
        let v = rot * Vector3::x();
        assert_relative_eq!(v, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_homogeneous_layout() {
        let m = homogeneous(&rotation_y(0.3), &Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(m[(0, 3)], 1.0);
        assert_eq!(m[(1, 3)], 2.0);
        assert_eq!(m[(2, 3)], 3.0);
        assert_eq!(m[(3, 3)], 1.0);
        assert!(is_rigid(&m, RIGID_TOLERANCE));
    }

    #[test]
    fn test_linspace_includes_both_ends() {
        let values: Vec<f64> = linspace(0.0, 2.0, 5).collect();
        assert_eq!(values, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(linspace(1.0, 3.0, 1).collect::<Vec<_>>(), vec![1.0]);
        assert_eq!(linspace(1.0, 3.0, 0).count(), 0);
    }

    #[test]
    fn test_is_rigid_rejects_scale_and_shear() {
        let mut scaled = Matrix4::identity();
        scaled[(0, 0)] = 2.0;
        assert!(!is_rigid(&scaled, RIGID_TOLERANCE));

        let mut projective = Matrix4::identity();
        projective[(3, 0)] = 0.5;
        assert!(!is_rigid(&projective, RIGID_TOLERANCE));

        // 镜像：正交但行列式为 -1
        let mut mirror = Matrix4::identity();
        mirror[(2, 2)] = -1.0;
        assert!(!is_rigid(&mirror, RIGID_TOLERANCE));
    }
}
