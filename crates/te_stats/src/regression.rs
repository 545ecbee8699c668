// crates/te_stats/src/regression.rs

//! 多元线性回归（普通最小二乘）
//!
//! 特征先标准化（均值 0、方差 1，σ 下限防零除），
//! 法方程经带部分主元的高斯消元求解。
//! 样本数必须严格大于特征数，否则返回 `InsufficientData`；
//! 矩阵奇异时记录警告并返回 `SingularMatrix`。

use serde::{Deserialize, Serialize};
use te_foundation::error::{TeError, TeResult};
use te_foundation::float::SAFE_DIV_EPSILON;

/// 残差样本上限，防止大网格下报告体积失控
const MAX_RESIDUAL_SAMPLE: usize = 100;

/// 回归结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionResult {
    /// 截距（标准化特征空间下）
    pub intercept: f64,
    /// 标准化回归系数，可直接比较相对重要性
    pub coefficients: Vec<f64>,
    /// 决定系数 R²
    pub r_squared: f64,
    /// 均方根误差
    pub rmse: f64,
    /// 平均绝对误差
    pub mae: f64,
    /// 残差样本（最多 MAX_RESIDUAL_SAMPLE 个）
    pub residual_sample: Vec<f64>,
    /// 样本数
    pub n_samples: usize,
    /// 特征数
    pub n_features: usize,
}

/// 普通最小二乘回归
///
/// `x` 为按行排列的样本，每行一个特征向量；`y` 为响应值。
/// 所有行必须与首行等长。
pub fn linear_regression(x: &[Vec<f64>], y: &[f64]) -> TeResult<RegressionResult> {
    let n = x.len();
    TeError::check_size("regression response", n, y.len())?;
    if n == 0 {
        return Err(TeError::insufficient_data("linear_regression", 2, 0));
    }
    let p = x[0].len();
    if p == 0 {
        return Err(TeError::invalid_input("回归特征数为零"));
    }
    for (i, row) in x.iter().enumerate() {
        if row.len() != p {
            return Err(TeError::invalid_input(format!(
                "回归设计矩阵第 {} 行长度 {} 与首行 {} 不一致",
                i,
                row.len(),
                p
            )));
        }
    }
    if n <= p {
        return Err(TeError::insufficient_data("linear_regression", p + 1, n));
    }

    // 特征标准化，σ 下限防零除
    let nf = n as f64;
    let mut means = vec![0.0; p];
    let mut stds = vec![0.0; p];
    for j in 0..p {
        let mean = x.iter().map(|row| row[j]).sum::<f64>() / nf;
        let var = x.iter().map(|row| (row[j] - mean).powi(2)).sum::<f64>() / (nf - 1.0);
        means[j] = mean;
        stds[j] = var.sqrt().max(SAFE_DIV_EPSILON);
    }
    let z: Vec<Vec<f64>> = x
        .iter()
        .map(|row| {
            (0..p)
                .map(|j| (row[j] - means[j]) / stds[j])
                .collect::<Vec<f64>>()
        })
        .collect();

    // 法方程 (Xᵀ X) β = Xᵀ y，含截距列
    let dim = p + 1;
    let mut ata = vec![vec![0.0; dim]; dim];
    let mut aty = vec![0.0; dim];
    for (i, row) in z.iter().enumerate() {
        // 增广行: [1, z_1, ..., z_p]
        let mut aug = Vec::with_capacity(dim);
        aug.push(1.0);
        aug.extend_from_slice(row);
        for a in 0..dim {
            for b in 0..dim {
                ata[a][b] += aug[a] * aug[b];
            }
            aty[a] += aug[a] * y[i];
        }
    }

    let beta = solve_gaussian(&mut ata, &mut aty)?;
    let intercept = beta[0];
    let coefficients = beta[1..].to_vec();

    // 拟合指标
    let mean_y = y.iter().sum::<f64>() / nf;
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    let mut abs_sum = 0.0;
    let mut residual_sample = Vec::with_capacity(n.min(MAX_RESIDUAL_SAMPLE));
    for (i, row) in z.iter().enumerate() {
        let pred = intercept
            + row
                .iter()
                .zip(&coefficients)
                .map(|(zi, c)| zi * c)
                .sum::<f64>();
        let resid = y[i] - pred;
        ss_res += resid * resid;
        ss_tot += (y[i] - mean_y).powi(2);
        abs_sum += resid.abs();
        if residual_sample.len() < MAX_RESIDUAL_SAMPLE {
            residual_sample.push(resid);
        }
    }
    let r_squared = if ss_tot < SAFE_DIV_EPSILON {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    };

    Ok(RegressionResult {
        intercept,
        coefficients,
        r_squared,
        rmse: (ss_res / nf).sqrt(),
        mae: abs_sum / nf,
        residual_sample,
        n_samples: n,
        n_features: p,
    })
}

/// 带部分主元的高斯消元，原地求解 `a·x = b`
fn solve_gaussian(a: &mut [Vec<f64>], b: &mut [f64]) -> TeResult<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        // 选主元
        let mut pivot = col;
        let mut max_abs = a[col][col].abs();
        for row in (col + 1)..n {
            if a[row][col].abs() > max_abs {
                max_abs = a[row][col].abs();
                pivot = row;
            }
        }
        if max_abs < SAFE_DIV_EPSILON {
            log::warn!("法方程第 {} 列主元接近零，设计矩阵奇异", col);
            return Err(TeError::singular_matrix("linear_regression normal equations"));
        }
        if pivot != col {
            a.swap(col, pivot);
            b.swap(col, pivot);
        }
        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    // 回代
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for k in (row + 1)..n {
            sum -= a[row][k] * x[k];
        }
        x[row] = sum / a[row][row];
    }
    Ok(x)
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_linear_fit() {
        // y = 2·x + 1（单特征），标准化后仍应完美拟合
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 2.0 * i as f64 + 1.0).collect();
        let res = linear_regression(&x, &y).unwrap();
        assert!((res.r_squared - 1.0).abs() < 1e-10);
        assert!(res.rmse < 1e-8);
        assert!(res.mae < 1e-8);
        // 标准化空间下截距即响应均值
        assert!((res.intercept - 10.0).abs() < 1e-8);
        assert!(res.coefficients[0] > 0.0);
    }

    #[test]
    fn test_two_features() {
        // y = 3·a − 2·b + 5
        let x: Vec<Vec<f64>> = vec![
            vec![1.0, 2.0],
            vec![2.0, 1.0],
            vec![3.0, 5.0],
            vec![4.0, 3.0],
            vec![5.0, 8.0],
            vec![6.0, 2.0],
        ];
        let y: Vec<f64> = x.iter().map(|r| 3.0 * r[0] - 2.0 * r[1] + 5.0).collect();
        let res = linear_regression(&x, &y).unwrap();
        assert!((res.r_squared - 1.0).abs() < 1e-8);
        assert!(res.coefficients[0] > 0.0);
        assert!(res.coefficients[1] < 0.0);
    }

    #[test]
    fn test_insufficient_samples() {
        // n ≤ p 必须拒绝
        let x = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let y = vec![1.0, 2.0];
        assert!(linear_regression(&x, &y).is_err());
    }

    #[test]
    fn test_constant_feature_singular() {
        // 两个完全共线（常数）特征: 标准化后 σ 下限兜底，
        // 但两列相同仍导致奇异
        let x: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64, i as f64]).collect();
        let y: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let res = linear_regression(&x, &y);
        assert!(matches!(res, Err(TeError::SingularMatrix { .. })));
    }

    #[test]
    fn test_residual_sample_capped() {
        let n = 250;
        let x: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..n).map(|i| i as f64 * 0.5 + ((i % 7) as f64)).collect();
        let res = linear_regression(&x, &y).unwrap();
        assert_eq!(res.residual_sample.len(), MAX_RESIDUAL_SAMPLE);
        assert_eq!(res.n_samples, n);
    }

    #[test]
    fn test_row_length_mismatch() {
        let x = vec![vec![1.0, 2.0], vec![3.0], vec![4.0, 5.0]];
        let y = vec![1.0, 2.0, 3.0];
        assert!(linear_regression(&x, &y).is_err());
    }
}
