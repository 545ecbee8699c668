// crates/te_stats/src/agreement.rs

//! 模拟值与参考值的一致性度量
//!
//! RMSE / MAE / MAPE / Nash-Sutcliffe 效率 / R²，
//! 以及与 RUSLE 参考值的配对双侧 t 检验。
//!
//! t 检验的结论标签沿用既有约定：p ≥ 0.05 记为
//! "统计一致"，p < 0.05 记为 "统计差异"。

use crate::distributions::student_t_two_sided_p;
use serde::{Deserialize, Serialize};
use te_foundation::error::{TeError, TeResult};
use te_foundation::float::{RELATIVE_ERROR_FLOOR, SAFE_DIV_EPSILON};

/// 一致性度量
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AgreementMetrics {
    /// 均方根误差
    pub rmse: f64,
    /// 平均绝对误差
    pub mae: f64,
    /// 平均绝对百分比误差（%），分母有下限
    pub mape: f64,
    /// Nash-Sutcliffe 效率系数
    pub nse: f64,
    /// 决定系数 R²
    pub r_squared: f64,
    /// 有效样本对数
    pub n: usize,
}

/// 假设检验结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonVerdict {
    /// p ≥ 0.05
    StatisticallyConsistent,
    /// p < 0.05
    StatisticallyDifferent,
}

/// 与 RUSLE 参考值的对比结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RusleComparison {
    /// t 统计量
    pub t_statistic: f64,
    /// 双侧 p 值
    pub p_value: f64,
    /// 配对差值均值（模拟 − 参考）
    pub mean_difference: f64,
    /// 结论标签
    pub verdict: ComparisonVerdict,
    /// 有效样本对数
    pub n: usize,
}

/// 一致性度量
///
/// 逐位配对，任一侧非有限的对被剔除；剩余不足 2 对
/// 返回 `InsufficientData`。MAPE 分母有下限，观测值全为零时
/// 数值仍有界。观测方差退化时 NSE 与 R² 置 0。
pub fn compute_agreement_metrics(
    predicted: &[f64],
    observed: &[f64],
) -> TeResult<AgreementMetrics> {
    TeError::check_size("agreement pair", predicted.len(), observed.len())?;
    let pairs: Vec<(f64, f64)> = predicted
        .iter()
        .zip(observed)
        .filter(|(p, o)| p.is_finite() && o.is_finite())
        .map(|(&p, &o)| (p, o))
        .collect();
    let n = pairs.len();
    if n < 2 {
        return Err(TeError::insufficient_data("compute_agreement_metrics", 2, n));
    }
    let nf = n as f64;

    let mean_obs = pairs.iter().map(|(_, o)| o).sum::<f64>() / nf;
    let mean_pred = pairs.iter().map(|(p, _)| p).sum::<f64>() / nf;

    let mut ss_err = 0.0;
    let mut abs_sum = 0.0;
    let mut ape_sum = 0.0;
    let mut ss_obs = 0.0;
    let mut cov = 0.0;
    let mut var_pred = 0.0;
    for &(p, o) in &pairs {
        let err = p - o;
        ss_err += err * err;
        abs_sum += err.abs();
        ape_sum += err.abs() / o.abs().max(RELATIVE_ERROR_FLOOR);
        let d_o = o - mean_obs;
        let d_p = p - mean_pred;
        ss_obs += d_o * d_o;
        cov += d_p * d_o;
        var_pred += d_p * d_p;
    }

    let nse = if ss_obs < SAFE_DIV_EPSILON {
        0.0
    } else {
        1.0 - ss_err / ss_obs
    };
    let r_squared = if ss_obs < SAFE_DIV_EPSILON || var_pred < SAFE_DIV_EPSILON {
        0.0
    } else {
        let r = cov / (var_pred.sqrt() * ss_obs.sqrt());
        (r * r).min(1.0)
    };

    Ok(AgreementMetrics {
        rmse: (ss_err / nf).sqrt(),
        mae: abs_sum / nf,
        mape: ape_sum / nf * 100.0,
        nse,
        r_squared,
        n,
    })
}

/// 与 RUSLE 参考值的配对双侧 t 检验
///
/// 差值方差为零（两序列逐位恒等偏移或完全一致）时，
/// 取 p = 1，结论为统计一致。
pub fn compare_with_rusle(simulated: &[f64], rusle: &[f64]) -> TeResult<RusleComparison> {
    TeError::check_size("rusle comparison pair", simulated.len(), rusle.len())?;
    let diffs: Vec<f64> = simulated
        .iter()
        .zip(rusle)
        .filter(|(s, r)| s.is_finite() && r.is_finite())
        .map(|(&s, &r)| s - r)
        .collect();
    let n = diffs.len();
    if n < 2 {
        return Err(TeError::insufficient_data("compare_with_rusle", 2, n));
    }
    let nf = n as f64;

    let mean_diff = diffs.iter().sum::<f64>() / nf;
    let var = diffs.iter().map(|d| (d - mean_diff).powi(2)).sum::<f64>() / (nf - 1.0);

    let (t_statistic, p_value) = if var < SAFE_DIV_EPSILON {
        (0.0, 1.0)
    } else {
        let t = mean_diff / (var / nf).sqrt();
        (t, student_t_two_sided_p(t, nf - 1.0))
    };

    let verdict = if p_value >= 0.05 {
        ComparisonVerdict::StatisticallyConsistent
    } else {
        ComparisonVerdict::StatisticallyDifferent
    };

    Ok(RusleComparison {
        t_statistic,
        p_value,
        mean_difference: mean_diff,
        verdict,
        n,
    })
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_series() {
        let v = [1.0, 2.5, 3.0, 4.2, 5.8];
        let m = compute_agreement_metrics(&v, &v).unwrap();
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.mape, 0.0);
        assert!((m.nse - 1.0).abs() < 1e-12);
        assert!((m.r_squared - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_known_errors() {
        // 恒定偏差 +1: RMSE = MAE = 1
        let obs = [1.0, 2.0, 3.0, 4.0];
        let pred = [2.0, 3.0, 4.0, 5.0];
        let m = compute_agreement_metrics(&pred, &obs).unwrap();
        assert!((m.rmse - 1.0).abs() < 1e-12);
        assert!((m.mae - 1.0).abs() < 1e-12);
        // 平移不改变形状: R² = 1
        assert!((m.r_squared - 1.0).abs() < 1e-12);
        // NSE = 1 − 4/5
        assert!((m.nse - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_mape_floored_denominator() {
        // 观测含零，MAPE 仍有界
        let obs = [0.0, 2.0];
        let pred = [0.5, 2.0];
        let m = compute_agreement_metrics(&pred, &obs).unwrap();
        assert!(m.mape.is_finite());
    }

    #[test]
    fn test_degenerate_observed_variance() {
        let obs = [3.0, 3.0, 3.0];
        let pred = [2.0, 3.0, 4.0];
        let m = compute_agreement_metrics(&pred, &obs).unwrap();
        assert_eq!(m.nse, 0.0);
        assert_eq!(m.r_squared, 0.0);
    }

    #[test]
    fn test_insufficient_pairs() {
        assert!(compute_agreement_metrics(&[1.0], &[1.0]).is_err());
    }

    #[test]
    fn test_compare_identical_is_consistent() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        let c = compare_with_rusle(&v, &v).unwrap();
        assert_eq!(c.verdict, ComparisonVerdict::StatisticallyConsistent);
        assert_eq!(c.p_value, 1.0);
        assert_eq!(c.mean_difference, 0.0);
    }

    #[test]
    fn test_compare_large_offset_is_different() {
        // 系统性大偏差且差值带噪: p 应远小于 0.05
        let rusle = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let sim = [11.1, 11.9, 13.05, 14.0, 14.95, 16.1, 17.0, 17.9];
        let c = compare_with_rusle(&sim, &rusle).unwrap();
        assert_eq!(c.verdict, ComparisonVerdict::StatisticallyDifferent);
        assert!(c.p_value < 0.05);
        assert!(c.mean_difference > 9.0);
    }

    #[test]
    fn test_compare_constant_shift_zero_variance() {
        // 恒定偏移 → 差值方差为零 → 约定记为一致
        let rusle = [1.0, 2.0, 3.0, 4.0];
        let sim = [3.0, 4.0, 5.0, 6.0];
        let c = compare_with_rusle(&sim, &rusle).unwrap();
        assert_eq!(c.verdict, ComparisonVerdict::StatisticallyConsistent);
        assert_eq!(c.p_value, 1.0);
        assert!((c.mean_difference - 2.0).abs() < 1e-12);
    }
}
