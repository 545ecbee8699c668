// crates/te_stats/src/correlation.rs

//! Pearson 相关分析
//!
//! 成对过滤非有限样本后计算 Pearson r 与双侧 p 值
//! （t 变换，自由度 n−2），并给出定性强度与符号。
//!
//! 有效样本不足 2 对时返回带标签的错误结果（"指标不可用"），
//! 绝不 panic；零方差序列返回 r = 0 的中性结果。

use crate::distributions::student_t_two_sided_p;
use serde::{Deserialize, Serialize};
use te_foundation::error::{TeError, TeResult};
use te_foundation::float::SAFE_DIV_EPSILON;

/// 相关强度定性分档
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    /// |r| < 0.2
    VeryWeak,
    /// 0.2 ≤ |r| < 0.4
    Weak,
    /// 0.4 ≤ |r| < 0.6
    Moderate,
    /// 0.6 ≤ |r| < 0.8
    Strong,
    /// |r| ≥ 0.8
    VeryStrong,
}

impl CorrelationStrength {
    /// 由相关系数绝对值分档
    pub fn from_r(r: f64) -> Self {
        let a = r.abs();
        if a < 0.2 {
            Self::VeryWeak
        } else if a < 0.4 {
            Self::Weak
        } else if a < 0.6 {
            Self::Moderate
        } else if a < 0.8 {
            Self::Strong
        } else {
            Self::VeryStrong
        }
    }
}

/// 相关分析结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CorrelationResult {
    /// Pearson 相关系数
    pub r: f64,
    /// 双侧 p 值
    pub p_value: f64,
    /// 有效样本对数
    pub n: usize,
    /// 定性强度
    pub strength: CorrelationStrength,
    /// 是否正相关（r ≥ 0）
    pub positive: bool,
}

/// Pearson 相关
///
/// 两序列按位置配对，任一侧非有限的对被剔除；
/// 剩余不足 2 对返回 `InsufficientData`。
/// 任一侧零方差时返回 r = 0、p = 1 的中性结果。
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> TeResult<CorrelationResult> {
    TeError::check_size("correlation pair", x.len(), y.len())?;

    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .collect();
    let n = pairs.len();
    if n < 2 {
        return Err(TeError::insufficient_data("pearson_correlation", 2, n));
    }

    let nf = n as f64;
    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for &(a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    // 零方差：中性结果而非错误
    if var_x < SAFE_DIV_EPSILON || var_y < SAFE_DIV_EPSILON {
        return Ok(CorrelationResult {
            r: 0.0,
            p_value: 1.0,
            n,
            strength: CorrelationStrength::VeryWeak,
            positive: true,
        });
    }

    let r = (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0);

    // t 变换求 p 值；|r|≈1 时 t → ∞，p = 0
    let p_value = if n <= 2 {
        1.0
    } else {
        let denom = 1.0 - r * r;
        if denom < SAFE_DIV_EPSILON {
            0.0
        } else {
            let t = r * ((n - 2) as f64 / denom).sqrt();
            student_t_two_sided_p(t, (n - 2) as f64)
        }
    };

    Ok(CorrelationResult {
        r,
        p_value,
        n,
        strength: CorrelationStrength::from_r(r),
        positive: r >= 0.0,
    })
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_correlation() {
        // 自相关: r ≈ 1, p ≈ 0
        let x = [1.0, 2.5, 3.0, 4.7, 5.1, 8.0, 9.3];
        let res = pearson_correlation(&x, &x).unwrap();
        assert!((res.r - 1.0).abs() < 1e-12);
        assert!(res.p_value < 1e-10);
        assert_eq!(res.strength, CorrelationStrength::VeryStrong);
        assert!(res.positive);
    }

    #[test]
    fn test_perfect_negative() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [4.0, 3.0, 2.0, 1.0];
        let res = pearson_correlation(&x, &y).unwrap();
        assert!((res.r + 1.0).abs() < 1e-12);
        assert!(!res.positive);
    }

    #[test]
    fn test_known_value() {
        // 手算: x=[1,2,3], y=[1,2,4] → r = 0.98198...
        let res = pearson_correlation(&[1.0, 2.0, 3.0], &[1.0, 2.0, 4.0]).unwrap();
        assert!((res.r - 0.981_980_506_061_965_8).abs() < 1e-12);
    }

    #[test]
    fn test_insufficient_pairs() {
        assert!(pearson_correlation(&[1.0], &[2.0]).is_err());
        // NaN 剔除后不足 2 对
        let x = [1.0, f64::NAN, f64::NAN];
        let y = [2.0, 3.0, 4.0];
        assert!(pearson_correlation(&x, &y).is_err());
    }

    #[test]
    fn test_nan_pairs_filtered() {
        let x = [1.0, f64::NAN, 3.0, 4.0, 5.0];
        let y = [1.1, 2.0, 2.9, f64::NAN, 5.2];
        let res = pearson_correlation(&x, &y).unwrap();
        assert_eq!(res.n, 3);
        assert!(res.r > 0.99);
    }

    #[test]
    fn test_zero_variance_neutral() {
        let x = [3.0, 3.0, 3.0, 3.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        let res = pearson_correlation(&x, &y).unwrap();
        assert_eq!(res.r, 0.0);
        assert_eq!(res.p_value, 1.0);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(pearson_correlation(&[1.0, 2.0], &[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_strength_buckets() {
        assert_eq!(CorrelationStrength::from_r(0.1), CorrelationStrength::VeryWeak);
        assert_eq!(CorrelationStrength::from_r(-0.3), CorrelationStrength::Weak);
        assert_eq!(CorrelationStrength::from_r(0.5), CorrelationStrength::Moderate);
        assert_eq!(CorrelationStrength::from_r(-0.7), CorrelationStrength::Strong);
        assert_eq!(CorrelationStrength::from_r(0.8), CorrelationStrength::VeryStrong);
    }
}
