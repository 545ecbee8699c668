// crates/te_foundation/src/float.rs

//! 数值常量与安全浮点运算
//!
//! 提供数值计算相关的常量、安全除法/开方，以及序列统计辅助函数。
//!
//! # 示例
//!
//! ```
//! use te_foundation::float::{safe_div, mean};
//!
//! assert_eq!(safe_div(1.0, 0.0, f64::MAX), f64::MAX);
//! assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
//! ```

// ============================================================================
// 数值常量
// ============================================================================

/// 浮点数相等性比较的默认容差
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// 安全除法的最小分母阈值
pub const SAFE_DIV_EPSILON: f64 = 1e-14;

/// MAPE 等相对误差指标的分母下限
pub const RELATIVE_ERROR_FLOOR: f64 = 1e-10;

// ============================================================================
// 安全运算
// ============================================================================

/// 安全除法
///
/// 分母绝对值小于 [`SAFE_DIV_EPSILON`] 时返回 `fallback`。
#[inline]
pub fn safe_div(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator.abs() < SAFE_DIV_EPSILON {
        fallback
    } else {
        numerator / denominator
    }
}

/// 安全开方
///
/// 负输入返回 0。
#[inline]
pub fn safe_sqrt(value: f64) -> f64 {
    if value <= 0.0 {
        0.0
    } else {
        value.sqrt()
    }
}

/// 浮点近似相等比较
#[inline]
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() <= epsilon
}

// ============================================================================
// 序列统计
// ============================================================================

/// 算术均值，空序列返回 0
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// 样本方差（n-1 分母），少于 2 个样本返回 0
pub fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / (n - 1) as f64
}

/// 样本标准差
#[inline]
pub fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// 线性插值百分位数
///
/// `p` 取值 [0, 100]；输入须已升序排列。空序列返回 0。
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let p = p.clamp(0.0, 100.0);
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div(6.0, 2.0, 0.0), 3.0);
        assert_eq!(safe_div(1.0, 0.0, -1.0), -1.0);
        assert_eq!(safe_div(1.0, 1e-20, 7.0), 7.0);
    }

    #[test]
    fn test_safe_sqrt() {
        assert_eq!(safe_sqrt(4.0), 2.0);
        assert_eq!(safe_sqrt(-1.0), 0.0);
        assert_eq!(safe_sqrt(0.0), 0.0);
    }

    #[test]
    fn test_mean_and_variance() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(approx_eq(mean(&v), 5.0, 1e-12));
        // 样本方差 = 32/7
        assert!(approx_eq(sample_variance(&v), 32.0 / 7.0, 1e-12));
    }

    #[test]
    fn test_variance_degenerate() {
        assert_eq!(sample_variance(&[]), 0.0);
        assert_eq!(sample_variance(&[1.0]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_percentile_sorted() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_sorted(&v, 0.0), 1.0);
        assert_eq!(percentile_sorted(&v, 50.0), 3.0);
        assert_eq!(percentile_sorted(&v, 100.0), 5.0);
        // 线性插值
        assert!(approx_eq(percentile_sorted(&v, 25.0), 2.0, 1e-12));
        assert!(approx_eq(percentile_sorted(&v, 90.0), 4.6, 1e-12));
    }

    #[test]
    fn test_percentile_single() {
        assert_eq!(percentile_sorted(&[42.0], 95.0), 42.0);
        assert_eq!(percentile_sorted(&[], 50.0), 0.0);
    }
}
