// crates/te_stats/src/normality.rs

//! 对数变换正态性分析
//!
//! 对严格为正的样本做变换前后 Shapiro-Wilk 检验，
//! 变换后 p 值改善则建议采用对数变换。
//! 侵蚀量分布常呈右偏，这里为验证报告提供变换依据。

use crate::distributions::{shapiro_wilk, ShapiroWilk};
use serde::{Deserialize, Serialize};
use te_foundation::error::{TeError, TeResult};

/// 对数变换分析结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogTransformAnalysis {
    /// 原始数据的 Shapiro-Wilk 检验
    pub before: ShapiroWilk,
    /// ln 变换后的检验
    pub after: ShapiroWilk,
    /// 是否建议采用对数变换
    pub recommended: bool,
    /// 参与分析的正值样本数
    pub n_positive: usize,
    /// 被剔除的非正或非有限样本数
    pub n_dropped: usize,
}

/// 对数变换正态性分析
///
/// 非正与非有限样本被剔除；剩余不足 3 个返回 `InsufficientData`。
pub fn log_transform_analysis(values: &[f64]) -> TeResult<LogTransformAnalysis> {
    let positive: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();
    let n_positive = positive.len();
    let n_dropped = values.len() - n_positive;
    if n_positive < 3 {
        return Err(TeError::insufficient_data(
            "log_transform_analysis",
            3,
            n_positive,
        ));
    }
    if n_dropped > 0 {
        log::debug!("对数变换分析剔除 {} 个非正/非有限样本", n_dropped);
    }

    let before = shapiro_wilk(&positive)?;
    let logged: Vec<f64> = positive.iter().map(|v| v.ln()).collect();
    let after = shapiro_wilk(&logged)?;

    Ok(LogTransformAnalysis {
        recommended: after.p_value > before.p_value,
        before,
        after,
        n_positive,
        n_dropped,
    })
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lognormal_data_recommends_transform() {
        // e^z 的样本强烈右偏，对数变换后回到近正态
        let z: [f64; 15] = [
            -1.8, -1.3, -0.9, -0.6, -0.4, -0.2, 0.0, 0.2, 0.4, 0.6, 0.9, 1.3, 1.8, 2.4, 3.1,
        ];
        let values: Vec<f64> = z.iter().map(|v| v.exp()).collect();
        let res = log_transform_analysis(&values).unwrap();
        assert!(res.after.p_value > res.before.p_value);
        assert!(res.recommended);
        assert_eq!(res.n_positive, values.len());
        assert_eq!(res.n_dropped, 0);
    }

    #[test]
    fn test_drops_nonpositive() {
        let values = [0.0, -1.0, f64::NAN, 1.0, 2.0, 3.0, 4.0, 5.0];
        let res = log_transform_analysis(&values).unwrap();
        assert_eq!(res.n_positive, 5);
        assert_eq!(res.n_dropped, 3);
    }

    #[test]
    fn test_insufficient_positive() {
        assert!(log_transform_analysis(&[1.0, 2.0, -3.0]).is_err());
        assert!(log_transform_analysis(&[]).is_err());
    }
}
