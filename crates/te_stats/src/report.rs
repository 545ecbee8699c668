// crates/te_stats/src/report.rs

//! 验证报告
//!
//! 每个指标以 `MetricOutcome` 带标签地记录成功或失败，
//! 单个指标不可用不会使整份报告失败。
//! 报告由持久化层与展示层直接消费，所有字段可序列化。

use crate::agreement::{
    compare_with_rusle, compute_agreement_metrics, AgreementMetrics, RusleComparison,
};
use crate::correlation::{pearson_correlation, CorrelationResult};
use crate::normality::{log_transform_analysis, LogTransformAnalysis};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use te_foundation::error::TeError;

/// 单指标结果，成功或带原因失败
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricOutcome<T> {
    /// 指标计算成功
    Success {
        /// 指标值
        value: T,
    },
    /// 指标不可用
    Error {
        /// 失败原因
        reason: String,
    },
}

impl<T> MetricOutcome<T> {
    /// 由 Result 构造，错误转为可读原因
    pub fn from_result(result: Result<T, TeError>) -> Self {
        match result {
            Ok(value) => Self::Success { value },
            Err(e) => {
                log::warn!("验证指标不可用: {}", e);
                Self::Error {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// 指标是否可用
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// 成功值的引用
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success { value } => Some(value),
            Self::Error { .. } => None,
        }
    }
}

/// 验证报告
///
/// 汇总模拟结果与 RUSLE 参考值之间的全部验证指标。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// 一致性度量
    pub agreement: MetricOutcome<AgreementMetrics>,
    /// Pearson 相关
    pub correlation: MetricOutcome<CorrelationResult>,
    /// 配对 t 检验结论
    pub hypothesis_test: MetricOutcome<RusleComparison>,
    /// 模拟值的对数变换正态性分析
    pub normality: MetricOutcome<LogTransformAnalysis>,
    /// 生成时间
    pub generated_at: DateTime<Utc>,
}

impl ValidationReport {
    /// 对模拟序列与 RUSLE 参考序列生成完整报告
    ///
    /// 各指标独立计算，任一指标失败不影响其余指标。
    pub fn build(simulated: &[f64], rusle: &[f64]) -> Self {
        Self {
            agreement: MetricOutcome::from_result(compute_agreement_metrics(simulated, rusle)),
            correlation: MetricOutcome::from_result(pearson_correlation(simulated, rusle)),
            hypothesis_test: MetricOutcome::from_result(compare_with_rusle(simulated, rusle)),
            normality: MetricOutcome::from_result(log_transform_analysis(simulated)),
            generated_at: Utc::now(),
        }
    }

    /// 可用指标数 / 总指标数
    pub fn success_ratio(&self) -> (usize, usize) {
        let flags = [
            self.agreement.is_success(),
            self.correlation.is_success(),
            self.hypothesis_test.is_success(),
            self.normality.is_success(),
        ];
        (flags.iter().filter(|f| **f).count(), flags.len())
    }
}

// ============================================================
// 测试
// ============================================================
