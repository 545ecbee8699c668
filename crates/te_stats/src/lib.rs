// crates/te_stats/src/lib.rs

//! TerraErode 统计层
//!
//! 提供模拟结果的统计验证与不确定性分析。
//!
//! # 模块
//!
//! - `distributions`: 特殊函数与 Shapiro-Wilk 正态检验
//! - `correlation`: Pearson 相关与显著性
//! - `regression`: 标准化多元最小二乘回归
//! - `normality`: 对数变换正态性分析
//! - `agreement`: 一致性度量与配对 t 检验
//! - `report`: 带成功/失败标签的验证报告
//! - `uncertainty`: VaR / CVaR、蒙特卡洛传播与 OAT 敏感性
//!
//! # 错误契约
//!
//! 统计方法在样本不足时返回 `InsufficientData`，绝不 panic。
//! 报告层将单指标失败降级为带原因的标签，整份报告始终可生成。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod agreement;
pub mod correlation;
pub mod distributions;
pub mod normality;
pub mod regression;
pub mod report;
pub mod uncertainty;

// 重导出常用类型
pub use agreement::{
    compare_with_rusle, compute_agreement_metrics, AgreementMetrics, ComparisonVerdict,
    RusleComparison,
};
pub use correlation::{pearson_correlation, CorrelationResult, CorrelationStrength};
pub use distributions::{shapiro_wilk, student_t_two_sided_p, ShapiroWilk};
pub use normality::{log_transform_analysis, LogTransformAnalysis};
pub use regression::{linear_regression, RegressionResult};
pub use report::{MetricOutcome, ValidationReport};
pub use uncertainty::{
    compute_cvar, compute_var, monte_carlo_uncertainty, rank_by_magnitude,
    sensitivity_analysis, ParameterDistribution, SensitivityEntry, UncertaintyReport,
};
