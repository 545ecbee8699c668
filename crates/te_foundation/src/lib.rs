// crates/te_foundation/src/lib.rs

//! TerraErode Foundation Layer
//!
//! 基础层，提供整个工作区的基础抽象。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 `TeError` / `TeResult`
//! - [`float`]: 数值常量、安全浮点运算与序列统计
//! - [`validation`]: 栅格输入的运行时验证报告
//!
//! # 设计原则
//!
//! 1. **最小依赖**: 仅依赖 serde 和 thiserror
//! 2. **"指标不可用"语义**: 统计方法的错误是带标签的结果，不是流程失败
//! 3. **纯函数**: 除不可变查表外不携带任何调用间状态
//!
//! # 示例
//!
//! ```
//! use te_foundation::{
//!     error::{TeError, TeResult},
//!     float::safe_div,
//! };
//!
//! fn normalized_ratio(a: f64, b: f64) -> TeResult<f64> {
//!     TeError::check_finite("ratio", safe_div(a, b, 0.0))
//! }
//! assert_eq!(normalized_ratio(1.0, 2.0).unwrap(), 0.5);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod float;
pub mod validation;

// 重导出常用类型
pub use error::{TeError, TeResult};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{TeError, TeResult};
    pub use crate::float::{approx_eq, mean, percentile_sorted, safe_div, safe_sqrt, sample_std,
        sample_variance};
    pub use crate::validation::{GridIssue, GridReport, GridWarning};
}
