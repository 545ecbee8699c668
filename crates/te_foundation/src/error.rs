// crates/te_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `TeError` 枚举和 `TeResult` 类型别名，用于整个项目的错误处理。
//!
//! # 设计原则
//!
//! 1. **分层恢复**: 地形与因子计算在局部用保守默认值恢复，统计方法返回
//!    带标签的错误结果，仅真正意外的数值故障向上传播
//! 2. **易用性**: 提供便捷的构造方法和 `check_*` 验证辅助
//! 3. **"指标不可用"语义**: 调用方应把统计方法的 `Err` 当作
//!    "该指标不可用"处理，而非整个流程失败
//!
//! # 示例
//!
//! ```
//! use te_foundation::error::{TeError, TeResult};
//!
//! fn correlate(n: usize) -> TeResult<()> {
//!     if n < 2 {
//!         return Err(TeError::insufficient_data("pearson_correlation", 2, n));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// 统一结果类型
pub type TeResult<T> = Result<T, TeError>;

/// TerraErode 错误类型
///
/// 核心错误类型，用于整个工作区。按谱系分为三类：
/// 数据不足（统计方法样本太少）、参数无效（非物理输入）、
/// 计算故障（未被拦截的 NaN/Inf 或奇异矩阵）。
#[derive(Error, Debug)]
pub enum TeError {
    // ========================================================================
    // 数据不足
    // ========================================================================

    /// 有效样本数不满足统计方法的最低要求
    #[error("数据不足: {method} 至少需要 {required} 个有效样本, 实际 {actual}")]
    InsufficientData {
        /// 统计方法名称
        method: &'static str,
        /// 最低样本数
        required: usize,
        /// 实际有效样本数
        actual: usize,
    },

    // ========================================================================
    // 参数无效
    // ========================================================================

    /// 非物理参数
    #[error("无效参数: {name}={value}, 原因: {reason}")]
    InvalidParameter {
        /// 参数名
        name: &'static str,
        /// 实际值
        value: f64,
        /// 无效原因说明
        reason: String,
    },

    /// 数据超出范围
    #[error("数据超出范围: {field}={value}, 期望范围=[{min}, {max}]")]
    OutOfRange {
        /// 字段名
        field: &'static str,
        /// 实际值
        value: f64,
        /// 最小允许值
        min: f64,
        /// 最大允许值
        max: f64,
    },

    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 栅格形状不匹配
    #[error("栅格形状不匹配: {name} 期望{expected:?}, 实际{actual:?}")]
    ShapeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望形状 (width, height)
        expected: (usize, usize),
        /// 实际形状 (width, height)
        actual: (usize, usize),
    },

    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    // ========================================================================
    // 计算故障
    // ========================================================================

    /// 未被拦截的非有限值（NaN/Inf）
    #[error("数值故障: {context} 产生非有限值")]
    NonFinite {
        /// 故障发生位置描述
        context: &'static str,
    },

    /// 线性系统奇异，无法求解
    #[error("矩阵奇异: {context}")]
    SingularMatrix {
        /// 故障发生位置描述
        context: &'static str,
    },

    /// 内部错误
    #[error("内部错误: {message}")]
    Internal {
        /// 内部错误描述
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl TeError {
    /// 数据不足
    pub fn insufficient_data(method: &'static str, required: usize, actual: usize) -> Self {
        Self::InsufficientData {
            method,
            required,
            actual,
        }
    }

    /// 非物理参数
    pub fn invalid_parameter(name: &'static str, value: f64, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason: reason.into(),
        }
    }

    /// 数据超出范围
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// 数组大小不匹配
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 栅格形状不匹配
    pub fn shape_mismatch(
        name: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    ) -> Self {
        Self::ShapeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 非有限值故障
    pub fn non_finite(context: &'static str) -> Self {
        Self::NonFinite { context }
    }

    /// 奇异矩阵
    pub fn singular_matrix(context: &'static str) -> Self {
        Self::SingularMatrix { context }
    }

    /// 内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl TeError {
    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> TeResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查栅格形状是否匹配
    #[inline]
    pub fn check_shape(
        name: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    ) -> TeResult<()> {
        if expected != actual {
            Err(Self::shape_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查值是否在范围内
    #[inline]
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> TeResult<()> {
        if value < min || value > max {
            Err(Self::out_of_range(field, value, min, max))
        } else {
            Ok(())
        }
    }

    /// 检查值是否有限
    #[inline]
    pub fn check_finite(context: &'static str, value: f64) -> TeResult<f64> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Self::non_finite(context))
        }
    }
}

// ========================================================================
// 测试
// ========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_display() {
        let err = TeError::insufficient_data("pearson_correlation", 2, 1);
        let msg = err.to_string();
        assert!(msg.contains("pearson_correlation"));
        assert!(msg.contains('2'));
        assert!(msg.contains('1'));
    }

    #[test]
    fn test_out_of_range_display() {
        let err = TeError::out_of_range("confidence", 1.5, 0.0, 1.0);
        assert!(err.to_string().contains("confidence"));
    }

    #[test]
    fn test_check_size() {
        assert!(TeError::check_size("factors", 10, 10).is_ok());
        assert!(TeError::check_size("factors", 10, 5).is_err());
    }

    #[test]
    fn test_check_shape() {
        assert!(TeError::check_shape("slope", (4, 3), (4, 3)).is_ok());
        assert!(TeError::check_shape("slope", (4, 3), (3, 4)).is_err());
    }

    #[test]
    fn test_check_range() {
        assert!(TeError::check_range("value", 5.0, 0.0, 10.0).is_ok());
        assert!(TeError::check_range("value", -1.0, 0.0, 10.0).is_err());
        assert!(TeError::check_range("value", 11.0, 0.0, 10.0).is_err());
    }

    #[test]
    fn test_check_finite() {
        assert!(TeError::check_finite("transport", 1.0).is_ok());
        assert!(TeError::check_finite("transport", f64::NAN).is_err());
        assert!(TeError::check_finite("transport", f64::INFINITY).is_err());
    }
}
