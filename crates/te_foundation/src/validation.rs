// crates/te_foundation/src/validation.rs

//! 运行时验证工具
//!
//! 提供栅格输入的验证报告和错误/警告类型。报告只做诊断，
//! 不会中断地形派生流程：非有限单元作为错误记录，
//! 无数据覆盖率过高等情况作为警告记录。
//!
//! # 示例
//!
//! ```
//! use te_foundation::validation::{GridReport, GridIssue};
//!
//! let elevation = -9999.0f64;
//! let mut report = GridReport::new();
//! if !elevation.is_finite() {
//!     report.add_error(GridIssue::NonFinite {
//!         field: "elevation",
//!         cell: 0,
//!         value: elevation,
//!     });
//! }
//! assert!(report.is_valid());
//! ```

use std::fmt;

/// 栅格验证报告
#[derive(Debug, Default)]
pub struct GridReport {
    /// 错误列表
    pub errors: Vec<GridIssue>,
    /// 警告列表
    pub warnings: Vec<GridWarning>,
}

impl GridReport {
    /// 创建空的验证报告
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加错误
    pub fn add_error(&mut self, error: GridIssue) {
        self.errors.push(error);
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: GridWarning) {
        self.warnings.push(warning);
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 是否有警告
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// 错误数量
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// 警告数量
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// 是否通过（无错误）
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// 合并另一个报告
    pub fn merge(&mut self, other: GridReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

impl fmt::Display for GridReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "栅格验证报告:")?;
        writeln!(f, "  错误: {} 个", self.error_count())?;
        writeln!(f, "  警告: {} 个", self.warning_count())?;

        if self.has_errors() {
            writeln!(f, "\n错误详情:")?;
            for (i, err) in self.errors.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, err)?;
            }
        }

        if self.has_warnings() {
            writeln!(f, "\n警告详情:")?;
            for (i, warn) in self.warnings.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, warn)?;
            }
        }

        Ok(())
    }
}

/// 栅格验证错误类型
#[derive(Debug, Clone)]
pub enum GridIssue {
    /// 非有限值
    NonFinite {
        /// 字段名称
        field: &'static str,
        /// 所在单元索引（行优先）
        cell: usize,
        /// 非有限的数值
        value: f64,
    },
    /// 数据超出范围
    OutOfRange {
        /// 字段名称
        field: &'static str,
        /// 所在单元索引（行优先）
        cell: usize,
        /// 实际值
        value: f64,
        /// 下界
        min: f64,
        /// 上界
        max: f64,
    },
    /// 栅格元数据错误（单元尺寸、形状等）
    Metadata {
        /// 错误描述
        message: String,
    },
}

impl fmt::Display for GridIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite { field, cell, value } => {
                write!(f, "单元{}: 字段{}={} (非有限值)", cell, field, value)
            }
            Self::OutOfRange {
                field,
                cell,
                value,
                min,
                max,
            } => {
                write!(
                    f,
                    "单元{}: 字段{}={} 超出范围[{}, {}]",
                    cell, field, value, min, max
                )
            }
            Self::Metadata { message } => {
                write!(f, "元数据错误: {}", message)
            }
        }
    }
}

impl std::error::Error for GridIssue {}

/// 栅格验证警告类型
#[derive(Debug, Clone)]
pub enum GridWarning {
    /// 无数据单元占比过高
    NodataCoverage {
        /// 无数据单元数
        nodata_cells: usize,
        /// 总单元数
        total_cells: usize,
    },
    /// 质量警告
    Quality {
        /// 警告描述
        message: String,
    },
}

impl fmt::Display for GridWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodataCoverage {
                nodata_cells,
                total_cells,
            } => {
                write!(
                    f,
                    "无数据单元占比过高: {}/{}",
                    nodata_cells, total_cells
                )
            }
            Self::Quality { message } => {
                write!(f, "质量警告: {}", message)
            }
        }
    }
}

// ============================================================================
// 测试
// ============================================================================
