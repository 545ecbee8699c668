// crates/te_terrain/src/grid.rs

//! 高程栅格数据管理
//!
//! 提供行优先存储的高程栅格 [`RasterGrid`]，携带单元尺寸、
//! 无数据值、可选空间范围与 CRS 标识。
//!
//! # 不变式
//!
//! - `data.len() == width * height`
//! - `cell_size > 0`
//! - 模拟步进产生**新的**栅格，绝不隐式原地修改输入

use serde::{Deserialize, Serialize};
use te_foundation::error::{TeError, TeResult};
use te_foundation::validation::{GridIssue, GridReport, GridWarning};

/// 栅格空间范围
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBounds {
    /// 最小 x 坐标
    pub min_x: f64,
    /// 最小 y 坐标
    pub min_y: f64,
    /// 最大 x 坐标
    pub max_x: f64,
    /// 最大 y 坐标
    pub max_y: f64,
}

/// 高程栅格
///
/// 行优先存储，`(x, y)` 处的值位于 `data[y * width + x]`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterGrid {
    /// 数据（行优先）
    pub data: Vec<f64>,
    /// 宽度（列数）
    pub width: usize,
    /// 高度（行数）
    pub height: usize,
    /// 单元尺寸 [m]
    pub cell_size: f64,
    /// 无数据值
    pub nodata: f64,
    /// 可选空间范围
    pub bounds: Option<GridBounds>,
    /// 坐标参考系标识（如 "EPSG:4326"）
    pub crs: String,
}

impl RasterGrid {
    /// 创建全零栅格
    pub fn new(width: usize, height: usize, cell_size: f64) -> Self {
        Self {
            data: vec![0.0; width * height],
            width,
            height,
            cell_size,
            nodata: -9999.0,
            bounds: None,
            crs: String::new(),
        }
    }

    /// 从数据创建
    pub fn from_data(
        data: Vec<f64>,
        width: usize,
        height: usize,
        cell_size: f64,
    ) -> TeResult<Self> {
        TeError::check_size("raster data", width * height, data.len())?;
        if cell_size <= 0.0 {
            return Err(TeError::invalid_parameter(
                "cell_size",
                cell_size,
                "单元尺寸必须为正",
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            cell_size,
            nodata: -9999.0,
            bounds: None,
            crs: String::new(),
        })
    }

    /// 设置空间范围
    pub fn with_bounds(mut self, bounds: GridBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// 设置 CRS 标识
    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = crs.into();
        self
    }

    /// 设置无数据值
    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = nodata;
        self
    }

    /// 单元总数
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空栅格
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 形状 (width, height)
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// 获取像素值
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x < self.width && y < self.height {
            Some(self.data[y * self.width + x])
        } else {
            None
        }
    }

    /// 获取像素值（越界 panic，仅用于已验证索引的内层循环）
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    /// 设置像素值
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    /// 行优先线性索引
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// 判断是否为无数据
    #[inline]
    pub fn is_nodata(&self, value: f64) -> bool {
        value.is_nan() || (self.nodata.is_finite() && (value - self.nodata).abs() < 1e-10)
    }

    /// 形状是否与另一栅格一致
    #[inline]
    pub fn same_shape(&self, other: &RasterGrid) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// 创建形状、元数据与本栅格一致、数据全零的新栅格
    pub fn zeros_like(&self) -> RasterGrid {
        RasterGrid {
            data: vec![0.0; self.data.len()],
            width: self.width,
            height: self.height,
            cell_size: self.cell_size,
            nodata: self.nodata,
            bounds: self.bounds,
            crs: self.crs.clone(),
        }
    }

    /// 带边界夹取的采样：越界坐标取最近的有效单元
    ///
    /// 用于 3×3 模板在栅格边缘的复制延拓。
    #[inline]
    pub fn at_clamped(&self, x: isize, y: isize) -> f64 {
        let cx = x.clamp(0, self.width as isize - 1) as usize;
        let cy = y.clamp(0, self.height as isize - 1) as usize;
        self.data[cy * self.width + cx]
    }

    /// 有效（有限且非无数据）单元的统计量 (min, max, mean)
    pub fn statistics(&self) -> (f64, f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;
        for &v in &self.data {
            if v.is_finite() && !self.is_nodata(v) {
                min = min.min(v);
                max = max.max(v);
                sum += v;
                count += 1;
            }
        }
        if count == 0 {
            (0.0, 0.0, 0.0)
        } else {
            (min, max, sum / count as f64)
        }
    }

    /// 验证栅格输入，返回诊断报告
    ///
    /// 非有限（非无数据）单元记为错误；无数据占比超过一半记为警告。
    /// 报告仅用于诊断，不中断派生流程。
    pub fn validate(&self) -> GridReport {
        let mut report = GridReport::new();
        if self.cell_size <= 0.0 {
            report.add_error(GridIssue::Metadata {
                message: format!("cell_size={} 必须为正", self.cell_size),
            });
        }
        let mut nodata_cells = 0usize;
        for (i, &v) in self.data.iter().enumerate() {
            if self.is_nodata(v) {
                nodata_cells += 1;
            } else if !v.is_finite() {
                report.add_error(GridIssue::NonFinite {
                    field: "elevation",
                    cell: i,
                    value: v,
                });
            }
        }
        if !self.data.is_empty() && nodata_cells * 2 > self.data.len() {
            report.add_warning(GridWarning::NodataCoverage {
                nodata_cells,
                total_cells: self.data.len(),
            });
        }
        report
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data_size_check() {
        assert!(RasterGrid::from_data(vec![0.0; 6], 3, 2, 10.0).is_ok());
        assert!(RasterGrid::from_data(vec![0.0; 5], 3, 2, 10.0).is_err());
    }

    #[test]
    fn test_from_data_rejects_nonpositive_cell_size() {
        assert!(RasterGrid::from_data(vec![0.0; 4], 2, 2, 0.0).is_err());
        assert!(RasterGrid::from_data(vec![0.0; 4], 2, 2, -5.0).is_err());
    }

    #[test]
    fn test_row_major_access() {
        let grid = RasterGrid::from_data(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2, 10.0).unwrap();
        assert_eq!(grid.get(0, 0), Some(1.0));
        assert_eq!(grid.get(2, 0), Some(3.0));
        assert_eq!(grid.get(0, 1), Some(4.0));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.at(1, 1), 5.0);
    }

    #[test]
    fn test_clamped_sampling() {
        let grid = RasterGrid::from_data(vec![1.0, 2.0, 3.0, 4.0], 2, 2, 1.0).unwrap();
        assert_eq!(grid.at_clamped(-1, -1), 1.0);
        assert_eq!(grid.at_clamped(5, 0), 2.0);
        assert_eq!(grid.at_clamped(0, 5), 3.0);
    }

    #[test]
    fn test_nodata_detection() {
        let grid = RasterGrid::new(2, 2, 1.0).with_nodata(-9999.0);
        assert!(grid.is_nodata(-9999.0));
        assert!(grid.is_nodata(f64::NAN));
        assert!(!grid.is_nodata(0.0));
    }

    #[test]
    fn test_statistics() {
        let mut grid = RasterGrid::from_data(vec![1.0, 2.0, 3.0, -9999.0], 2, 2, 1.0).unwrap();
        grid.nodata = -9999.0;
        let (min, max, mean) = grid.statistics();
        assert_eq!(min, 1.0);
        assert_eq!(max, 3.0);
        assert!((mean - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_validate_flags_nan() {
        let grid = RasterGrid::from_data(vec![1.0, f64::INFINITY, 3.0, 4.0], 2, 2, 1.0).unwrap();
        let report = grid.validate();
        assert!(!report.is_valid());
        assert_eq!(report.error_count(), 1);
    }

    #[test]
    fn test_zeros_like_preserves_metadata() {
        let grid = RasterGrid::new(3, 2, 30.0)
            .with_crs("EPSG:32650")
            .with_bounds(GridBounds {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 90.0,
                max_y: 60.0,
            });
        let z = grid.zeros_like();
        assert!(grid.same_shape(&z));
        assert_eq!(z.cell_size, 30.0);
        assert_eq!(z.crs, "EPSG:32650");
        assert!(z.bounds.is_some());
    }
}
