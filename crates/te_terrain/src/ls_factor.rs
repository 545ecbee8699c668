// crates/te_terrain/src/ls_factor.rs

//! LS 因子（坡长-坡度因子）
//!
//! 以汇流面积为坡长代理：
//!
//! - `L = max(√(A / cell_size²), 0.5)`
//! - `S = 0.065 + 4.56·sin β + 65.41·sin²β`（β 为坡度角）
//! - `LS = clamp(L·S, 0.2, 100)`

use crate::grid::RasterGrid;
use te_foundation::error::{TeError, TeResult};

/// LS 因子下限
pub const LS_MIN: f64 = 0.2;
/// LS 因子上限
pub const LS_MAX: f64 = 100.0;
/// 坡长代理下限
pub const L_FLOOR: f64 = 0.5;

/// 单元级 LS 因子
///
/// `flow_accum_area` 为汇流面积 [m²]，`slope_percent` 为百分比坡度。
pub fn ls_factor_cell(flow_accum_area: f64, slope_percent: f64, cell_size: f64) -> f64 {
    let cell_area = cell_size * cell_size;
    let count = (flow_accum_area / cell_area).max(0.0);
    let l = count.sqrt().max(L_FLOOR);

    // 百分比坡度 → 坡度角
    let beta = (slope_percent / 100.0).atan();
    let sin_b = beta.sin();
    let s = 0.065 + 4.56 * sin_b + 65.41 * sin_b * sin_b;

    (l * s).clamp(LS_MIN, LS_MAX)
}

/// 计算 LS 因子栅格
///
/// 无数据单元（汇流或坡度任一为无数据）输出无数据值。
pub fn compute_ls_factor(
    flow_accumulation: &RasterGrid,
    slope: &RasterGrid,
) -> TeResult<RasterGrid> {
    TeError::check_shape("slope", flow_accumulation.shape(), slope.shape())?;

    let mut out = flow_accumulation.zeros_like();
    for y in 0..out.height {
        for x in 0..out.width {
            let acc = flow_accumulation.at(x, y);
            let s = slope.at(x, y);
            if flow_accumulation.is_nodata(acc) || slope.is_nodata(s) {
                out.set(x, y, out.nodata);
                continue;
            }
            out.set(x, y, ls_factor_cell(acc, s.max(0.0), flow_accumulation.cell_size));
        }
    }
    Ok(out)
}

// ============================================================================
// 测试
// ============================================================================
