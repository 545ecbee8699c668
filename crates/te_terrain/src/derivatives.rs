// crates/te_terrain/src/derivatives.rs

//! 地形派生量：坡度、坡向与曲率
//!
//! 基于 3×3 加权有限差分（Horn 坡度、Zevenbergen-Thorne 曲率）
//! 从高程栅格提取一阶与二阶派生量：
//!
//! - 坡度：百分比梯度，恒非负
//! - 坡向：自北顺时针角度，归一化到 [0, 360)
//! - 剖面曲率 / 平面曲率：指示水流加速与汇聚
//!
//! 栅格边缘按最近内部单元复制延拓；中心为无数据的单元输出无数据值，
//! 邻域内的无数据单元以中心值替代。
//!
//! # 窗口编号
//!
//! ```text
//! z1 z2 z3        北
//! z4 z5 z6     西    东
//! z7 z8 z9        南
//! ```

use crate::grid::RasterGrid;
use crate::hydrology::{compute_flow_accumulation, compute_flow_direction, fill_sinks,
    FlowDirectionGrid};
use crate::ls_factor::compute_ls_factor;
use serde::{Deserialize, Serialize};
use te_foundation::error::TeResult;
use te_foundation::float::SAFE_DIV_EPSILON;

/// 取 3×3 邻域窗口
///
/// 边缘复制延拓；无数据邻居以中心值替代。返回行优先的 `[z1..z9]`。
#[inline]
fn stencil3x3(grid: &RasterGrid, x: usize, y: usize) -> [f64; 9] {
    let center = grid.at(x, y);
    let mut w = [center; 9];
    let mut k = 0;
    for dy in -1..=1isize {
        for dx in -1..=1isize {
            let v = grid.at_clamped(x as isize + dx, y as isize + dy);
            w[k] = if grid.is_nodata(v) { center } else { v };
            k += 1;
        }
    }
    w
}

/// Horn 一阶梯度 (dz/dx 向东, dz/dy 向南)
#[inline]
fn horn_gradient(w: &[f64; 9], cell_size: f64) -> (f64, f64) {
    let dz_dx = ((w[2] + 2.0 * w[5] + w[8]) - (w[0] + 2.0 * w[3] + w[6])) / (8.0 * cell_size);
    let dz_dy = ((w[6] + 2.0 * w[7] + w[8]) - (w[0] + 2.0 * w[1] + w[2])) / (8.0 * cell_size);
    (dz_dx, dz_dy)
}

/// 计算坡度（百分比梯度）
///
/// Horn 3×3 加权差分，`slope = 100·√(p² + q²)`，恒非负。
/// 输出形状与输入一致；中心为无数据的单元输出无数据值。
pub fn compute_slope(dem: &RasterGrid) -> RasterGrid {
    let mut out = dem.zeros_like();
    for y in 0..dem.height {
        for x in 0..dem.width {
            let z = dem.at(x, y);
            if dem.is_nodata(z) {
                out.set(x, y, dem.nodata);
                continue;
            }
            let w = stencil3x3(dem, x, y);
            let (p, q) = horn_gradient(&w, dem.cell_size);
            out.set(x, y, 100.0 * (p * p + q * q).sqrt());
        }
    }
    out
}

/// 计算坡向（度，自北顺时针，[0, 360)）
///
/// 坡向指向最陡下降方向。平坦单元定义为 0°。
pub fn compute_aspect(dem: &RasterGrid) -> RasterGrid {
    let mut out = dem.zeros_like();
    for y in 0..dem.height {
        for x in 0..dem.width {
            let z = dem.at(x, y);
            if dem.is_nodata(z) {
                out.set(x, y, dem.nodata);
                continue;
            }
            let w = stencil3x3(dem, x, y);
            let (p, q) = horn_gradient(&w, dem.cell_size);
            if p.abs() < SAFE_DIV_EPSILON && q.abs() < SAFE_DIV_EPSILON {
                out.set(x, y, 0.0);
                continue;
            }
            // 下降方向的东分量 -p、北分量 q；罗盘角 = atan2(东, 北)
            let mut deg = (-p).atan2(q).to_degrees();
            if deg < 0.0 {
                deg += 360.0;
            }
            // 浮点归一化后仍可能落在 360.0 上
            if deg >= 360.0 {
                deg -= 360.0;
            }
            out.set(x, y, deg);
        }
    }
    out
}

/// Zevenbergen-Thorne 二阶系数
struct ZtCoefficients {
    d: f64,
    e: f64,
    f: f64,
    g: f64,
    h: f64,
}

fn zt_coefficients(w: &[f64; 9], cell_size: f64) -> ZtCoefficients {
    let l2 = cell_size * cell_size;
    ZtCoefficients {
        d: ((w[3] + w[5]) / 2.0 - w[4]) / l2,
        e: ((w[1] + w[7]) / 2.0 - w[4]) / l2,
        f: (-w[0] + w[2] + w[6] - w[8]) / (4.0 * l2),
        g: (-w[3] + w[5]) / (2.0 * cell_size),
        h: (w[1] - w[7]) / (2.0 * cell_size),
    }
}

/// 计算剖面曲率
///
/// 沿最陡坡方向的二阶导数；正值表示水流加速（凸坡）。
/// 平坦单元（梯度近零）输出 0。
pub fn compute_profile_curvature(dem: &RasterGrid) -> RasterGrid {
    let mut out = dem.zeros_like();
    for y in 0..dem.height {
        for x in 0..dem.width {
            let z = dem.at(x, y);
            if dem.is_nodata(z) {
                out.set(x, y, dem.nodata);
                continue;
            }
            let w = stencil3x3(dem, x, y);
            let c = zt_coefficients(&w, dem.cell_size);
            let g2h2 = c.g * c.g + c.h * c.h;
            if g2h2 < SAFE_DIV_EPSILON {
                out.set(x, y, 0.0);
                continue;
            }
            let curv = -2.0 * (c.d * c.g * c.g + c.e * c.h * c.h + c.f * c.g * c.h) / g2h2;
            out.set(x, y, curv);
        }
    }
    out
}

/// 计算平面曲率
///
/// 垂直于最陡坡方向的二阶导数；正值表示水流汇聚。
pub fn compute_plan_curvature(dem: &RasterGrid) -> RasterGrid {
    let mut out = dem.zeros_like();
    for y in 0..dem.height {
        for x in 0..dem.width {
            let z = dem.at(x, y);
            if dem.is_nodata(z) {
                out.set(x, y, dem.nodata);
                continue;
            }
            let w = stencil3x3(dem, x, y);
            let c = zt_coefficients(&w, dem.cell_size);
            let g2h2 = c.g * c.g + c.h * c.h;
            if g2h2 < SAFE_DIV_EPSILON {
                out.set(x, y, 0.0);
                continue;
            }
            let curv = 2.0 * (c.d * c.h * c.h + c.e * c.g * c.g - c.f * c.g * c.h) / g2h2;
            out.set(x, y, curv);
        }
    }
    out
}

// ============================================================================
// 派生量集合
// ============================================================================

/// 派生量提取配置
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DerivativeConfig {
    /// 洼地填充迭代次数（0 表示不填充）
    pub fill_sink_iterations: usize,
}

impl Default for DerivativeConfig {
    fn default() -> Self {
        Self {
            fill_sink_iterations: 3,
        }
    }
}

impl DerivativeConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置洼地填充迭代次数
    pub fn with_fill_sink_iterations(mut self, iterations: usize) -> Self {
        self.fill_sink_iterations = iterations;
        self
    }
}

/// 地形派生量集合
///
/// 所有派生栅格与源栅格形状一致。派生量是源高程的纯函数：
/// 高程改变后必须重新调用 [`TerrainDerivatives::from_dem`]，
/// 旧集合随之失效。
#[derive(Debug, Clone)]
pub struct TerrainDerivatives {
    /// 坡度（百分比梯度，≥0）
    pub slope: RasterGrid,
    /// 坡向（度，自北顺时针，[0, 360)）
    pub aspect: RasterGrid,
    /// D8 流向编码
    pub flow_direction: FlowDirectionGrid,
    /// 汇流面积 [m²]
    pub flow_accumulation: RasterGrid,
    /// LS 因子
    pub ls_factor: RasterGrid,
    /// 剖面曲率
    pub profile_curvature: RasterGrid,
    /// 平面曲率
    pub plan_curvature: RasterGrid,
}

impl TerrainDerivatives {
    /// 从高程栅格提取全部派生量
    ///
    /// 洼地填充只影响流向与汇流的计算，坡度/坡向/曲率仍基于原始高程。
    pub fn from_dem(dem: &RasterGrid, config: &DerivativeConfig) -> TeResult<Self> {
        let slope = compute_slope(dem);
        let aspect = compute_aspect(dem);
        let profile_curvature = compute_profile_curvature(dem);
        let plan_curvature = compute_plan_curvature(dem);

        let filled = if config.fill_sink_iterations > 0 {
            fill_sinks(dem, config.fill_sink_iterations)
        } else {
            dem.clone()
        };
        let flow_direction = compute_flow_direction(&filled);
        let flow_accumulation = compute_flow_accumulation(&filled, &flow_direction)?;
        let ls_factor = compute_ls_factor(&flow_accumulation, &slope)?;

        Ok(Self {
            slope,
            aspect,
            flow_direction,
            flow_accumulation,
            ls_factor,
            profile_curvature,
            plan_curvature,
        })
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// 自西向东线性下降的斜面，dz/dx = -0.1
    fn west_high_plane() -> RasterGrid {
        let mut data = Vec::with_capacity(25);
        for _y in 0..5 {
            for x in 0..5 {
                data.push(10.0 - x as f64);
            }
        }
        RasterGrid::from_data(data, 5, 5, 10.0).unwrap()
    }

    #[test]
    fn test_slope_nonnegative_and_shape() {
        let dem = west_high_plane();
        let slope = compute_slope(&dem);
        assert_eq!(slope.shape(), dem.shape());
        assert!(slope.data.iter().all(|&s| s >= 0.0));
    }

    #[test]
    fn test_slope_of_uniform_plane() {
        let dem = west_high_plane();
        let slope = compute_slope(&dem);
        // dz/dx = -1/10 = -0.1, dz/dy = 0 → 坡度 10%
        assert!((slope.at(2, 2) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_slope_flat_is_zero() {
        let dem = RasterGrid::from_data(vec![5.0; 9], 3, 3, 1.0).unwrap();
        let slope = compute_slope(&dem);
        assert!(slope.data.iter().all(|&s| s.abs() < 1e-12));
    }

    #[test]
    fn test_aspect_east_facing() {
        // 西高东低，下降方向朝东 → 坡向 90°
        let dem = west_high_plane();
        let aspect = compute_aspect(&dem);
        assert!((aspect.at(2, 2) - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_aspect_south_facing() {
        // 北高南低，下降方向朝南 → 坡向 180°
        let mut data = Vec::with_capacity(25);
        for y in 0..5 {
            for _x in 0..5 {
                data.push(10.0 - y as f64);
            }
        }
        let dem = RasterGrid::from_data(data, 5, 5, 10.0).unwrap();
        let aspect = compute_aspect(&dem);
        assert!((aspect.at(2, 2) - 180.0).abs() < 1e-6);
    }

    #[test]
    fn test_aspect_range() {
        let dem = west_high_plane();
        let aspect = compute_aspect(&dem);
        for &a in &aspect.data {
            assert!((0.0..360.0).contains(&a));
        }
    }

    #[test]
    fn test_flat_aspect_is_zero() {
        let dem = RasterGrid::from_data(vec![3.0; 9], 3, 3, 1.0).unwrap();
        let aspect = compute_aspect(&dem);
        assert_eq!(aspect.at(1, 1), 0.0);
    }

    #[test]
    fn test_curvature_of_plane_is_zero() {
        // 平面二阶导数为零
        let dem = west_high_plane();
        let prof = compute_profile_curvature(&dem);
        let plan = compute_plan_curvature(&dem);
        assert!(prof.at(2, 2).abs() < 1e-9);
        assert!(plan.at(2, 2).abs() < 1e-9);
    }

    #[test]
    fn test_profile_curvature_sign_on_ridge() {
        // 抛物线山脊 z = -(x-2)²，沿 x 凸 → 剖面曲率为正（水流加速）
        let mut data = Vec::with_capacity(25);
        for _y in 0..5 {
            for x in 0..5 {
                let d = x as f64 - 2.0;
                data.push(-d * d);
            }
        }
        let dem = RasterGrid::from_data(data, 5, 5, 1.0).unwrap();
        let prof = compute_profile_curvature(&dem);
        assert!(prof.at(1, 2) > 0.0);
    }

    #[test]
    fn test_nodata_center_propagates() {
        let mut dem = west_high_plane();
        dem.set(2, 2, dem.nodata);
        let slope = compute_slope(&dem);
        assert!(slope.is_nodata(slope.at(2, 2)));
    }

    #[test]
    fn test_from_dem_shapes_consistent() {
        let dem = west_high_plane();
        let deriv = TerrainDerivatives::from_dem(&dem, &DerivativeConfig::default()).unwrap();
        assert_eq!(deriv.slope.shape(), dem.shape());
        assert_eq!(deriv.aspect.shape(), dem.shape());
        assert_eq!(deriv.flow_accumulation.shape(), dem.shape());
        assert_eq!(deriv.ls_factor.shape(), dem.shape());
        assert_eq!(deriv.profile_curvature.shape(), dem.shape());
        assert_eq!(deriv.plan_curvature.shape(), dem.shape());
        assert_eq!(
            (deriv.flow_direction.width, deriv.flow_direction.height),
            dem.shape()
        );
    }
}
