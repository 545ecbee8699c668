// crates/te_terrain/src/lib.rs

//! TerraErode 地形层
//!
//! 提供高程栅格与地形派生量提取。
//!
//! # 模块
//!
//! - `grid`: 高程栅格 [`RasterGrid`]（单元尺寸、无数据值、范围、CRS）
//! - `derivatives`: 坡度、坡向、曲率与派生量集合
//! - `hydrology`: 洼地填充、D8 流向与拓扑序汇流累积
//! - `ls_factor`: 坡长-坡度因子
//!
//! 所有操作均为显式输入上的纯函数：派生栅格与源栅格形状一致，
//! 高程改变后派生量集合随之失效，须重新提取。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod derivatives;
pub mod grid;
pub mod hydrology;
pub mod ls_factor;

// 重导出常用类型
pub use derivatives::{
    compute_aspect, compute_plan_curvature, compute_profile_curvature, compute_slope,
    DerivativeConfig, TerrainDerivatives,
};
pub use grid::{GridBounds, RasterGrid};
pub use hydrology::{
    compute_flow_accumulation, compute_flow_direction, fill_sinks, D8Direction,
    FlowDirectionGrid, D8_CODES,
};
pub use ls_factor::{compute_ls_factor, ls_factor_cell};
