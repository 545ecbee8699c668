// crates/te_erosion/src/lib.rs

//! TerraErode 侵蚀层
//!
//! 提供侵蚀因子计算、USPED 输运-高程更新引擎与 RUSLE 参照估计。
//!
//! # 模块
//!
//! - `factors`: SCS-CN 径流、降雨侵蚀力、K 因子与 C/P 查找表
//! - `usped`: 输运能力、散度与前向欧拉高程更新
//! - `rusle`: 独立的年土壤流失参照估计与风险分级
//!
//! # 数值契约
//!
//! 非负夹取仅发生在输运能力阶段；散度（允许沉积为负）与
//! 高程更新阶段绝不夹取。因子计算的非物理输入在局部以
//! 保守默认值恢复并记录日志。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod factors;
pub mod rusle;
pub mod usped;

// 重导出常用类型
pub use factors::{
    compute_k_factor, compute_rainfall_erosivity, compute_runoff, cover_factor,
    cover_factor_with_ndvi, practice_factor, structure_factor,
};
pub use rusle::{
    classify_erosion_risk, compute_rusle, compute_rusle_grid, risk_area_breakdown, RiskClass,
};
pub use usped::{
    compute_divergence, compute_sediment_transport, update_elevation, ErosionInputs,
    ErosionStats, FactorBundle, FactorField, SimulationResult, SimulationStep, UspedConfig,
    UspedEngine,
};
