// crates/te_erosion/src/usped.rs

//! USPED 输运能力与高程更新引擎
//!
//! 单位水流功率侵蚀-沉积模型（USPED）：
//!
//! 1. 输运能力 `T = K·C·P·R·Q·A^0.6·sin β^1.3`（唯一的非负夹取点）
//! 2. 散度 `∇·T = ∂T/∂x·cos θ + ∂T/∂y·sin θ + ε·∂T/∂z·sin β`
//!    （允许为负，负值表示沉积，不做夹取）
//! 3. 显式前向欧拉高程更新 `z' = z − (Δt/ρ_b)·∇·T`（不做夹取）
//!
//! 每步从**当前**高程重新派生坡度、坡向与流向后再步进；
//! [`UspedEngine::step`] 返回新的高程栅格，绝不原地修改输入。
//!
//! # 数值契约
//!
//! 非负夹取仅发生在输运能力阶段；散度与高程更新阶段保留符号。

use crate::rusle::{compute_rusle_grid, risk_area_breakdown, RiskClass};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use te_foundation::error::{TeError, TeResult};
use te_foundation::float::{mean, sample_std, SAFE_DIV_EPSILON};
use te_terrain::derivatives::{DerivativeConfig, TerrainDerivatives};
use te_terrain::grid::RasterGrid;

/// 默认土壤容重 [kg/m³]
pub const DEFAULT_BULK_DENSITY: f64 = 1300.0;
/// 默认垂向散度权重 ε
pub const DEFAULT_EPSILON_WEIGHT: f64 = 0.01;

// ============================================================
// 因子集合
// ============================================================

/// 单元级侵蚀因子集合
///
/// 由调用方持有并按值传入纯函数。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FactorBundle {
    /// 降雨侵蚀力 R
    pub r: f64,
    /// 土壤可蚀性 K
    pub k: f64,
    /// 覆盖-管理因子 C
    pub c: f64,
    /// 水保措施因子 P
    pub p: f64,
    /// 坡长-坡度因子 LS（RUSLE 使用；USPED 输运不直接使用）
    pub ls: f64,
    /// 汇流面积 A [m²]
    pub area: f64,
    /// 坡度角 β [rad]
    pub beta: f64,
    /// 径流深 Q [mm]
    pub runoff: f64,
}

/// 标量或逐单元因子场
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FactorField {
    /// 全域统一值
    Uniform(f64),
    /// 逐单元栅格
    Grid(RasterGrid),
}

impl FactorField {
    /// 取单元值
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f64 {
        match self {
            Self::Uniform(v) => *v,
            Self::Grid(g) => g.at(x, y),
        }
    }

    /// 栅格型因子的形状检查
    pub fn check_shape(&self, name: &'static str, shape: (usize, usize)) -> TeResult<()> {
        match self {
            Self::Uniform(_) => Ok(()),
            Self::Grid(g) => TeError::check_shape(name, shape, g.shape()),
        }
    }
}

/// 模拟输入因子场
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErosionInputs {
    /// 降雨侵蚀力 R
    pub r: FactorField,
    /// 土壤可蚀性 K
    pub k: FactorField,
    /// 覆盖-管理因子 C
    pub c: FactorField,
    /// 水保措施因子 P
    pub p: FactorField,
    /// 径流深 Q [mm]
    pub runoff: FactorField,
}

impl ErosionInputs {
    /// 全域统一因子
    pub fn uniform(r: f64, k: f64, c: f64, p: f64, runoff: f64) -> Self {
        Self {
            r: FactorField::Uniform(r),
            k: FactorField::Uniform(k),
            c: FactorField::Uniform(c),
            p: FactorField::Uniform(p),
            runoff: FactorField::Uniform(runoff),
        }
    }

    /// 所有栅格型因子的形状检查
    pub fn check_shapes(&self, shape: (usize, usize)) -> TeResult<()> {
        self.r.check_shape("factor R", shape)?;
        self.k.check_shape("factor K", shape)?;
        self.c.check_shape("factor C", shape)?;
        self.p.check_shape("factor P", shape)?;
        self.runoff.check_shape("factor Q", shape)?;
        Ok(())
    }
}

// ============================================================
// 纯函数
// ============================================================

/// 输运能力
///
/// `T = K·C·P·R·Q·A^0.6·sin β^1.3`，结果夹取到 ≥ 0。
/// 负的汇流面积按 0 处理；β ≤ 0 时 sin 项取 0。
pub fn compute_sediment_transport(factors: &FactorBundle) -> f64 {
    let area_term = factors.area.max(0.0).powf(0.6);
    let slope_term = factors.beta.sin().max(0.0).powf(1.3);
    let t = factors.k * factors.c * factors.p * factors.r * factors.runoff * area_term * slope_term;
    t.max(0.0)
}

/// 输运能力散度
///
/// `div = ∂T/∂x·cos θ + ∂T/∂y·sin θ + ε·∂T/∂z·sin β`，
/// θ 为连续流向角 [rad]（即坡向，最陡下降方位，而非量化到
/// 45° 的 D8 编码角），β 为坡度角 [rad]。
/// 允许为负（沉积），此处不做任何夹取。
pub fn compute_divergence(
    dt_dx: f64,
    dt_dy: f64,
    dt_dz: f64,
    flow_direction_rad: f64,
    slope_rad: f64,
    eps: f64,
) -> f64 {
    dt_dx * flow_direction_rad.cos() + dt_dy * flow_direction_rad.sin()
        + eps * dt_dz * slope_rad.sin()
}

/// 前向欧拉高程更新
///
/// `z' = z − (Δt/ρ_b)·div`，不做夹取。
#[inline]
pub fn update_elevation(z: f64, divergence: f64, dt: f64, rho_b: f64) -> f64 {
    z - (dt / rho_b) * divergence
}

// ============================================================
// 引擎
// ============================================================

/// USPED 引擎配置
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UspedConfig {
    /// 时间步长
    pub dt: f64,
    /// 土壤容重 ρ_b [kg/m³]
    pub rho_b: f64,
    /// 垂向散度权重 ε
    pub eps: f64,
    /// 派生量提取配置
    pub derivatives: DerivativeConfig,
}

impl Default for UspedConfig {
    fn default() -> Self {
        Self {
            dt: 1.0,
            rho_b: DEFAULT_BULK_DENSITY,
            eps: DEFAULT_EPSILON_WEIGHT,
            derivatives: DerivativeConfig::default(),
        }
    }
}

impl UspedConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置时间步长
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// 设置土壤容重
    pub fn with_bulk_density(mut self, rho_b: f64) -> Self {
        self.rho_b = rho_b;
        self
    }

    /// 设置垂向散度权重
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// 参数合法性检查
    pub fn validate(&self) -> TeResult<()> {
        if self.rho_b <= 0.0 {
            return Err(TeError::invalid_parameter(
                "rho_b",
                self.rho_b,
                "土壤容重必须为正",
            ));
        }
        if self.dt <= 0.0 {
            return Err(TeError::invalid_parameter("dt", self.dt, "时间步长必须为正"));
        }
        Ok(())
    }
}

/// 侵蚀速率统计
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ErosionStats {
    /// 均值
    pub mean: f64,
    /// 最小值
    pub min: f64,
    /// 最大值
    pub max: f64,
    /// 样本标准差
    pub std: f64,
}

impl ErosionStats {
    /// 从散度栅格的有效单元计算
    fn from_grid(grid: &RasterGrid) -> Self {
        let valid: Vec<f64> = grid
            .data
            .iter()
            .copied()
            .filter(|v| v.is_finite() && !grid.is_nodata(*v))
            .collect();
        if valid.is_empty() {
            return Self {
                mean: 0.0,
                min: 0.0,
                max: 0.0,
                std: 0.0,
            };
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in &valid {
            min = min.min(v);
            max = max.max(v);
        }
        Self {
            mean: mean(&valid),
            min,
            max,
            std: sample_std(&valid),
        }
    }
}

/// 单步结果
///
/// `elevation` 为新栅格，输入高程保持不变。
#[derive(Debug, Clone)]
pub struct SimulationStep {
    /// 更新后的高程
    pub elevation: RasterGrid,
    /// 高程变化量（本步）
    pub delta: RasterGrid,
    /// 输运能力散度（侵蚀速率，正为侵蚀、负为沉积）
    pub divergence: RasterGrid,
    /// 输运能力
    pub transport: RasterGrid,
    /// 侵蚀速率统计
    pub stats: ErosionStats,
}

/// 多步模拟结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    /// 最终高程
    pub elevation: RasterGrid,
    /// 累计高程变化
    pub delta: RasterGrid,
    /// 末步侵蚀速率统计
    pub stats: ErosionStats,
    /// 风险等级面积分解 [m²]（五个等级全覆盖）
    pub risk_breakdown: Vec<(RiskClass, f64)>,
    /// 执行的步数
    pub steps: usize,
    /// 开始时刻
    pub started_at: DateTime<Utc>,
    /// 结束时刻
    pub finished_at: DateTime<Utc>,
}

/// USPED 引擎
///
/// 无内部可变状态；同一引擎可被并发调用。
#[derive(Debug, Clone, Default)]
pub struct UspedEngine {
    config: UspedConfig,
}

impl UspedEngine {
    /// 创建引擎
    pub fn new(config: UspedConfig) -> Self {
        Self { config }
    }

    /// 当前配置
    pub fn config(&self) -> &UspedConfig {
        &self.config
    }

    /// 由因子场与派生量构建输运能力栅格
    fn transport_grid(
        &self,
        dem: &RasterGrid,
        deriv: &TerrainDerivatives,
        inputs: &ErosionInputs,
    ) -> RasterGrid {
        let mut t = dem.zeros_like();
        for y in 0..dem.height {
            for x in 0..dem.width {
                let z = dem.at(x, y);
                if dem.is_nodata(z) {
                    continue;
                }
                let slope_pct = deriv.slope.at(x, y).max(0.0);
                let bundle = FactorBundle {
                    r: inputs.r.at(x, y),
                    k: inputs.k.at(x, y),
                    c: inputs.c.at(x, y),
                    p: inputs.p.at(x, y),
                    ls: deriv.ls_factor.at(x, y),
                    area: deriv.flow_accumulation.at(x, y),
                    beta: (slope_pct / 100.0).atan(),
                    runoff: inputs.runoff.at(x, y),
                };
                t.set(x, y, compute_sediment_transport(&bundle));
            }
        }
        t
    }

    /// 单步前向欧拉步进
    ///
    /// 从当前高程重新派生地形量，返回新的高程栅格。
    /// 调用方负责迭代：下一步必须基于返回的高程再次调用。
    pub fn step(&self, dem: &RasterGrid, inputs: &ErosionInputs) -> TeResult<SimulationStep> {
        self.config.validate()?;
        inputs.check_shapes(dem.shape())?;

        let report = dem.validate();
        if report.has_errors() {
            return Err(TeError::invalid_input(format!(
                "高程栅格含 {} 个非有限单元",
                report.error_count()
            )));
        }

        let deriv = TerrainDerivatives::from_dem(dem, &self.config.derivatives)?;
        let transport = self.transport_grid(dem, &deriv, inputs);

        let mut divergence = dem.zeros_like();
        let mut elevation = dem.clone();
        let mut delta = dem.zeros_like();
        let two_cell = 2.0 * dem.cell_size;

        for y in 0..dem.height {
            for x in 0..dem.width {
                let z = dem.at(x, y);
                if dem.is_nodata(z) {
                    divergence.set(x, y, 0.0);
                    continue;
                }

                // 中心差分（边缘复制延拓）
                let dt_dx = (transport.at_clamped(x as isize + 1, y as isize)
                    - transport.at_clamped(x as isize - 1, y as isize))
                    / two_cell;
                let dt_dy = (transport.at_clamped(x as isize, y as isize + 1)
                    - transport.at_clamped(x as isize, y as isize - 1))
                    / two_cell;

                // 沿最陡下降方向的垂向梯度，落差过小时取 0
                let dt_dz = match deriv.flow_direction.downstream(x, y) {
                    Some((nx, ny)) => {
                        let dz = z - dem.at(nx, ny);
                        if dz > SAFE_DIV_EPSILON {
                            (transport.at(nx, ny) - transport.at(x, y)) / dz
                        } else {
                            0.0
                        }
                    }
                    None => 0.0,
                };

                let theta = deriv.aspect.at(x, y).to_radians();
                let beta = (deriv.slope.at(x, y).max(0.0) / 100.0).atan();
                let div = compute_divergence(dt_dx, dt_dy, dt_dz, theta, beta, self.config.eps);

                let z_new = update_elevation(z, div, self.config.dt, self.config.rho_b);
                divergence.set(x, y, div);
                elevation.set(x, y, z_new);
                delta.set(x, y, z_new - z);
            }
        }

        let stats = ErosionStats::from_grid(&divergence);
        Ok(SimulationStep {
            elevation,
            delta,
            divergence,
            transport,
            stats,
        })
    }

    /// 多步模拟
    ///
    /// 每步对**当前**高程重新派生地形量后步进，并在最终高程上
    /// 以 RUSLE 年土壤流失估计做风险等级面积分解。
    pub fn simulate(
        &self,
        dem: &RasterGrid,
        inputs: &ErosionInputs,
        n_steps: usize,
    ) -> TeResult<SimulationResult> {
        if n_steps == 0 {
            return Err(TeError::invalid_parameter(
                "n_steps",
                0.0,
                "模拟至少需要一步",
            ));
        }
        let started_at = Utc::now();

        let mut current = dem.clone();
        let mut last_step: Option<SimulationStep> = None;
        for _ in 0..n_steps {
            let step = self.step(&current, inputs)?;
            current = step.elevation.clone();
            last_step = Some(step);
        }
        // n_steps ≥ 1 保证循环至少执行一次
        let last = last_step.ok_or_else(|| TeError::internal("模拟未执行任何步"))?;

        let mut delta = dem.zeros_like();
        for i in 0..delta.data.len() {
            let before = dem.data[i];
            let after = current.data[i];
            if !dem.is_nodata(before) && !current.is_nodata(after) {
                delta.data[i] = after - before;
            }
        }

        let deriv = TerrainDerivatives::from_dem(&current, &self.config.derivatives)?;
        let rusle = compute_rusle_grid(&deriv.ls_factor, inputs)?;
        let risk_breakdown = risk_area_breakdown(&rusle);

        let finished_at = Utc::now();
        Ok(SimulationResult {
            elevation: current,
            delta,
            stats: last.stats,
            risk_breakdown,
            steps: n_steps,
            started_at,
            finished_at,
        })
    }
}

// ============================================================
// 测试
// ============================================================
