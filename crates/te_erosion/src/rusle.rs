// crates/te_erosion/src/rusle.rs

//! RUSLE 参照计算与侵蚀风险分级
//!
//! 独立于 USPED 管线的年土壤流失估计 `A = R·K·LS·C·P`
//! [Mg·ha⁻¹·yr⁻¹]，以及基于阈值的风险分级。
//!
//! 风险等级在 [0, ∞) 上互斥且完备：
//!
//! | 年流失量 | 等级 | 紧迫度 |
//! |---------|------|-------|
//! | < 2     | 极低 | 1 |
//! | [2, 5)  | 低   | 2 |
//! | [5, 10) | 中   | 3 |
//! | [10, 20)| 高   | 4 |
//! | ≥ 20    | 极高 | 5 |

use crate::usped::ErosionInputs;
use serde::{Deserialize, Serialize};
use te_foundation::error::TeResult;
use te_terrain::grid::RasterGrid;

/// RUSLE 年土壤流失量 [Mg·ha⁻¹·yr⁻¹]
///
/// `A = R·K·LS·C·P`。与 USPED 管线完全独立，用于交叉验证。
#[inline]
pub fn compute_rusle(r: f64, k: f64, ls: f64, c: f64, p: f64) -> f64 {
    r * k * ls * c * p
}

/// 侵蚀风险等级
///
/// 阈值有序不重叠，对非负输入完备；紧迫度随流失量单调不减。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClass {
    /// 极低 (< 2)
    VeryLow,
    /// 低 [2, 5)
    Low,
    /// 中 [5, 10)
    Moderate,
    /// 高 [10, 20)
    High,
    /// 极高 (≥ 20)
    VeryHigh,
}

impl RiskClass {
    /// 全部等级，按紧迫度升序
    pub const ALL: [RiskClass; 5] = [
        RiskClass::VeryLow,
        RiskClass::Low,
        RiskClass::Moderate,
        RiskClass::High,
        RiskClass::VeryHigh,
    ];

    /// 等级描述
    pub fn description(self) -> &'static str {
        match self {
            Self::VeryLow => "侵蚀极轻微，无需干预",
            Self::Low => "侵蚀轻微，常规监测即可",
            Self::Moderate => "侵蚀中等，建议采取水保措施",
            Self::High => "侵蚀严重，应尽快采取水保措施",
            Self::VeryHigh => "侵蚀极严重，需立即干预",
        }
    }

    /// 紧迫度等级 1-5
    pub fn urgency(self) -> u8 {
        match self {
            Self::VeryLow => 1,
            Self::Low => 2,
            Self::Moderate => 3,
            Self::High => 4,
            Self::VeryHigh => 5,
        }
    }
}

/// 风险分级
///
/// 对任意非负年流失量全覆盖；负输入按 0 处理（极低）。
pub fn classify_erosion_risk(annual_soil_loss: f64) -> RiskClass {
    let a = annual_soil_loss.max(0.0);
    if a < 2.0 {
        RiskClass::VeryLow
    } else if a < 5.0 {
        RiskClass::Low
    } else if a < 10.0 {
        RiskClass::Moderate
    } else if a < 20.0 {
        RiskClass::High
    } else {
        RiskClass::VeryHigh
    }
}

/// 由 LS 栅格与因子场计算 RUSLE 栅格
///
/// LS 无数据单元输出无数据值。
pub fn compute_rusle_grid(ls: &RasterGrid, inputs: &ErosionInputs) -> TeResult<RasterGrid> {
    inputs.check_shapes(ls.shape())?;
    let mut out = ls.zeros_like();
    for y in 0..ls.height {
        for x in 0..ls.width {
            let l = ls.at(x, y);
            if ls.is_nodata(l) {
                out.set(x, y, out.nodata);
                continue;
            }
            out.set(
                x,
                y,
                compute_rusle(
                    inputs.r.at(x, y),
                    inputs.k.at(x, y),
                    l,
                    inputs.c.at(x, y),
                    inputs.p.at(x, y),
                ),
            );
        }
    }
    Ok(out)
}

/// 风险等级面积分解 [m²]
///
/// 对五个等级全覆盖（无单元的等级报告 0）；无数据单元不计入。
pub fn risk_area_breakdown(rusle: &RasterGrid) -> Vec<(RiskClass, f64)> {
    let cell_area = rusle.cell_size * rusle.cell_size;
    let mut areas = [0.0f64; 5];
    for &a in &rusle.data {
        if a.is_finite() && !rusle.is_nodata(a) {
            let class = classify_erosion_risk(a);
            areas[(class.urgency() - 1) as usize] += cell_area;
        }
    }
    RiskClass::ALL
        .iter()
        .zip(areas)
        .map(|(&c, a)| (c, a))
        .collect()
}

// ============================================================
// 测试
// ============================================================
