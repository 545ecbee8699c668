// crates/te_erosion/src/factors.rs

//! 侵蚀因子计算
//!
//! - [`compute_runoff`]: SCS 曲线数径流深
//! - [`compute_rainfall_erosivity`]: 降雨侵蚀力 R 因子
//! - [`compute_k_factor`]: USLE 诺谟图土壤可蚀性 K 因子
//! - [`cover_factor`] / [`practice_factor`]: 覆盖与水保措施查找表
//!
//! 非物理输入在局部以保守默认值恢复并记录日志，
//! 不向上抛出错误（见基础层错误设计）。查找表是进程级
//! 不可变常量，以 `match` 实现，绝不使用可变全局状态。

use te_foundation::float::SAFE_DIV_EPSILON;

/// K 因子计算失败时的保守默认值
pub const K_FACTOR_DEFAULT: f64 = 0.2;

// ============================================================
// SCS-CN 径流
// ============================================================

/// SCS 曲线数法径流深 [mm]
///
/// `S = max(25400/max(CN,1) − 254, 0)`，初损 `Ia = 0.2·S`；
/// 降雨不超过初损时径流为 0，否则
/// `Q = (P − Ia)² / (P − Ia + S)`，下限 0。
///
/// 对固定 CN，Q 随降雨单调不减；`compute_runoff(0, cn) == 0`。
pub fn compute_runoff(rainfall_mm: f64, curve_number: f64) -> f64 {
    if rainfall_mm <= 0.0 {
        return 0.0;
    }
    if curve_number <= 0.0 {
        log::warn!("曲线数 {} 非正，按 1 处理", curve_number);
    }
    let cn = curve_number.max(1.0);
    let s = (25400.0 / cn - 254.0).max(0.0);
    let ia = 0.2 * s;
    if rainfall_mm <= ia {
        return 0.0;
    }
    let excess = rainfall_mm - ia;
    (excess * excess / (excess + s)).max(0.0)
}

// ============================================================
// 降雨侵蚀力
// ============================================================

/// 降雨侵蚀力 R 因子
///
/// `R = 0.0483·P^1.61 · (1 + (P_day/P)·0.1)`，
/// `P` 为年降雨量 [mm]，`P_day` 为最大日降雨量 [mm]。
/// 年降雨量非正时返回 0。
pub fn compute_rainfall_erosivity(annual_rainfall_mm: f64, max_daily_rainfall_mm: f64) -> f64 {
    if annual_rainfall_mm <= SAFE_DIV_EPSILON {
        return 0.0;
    }
    let daily_ratio = (max_daily_rainfall_mm.max(0.0) / annual_rainfall_mm) * 0.1;
    0.0483 * annual_rainfall_mm.powf(1.61) * (1.0 + daily_ratio)
}

// ============================================================
// 土壤可蚀性 K 因子
// ============================================================

/// 土壤结构编码查找
///
/// {1: 0.25, 2: 0.35, 3: 0.5, 4: 1.0}；未知编码按 1.0 处理并记录警告。
pub fn structure_factor(structure_code: u8) -> f64 {
    match structure_code {
        1 => 0.25,
        2 => 0.35,
        3 => 0.5,
        4 => 1.0,
        other => {
            log::warn!("未知土壤结构编码 {}，按 1.0 处理", other);
            1.0
        }
    }
}

/// USLE 诺谟图土壤可蚀性 K 因子
///
/// 粒径参数 `M = (silt + sand)·(100 − clay)`，有机质修正
/// `(12 − OM)/100`，结构编码查表后按经验式组合：
///
/// `K = 2.1e-4 · M^1.14 · (12 − OM)/100 · f_struct`
///
/// 结果下限 0；任一中间量非有限时退回保守默认值
/// [`K_FACTOR_DEFAULT`] 并记录警告。百分比输入夹取到 [0, 100]，
/// 有机质夹取到 [0, 12]。
pub fn compute_k_factor(
    sand_pct: f64,
    silt_pct: f64,
    clay_pct: f64,
    organic_matter_pct: f64,
    structure_code: u8,
) -> f64 {
    let sand = sand_pct.clamp(0.0, 100.0);
    let silt = silt_pct.clamp(0.0, 100.0);
    let clay = clay_pct.clamp(0.0, 100.0);
    if organic_matter_pct < 0.0 {
        log::warn!("有机质含量 {} 为负，按 0 处理", organic_matter_pct);
    }
    let om = organic_matter_pct.clamp(0.0, 12.0);

    let m = (silt + sand) * (100.0 - clay);
    let om_factor = (12.0 - om) / 100.0;
    let k = 2.1e-4 * m.powf(1.14) * om_factor * structure_factor(structure_code);

    if !k.is_finite() {
        log::warn!(
            "K 因子计算产生非有限值 (sand={}, silt={}, clay={}, om={})，退回默认值 {}",
            sand_pct,
            silt_pct,
            clay_pct,
            organic_matter_pct,
            K_FACTOR_DEFAULT
        );
        return K_FACTOR_DEFAULT;
    }
    k.max(0.0)
}

// ============================================================
// 覆盖与水保措施查找表
// ============================================================

/// 覆盖-管理 C 因子查找
///
/// 进程级常量表；未知类别退回 0.5 并记录警告。
pub fn cover_factor(land_cover: &str) -> f64 {
    match land_cover.to_lowercase().replace([' ', '-'], "_").as_str() {
        "forest" => 0.001,
        "dense_shrubland" | "shrubland" => 0.05,
        "grassland" | "pasture" => 0.01,
        "cropland" | "agriculture" => 0.3,
        "orchard" => 0.15,
        "urban" | "built_up" => 0.01,
        "water" => 0.0,
        "bare_soil" | "bare" => 0.95,
        other => {
            log::warn!("未知土地覆盖类别 '{}'，C 因子按 0.5 处理", other);
            0.5
        }
    }
}

/// 按归一化植被指数缩放的 C 因子
///
/// `ndvi` 夹取到 [0, 1]；植被越茂密 C 越小，`ndvi = 1` 时为 0。
pub fn cover_factor_with_ndvi(land_cover: &str, ndvi: f64) -> f64 {
    cover_factor(land_cover) * (1.0 - ndvi.clamp(0.0, 1.0))
}

/// 水保措施 P 因子查找
///
/// 从 1.0（无措施）到 0.1（完整水保措施）；
/// 未知类别退回 1.0 并记录警告。
pub fn practice_factor(practice: &str) -> f64 {
    match practice.to_lowercase().replace([' ', '-'], "_").as_str() {
        "none" => 1.0,
        "contouring" | "contour" => 0.5,
        "strip_cropping" => 0.35,
        "terracing" | "terrace" => 0.15,
        "conservation" => 0.1,
        other => {
            log::warn!("未知水保措施 '{}'，P 因子按 1.0 处理", other);
            1.0
        }
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runoff_zero_rainfall() {
        for cn in [1.0, 50.0, 80.0, 100.0] {
            assert_eq!(compute_runoff(0.0, cn), 0.0);
        }
    }

    #[test]
    fn test_runoff_below_initial_abstraction() {
        // CN=70: S = 25400/70 - 254 ≈ 108.857, Ia ≈ 21.77
        assert_eq!(compute_runoff(20.0, 70.0), 0.0);
    }

    #[test]
    fn test_runoff_hand_value() {
        // CN=80: S = 25400/80 - 254 = 63.5, Ia = 12.7
        // P=100: Q = 87.3² / (87.3 + 63.5)
        let expected = 87.3f64 * 87.3 / (87.3 + 63.5);
        assert!((compute_runoff(100.0, 80.0) - expected).abs() < 1e-10);
    }

    #[test]
    fn test_runoff_monotonic_in_rainfall() {
        let mut last = 0.0;
        for p in 1..200 {
            let q = compute_runoff(p as f64, 75.0);
            assert!(q >= last, "P={} 时径流下降", p);
            last = q;
        }
    }

    #[test]
    fn test_runoff_invalid_cn_clamped() {
        // CN ≤ 0 夹取到 1：S 巨大，小雨不产流
        assert_eq!(compute_runoff(50.0, 0.0), 0.0);
        assert_eq!(compute_runoff(50.0, -10.0), 0.0);
    }

    #[test]
    fn test_erosivity_hand_value() {
        // 规范参照: P=2000, P_day=150
        let expected = 0.0483 * 2000.0f64.powf(1.61) * (1.0 + (150.0 / 2000.0) * 0.1);
        let r = compute_rainfall_erosivity(2000.0, 150.0);
        assert!((r - expected).abs() < 1e-9 * expected);
    }

    #[test]
    fn test_erosivity_zero_annual() {
        assert_eq!(compute_rainfall_erosivity(0.0, 50.0), 0.0);
        assert_eq!(compute_rainfall_erosivity(-100.0, 50.0), 0.0);
    }

    #[test]
    fn test_structure_lookup() {
        assert_eq!(structure_factor(1), 0.25);
        assert_eq!(structure_factor(2), 0.35);
        assert_eq!(structure_factor(3), 0.5);
        assert_eq!(structure_factor(4), 1.0);
        assert_eq!(structure_factor(9), 1.0);
    }

    #[test]
    fn test_k_factor_nonnegative() {
        let k = compute_k_factor(40.0, 40.0, 20.0, 2.0, 2);
        assert!(k >= 0.0);
        assert!(k.is_finite());
    }

    #[test]
    fn test_k_factor_hand_value() {
        // M = (40+40)·(100−20) = 6400
        let m: f64 = 6400.0;
        let expected = 2.1e-4 * m.powf(1.14) * (12.0 - 2.0) / 100.0 * 0.35;
        let k = compute_k_factor(40.0, 40.0, 20.0, 2.0, 2);
        assert!((k - expected).abs() < 1e-12);
    }

    #[test]
    fn test_k_factor_clay_reduces_m() {
        // 黏粒越多 M 越小，K 越小
        let sandy = compute_k_factor(60.0, 30.0, 10.0, 2.0, 2);
        let clayey = compute_k_factor(30.0, 20.0, 50.0, 2.0, 2);
        assert!(clayey < sandy);
    }

    #[test]
    fn test_k_factor_negative_om_clamped() {
        let k = compute_k_factor(40.0, 40.0, 20.0, -5.0, 2);
        let k0 = compute_k_factor(40.0, 40.0, 20.0, 0.0, 2);
        assert_eq!(k, k0);
    }

    #[test]
    fn test_cover_lookup() {
        assert_eq!(cover_factor("forest"), 0.001);
        assert_eq!(cover_factor("bare_soil"), 0.95);
        assert_eq!(cover_factor("Bare Soil"), 0.95);
        assert_eq!(cover_factor("unknown_class"), 0.5);
    }

    #[test]
    fn test_cover_ndvi_scaling() {
        let c = cover_factor("cropland");
        assert_eq!(cover_factor_with_ndvi("cropland", 0.0), c);
        assert_eq!(cover_factor_with_ndvi("cropland", 1.0), 0.0);
        assert!((cover_factor_with_ndvi("cropland", 0.5) - c * 0.5).abs() < 1e-12);
        // NDVI 越界夹取
        assert_eq!(cover_factor_with_ndvi("cropland", 2.0), 0.0);
    }

    #[test]
    fn test_practice_lookup() {
        assert_eq!(practice_factor("none"), 1.0);
        assert_eq!(practice_factor("conservation"), 0.1);
        assert_eq!(practice_factor("Strip Cropping"), 0.35);
        assert_eq!(practice_factor("whatever"), 1.0);
    }
}
