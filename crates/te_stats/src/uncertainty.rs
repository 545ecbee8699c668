// crates/te_stats/src/uncertainty.rs

//! 不确定性与敏感性分析
//!
//! VaR / CVaR 风险度量、参数抽样的蒙特卡洛传播，
//! 以及一次一因子（OAT）敏感性指数。
//!
//! 蒙特卡洛使用 ChaCha8 固定种子流，结果可复现；
//! 各次试验相互独立，调用方可自行按独立种子并行。

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use te_foundation::error::{TeError, TeResult};
use te_foundation::float::{mean, percentile_sorted, sample_std, SAFE_DIV_EPSILON};

/// 蒙特卡洛原始输出样本上限
const MAX_OUTPUT_SAMPLE: usize = 1000;

/// 风险价值 VaR
///
/// 取分布上尾 `confidence·100` 百分位，超越概率为
/// `1 − confidence`，因此置信水平越高 VaR 越大。
/// 非有限值被剔除；有效样本为空或置信水平出界时返回错误。
pub fn compute_var(values: &[f64], confidence: f64) -> TeResult<f64> {
    check_confidence(confidence)?;
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Err(TeError::insufficient_data("compute_var", 1, 0));
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Ok(percentile_sorted(&sorted, confidence * 100.0))
}

/// 条件风险价值 CVaR
///
/// 不低于 VaR 的尾部样本均值；尾部为空时退化为 VaR 本身。
pub fn compute_cvar(values: &[f64], confidence: f64) -> TeResult<f64> {
    let var = compute_var(values, confidence)?;
    let tail: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v >= var)
        .collect();
    if tail.is_empty() {
        Ok(var)
    } else {
        Ok(mean(&tail))
    }
}

fn check_confidence(confidence: f64) -> TeResult<()> {
    if !confidence.is_finite() || confidence <= 0.0 || confidence >= 1.0 {
        return Err(TeError::out_of_range("confidence", confidence, 0.0, 1.0));
    }
    Ok(())
}

/// 参数分布描述（正态）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDistribution {
    /// 参数名
    pub name: String,
    /// 均值
    pub mean: f64,
    /// 标准差，非正时退化为定值抽样
    pub std_dev: f64,
}

impl ParameterDistribution {
    /// 便捷构造
    pub fn new(name: impl Into<String>, mean: f64, std_dev: f64) -> Self {
        Self {
            name: name.into(),
            mean,
            std_dev,
        }
    }
}

/// 不确定性报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UncertaintyReport {
    /// 输出均值
    pub mean: f64,
    /// 输出标准差
    pub std_dev: f64,
    /// 最小输出
    pub min: f64,
    /// 最大输出
    pub max: f64,
    /// 中位数
    pub median: f64,
    /// 第 5 百分位
    pub p5: f64,
    /// 第 95 百分位
    pub p95: f64,
    /// 95% 置信水平的 VaR
    pub var_95: f64,
    /// 95% 置信水平的 CVaR
    pub cvar_95: f64,
    /// 置信水平
    pub confidence: f64,
    /// 试验次数
    pub n_simulations: usize,
    /// 原始输出样本（最多 MAX_OUTPUT_SAMPLE 个）
    pub output_sample: Vec<f64>,
    /// 生成时间
    pub generated_at: DateTime<Utc>,
}

/// 蒙特卡洛不确定性传播
///
/// 每次试验对全部参数按 `Normal(mean, std)` 独立抽样并调用
/// `erosion_fn`，参数顺序与 `distributions` 一致。
/// `std_dev ≤ 0` 的参数按定值处理。试验产生的非有限输出被
/// 剔除并记录警告；全部剔除时返回错误。
pub fn monte_carlo_uncertainty<F>(
    erosion_fn: F,
    distributions: &[ParameterDistribution],
    n_simulations: usize,
    seed: u64,
) -> TeResult<UncertaintyReport>
where
    F: Fn(&[f64]) -> f64,
{
    if n_simulations == 0 {
        return Err(TeError::insufficient_data("monte_carlo_uncertainty", 1, 0));
    }
    if distributions.is_empty() {
        return Err(TeError::invalid_input("蒙特卡洛参数分布列表为空"));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let samplers: Vec<Option<Normal<f64>>> = distributions
        .iter()
        .map(|d| {
            if d.std_dev > 0.0 {
                // 均值与标准差已检查有限性时 Normal::new 不会失败
                Normal::new(d.mean, d.std_dev).ok()
            } else {
                None
            }
        })
        .collect();

    let mut outputs = Vec::with_capacity(n_simulations);
    let mut params = vec![0.0; distributions.len()];
    let mut dropped = 0usize;
    for _ in 0..n_simulations {
        for (i, dist) in distributions.iter().enumerate() {
            params[i] = match &samplers[i] {
                Some(normal) => normal.sample(&mut rng),
                None => dist.mean,
            };
        }
        let out = erosion_fn(&params);
        if out.is_finite() {
            outputs.push(out);
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        log::warn!("蒙特卡洛剔除 {} 次非有限输出", dropped);
    }
    if outputs.is_empty() {
        return Err(TeError::insufficient_data(
            "monte_carlo_uncertainty",
            1,
            0,
        ));
    }

    let mut sorted = outputs.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let confidence = 0.95;
    let var_95 = percentile_sorted(&sorted, confidence * 100.0);
    let cvar_95 = compute_cvar(&outputs, confidence)?;

    let output_sample = if outputs.len() > MAX_OUTPUT_SAMPLE {
        outputs[..MAX_OUTPUT_SAMPLE].to_vec()
    } else {
        outputs.clone()
    };

    Ok(UncertaintyReport {
        mean: mean(&outputs),
        std_dev: sample_std(&outputs),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        median: percentile_sorted(&sorted, 50.0),
        p5: percentile_sorted(&sorted, 5.0),
        p95: percentile_sorted(&sorted, 95.0),
        var_95,
        cvar_95,
        confidence,
        n_simulations,
        output_sample,
        generated_at: Utc::now(),
    })
}

/// 单参数敏感性
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityEntry {
    /// 参数名
    pub name: String,
    /// 敏感性指数（相对输出变化 / 相对输入变化）
    pub index: f64,
    /// 基线输出
    pub base_output: f64,
    /// −X% 扰动下的输出
    pub output_low: f64,
    /// +X% 扰动下的输出
    pub output_high: f64,
}

/// 一次一因子敏感性分析
///
/// 每个参数独立做 ±`perturbation_percent`% 扰动，其余参数保持
/// 基线，指数为中心差分的相对变化率。基线输出接近零时指数按
/// 绝对变化计。结果按调用方给定的参数顺序返回，排序交由
/// [`rank_by_magnitude`]。
pub fn sensitivity_analysis<F>(
    names: &[&str],
    base_values: &[f64],
    erosion_fn: F,
    perturbation_percent: f64,
) -> TeResult<Vec<SensitivityEntry>>
where
    F: Fn(&[f64]) -> f64,
{
    TeError::check_size("sensitivity names", names.len(), base_values.len())?;
    if base_values.is_empty() {
        return Err(TeError::invalid_input("敏感性分析参数列表为空"));
    }
    if !perturbation_percent.is_finite() || perturbation_percent <= 0.0 {
        return Err(TeError::invalid_parameter(
            "perturbation_percent",
            perturbation_percent,
            "扰动幅度必须为正",
        ));
    }

    let base_output = erosion_fn(base_values);
    let frac = perturbation_percent / 100.0;
    let mut entries = Vec::with_capacity(base_values.len());
    let mut work = base_values.to_vec();
    for (i, &base) in base_values.iter().enumerate() {
        work[i] = base * (1.0 - frac);
        let output_low = erosion_fn(&work);
        work[i] = base * (1.0 + frac);
        let output_high = erosion_fn(&work);
        work[i] = base;

        // 中心差分: Δ输出相对量 / Δ输入相对量 (2·frac)
        let delta = output_high - output_low;
        let index = if base_output.abs() > SAFE_DIV_EPSILON {
            (delta / base_output.abs()) / (2.0 * frac)
        } else {
            delta / (2.0 * frac)
        };
        entries.push(SensitivityEntry {
            name: names[i].to_string(),
            index,
            base_output,
            output_low,
            output_high,
        });
    }
    Ok(entries)
}

/// 按指数绝对值降序排列
pub fn rank_by_magnitude(mut entries: Vec<SensitivityEntry>) -> Vec<SensitivityEntry> {
    entries.sort_by(|a, b| {
        b.index
            .abs()
            .partial_cmp(&a.index.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries
}

// ============================================================
// 测试
// ============================================================
