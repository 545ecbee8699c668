// crates/te_terrain/src/hydrology.rs

//! 水文派生量：洼地填充、D8 流向与汇流累积
//!
//! - [`fill_sinks`]: 形态学闭运算迭代消除小尺度洼地
//! - [`compute_flow_direction`]: D8 最陡下降流向，幂次编码
//! - [`compute_flow_accumulation`]: 基于显式单元图的拓扑序汇流累积
//!
//! # D8 编码
//!
//! 固定的 2 的幂编码（顺时针自东起）：
//!
//! ```text
//! 32  64  128
//! 16   0    1
//!  8   4    2
//! ```
//!
//! 0 表示无可解析的下坡邻居（局部洼地或边界单元）。

use crate::grid::RasterGrid;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use te_foundation::error::{TeError, TeResult};

/// 合法的 D8 编码集合（含 0）
pub const D8_CODES: [u8; 9] = [0, 1, 2, 4, 8, 16, 32, 64, 128];

/// D8 流向
///
/// 八个方向的固定扫描顺序即枚举声明顺序，平局时先扫描到的方向获胜。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum D8Direction {
    /// 东
    East,
    /// 东南
    SouthEast,
    /// 南
    South,
    /// 西南
    SouthWest,
    /// 西
    West,
    /// 西北
    NorthWest,
    /// 北
    North,
    /// 东北
    NorthEast,
}

impl D8Direction {
    /// 全部方向，按固定扫描顺序
    pub const ALL: [D8Direction; 8] = [
        D8Direction::East,
        D8Direction::SouthEast,
        D8Direction::South,
        D8Direction::SouthWest,
        D8Direction::West,
        D8Direction::NorthWest,
        D8Direction::North,
        D8Direction::NorthEast,
    ];

    /// 幂次编码
    #[inline]
    pub fn code(self) -> u8 {
        match self {
            Self::East => 1,
            Self::SouthEast => 2,
            Self::South => 4,
            Self::SouthWest => 8,
            Self::West => 16,
            Self::NorthWest => 32,
            Self::North => 64,
            Self::NorthEast => 128,
        }
    }

    /// 从编码解析（0 与非法编码返回 None）
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::East),
            2 => Some(Self::SouthEast),
            4 => Some(Self::South),
            8 => Some(Self::SouthWest),
            16 => Some(Self::West),
            32 => Some(Self::NorthWest),
            64 => Some(Self::North),
            128 => Some(Self::NorthEast),
            _ => None,
        }
    }

    /// 邻居偏移 (dx, dy)，y 轴向南为正
    #[inline]
    pub fn offset(self) -> (isize, isize) {
        match self {
            Self::East => (1, 0),
            Self::SouthEast => (1, 1),
            Self::South => (0, 1),
            Self::SouthWest => (-1, 1),
            Self::West => (-1, 0),
            Self::NorthWest => (-1, -1),
            Self::North => (0, -1),
            Self::NorthEast => (1, -1),
        }
    }

    /// 到邻居的距离因子（对角 √2，正向 1）
    #[inline]
    pub fn distance_factor(self) -> f64 {
        match self {
            Self::SouthEast | Self::SouthWest | Self::NorthWest | Self::NorthEast => {
                std::f64::consts::SQRT_2
            }
            _ => 1.0,
        }
    }
}

/// D8 流向栅格
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDirectionGrid {
    /// 编码（行优先），取值限于 [`D8_CODES`]
    pub codes: Vec<u8>,
    /// 宽度
    pub width: usize,
    /// 高度
    pub height: usize,
}

impl FlowDirectionGrid {
    /// 获取编码
    #[inline]
    pub fn code(&self, x: usize, y: usize) -> u8 {
        self.codes[y * self.width + x]
    }

    /// 获取方向（编码 0 返回 None）
    #[inline]
    pub fn direction(&self, x: usize, y: usize) -> Option<D8Direction> {
        D8Direction::from_code(self.code(x, y))
    }

    /// 下游邻居坐标（编码 0 或流出栅格外返回 None）
    pub fn downstream(&self, x: usize, y: usize) -> Option<(usize, usize)> {
        let dir = self.direction(x, y)?;
        let (dx, dy) = dir.offset();
        let nx = x as isize + dx;
        let ny = y as isize + dy;
        if nx < 0 || ny < 0 || nx >= self.width as isize || ny >= self.height as isize {
            None
        } else {
            Some((nx as usize, ny as usize))
        }
    }
}

// ============================================================================
// 洼地填充
// ============================================================================

/// 3×3 邻域最小值滤波（不含中心，边缘复制延拓）
fn neighborhood_min(dem: &RasterGrid, x: usize, y: usize) -> f64 {
    let mut min = f64::INFINITY;
    for dir in D8Direction::ALL {
        let (dx, dy) = dir.offset();
        let v = dem.at_clamped(x as isize + dx, y as isize + dy);
        if !dem.is_nodata(v) && v < min {
            min = v;
        }
    }
    min
}

/// 洼地填充
///
/// 每次迭代对每个单元取 8 邻域最小值，再与当前值取最大：
/// 低于全部邻居的单元被抬升到邻域最低点，消除单像元洼地。
/// 确定性，迭代次数有界。
pub fn fill_sinks(dem: &RasterGrid, iterations: usize) -> RasterGrid {
    let mut current = dem.clone();
    for _ in 0..iterations {
        let mut next = current.clone();
        for y in 0..current.height {
            for x in 0..current.width {
                let z = current.at(x, y);
                if current.is_nodata(z) {
                    continue;
                }
                let nmin = neighborhood_min(&current, x, y);
                if nmin.is_finite() && nmin > z {
                    next.set(x, y, nmin);
                }
            }
        }
        current = next;
    }
    current
}

// ============================================================================
// D8 流向
// ============================================================================

/// 计算 D8 流向
///
/// 每个内部单元在 8 个邻居中选择距离加权落差最大的方向，
/// 落差须严格为正；平局按固定扫描顺序取先扫描到的方向。
/// 边界单元、无数据单元与局部洼地编码为 0。
pub fn compute_flow_direction(dem: &RasterGrid) -> FlowDirectionGrid {
    let mut codes = vec![0u8; dem.len()];
    if dem.width < 3 || dem.height < 3 {
        return FlowDirectionGrid {
            codes,
            width: dem.width,
            height: dem.height,
        };
    }

    for y in 1..dem.height - 1 {
        for x in 1..dem.width - 1 {
            let z = dem.at(x, y);
            if dem.is_nodata(z) {
                continue;
            }
            let mut best_drop = 0.0;
            let mut best: Option<D8Direction> = None;
            for dir in D8Direction::ALL {
                let (dx, dy) = dir.offset();
                let nz = dem.at((x as isize + dx) as usize, (y as isize + dy) as usize);
                if dem.is_nodata(nz) {
                    continue;
                }
                let drop = (z - nz) / (dir.distance_factor() * dem.cell_size);
                // 严格大于：平局保留先扫描到的方向
                if drop > best_drop {
                    best_drop = drop;
                    best = Some(dir);
                }
            }
            if let Some(dir) = best {
                codes[y * dem.width + x] = dir.code();
            }
        }
    }

    FlowDirectionGrid {
        codes,
        width: dem.width,
        height: dem.height,
    }
}

// ============================================================================
// 汇流累积
// ============================================================================

/// 计算汇流面积
///
/// 在显式的单元有向图上做拓扑序（Kahn 队列）汇流：统计每个单元的
/// 入度，自零入度单元起沿流向向下游推送累计数。计数包含单元自身，
/// 乘以 `cell_size²` 转换为面积 [m²]。
///
/// D8 流向基于严格落差，图中不存在环；编码为 0 的单元只吸收不外排。
pub fn compute_flow_accumulation(
    dem: &RasterGrid,
    flow_dir: &FlowDirectionGrid,
) -> TeResult<RasterGrid> {
    TeError::check_shape(
        "flow_direction",
        dem.shape(),
        (flow_dir.width, flow_dir.height),
    )?;

    let n = dem.len();
    // 下游邻接表与入度（索引即单元，无指针链接）
    let mut downstream: Vec<Option<usize>> = vec![None; n];
    let mut indegree = vec![0u32; n];

    for y in 0..dem.height {
        for x in 0..dem.width {
            if let Some((nx, ny)) = flow_dir.downstream(x, y) {
                let from = dem.index(x, y);
                let to = dem.index(nx, ny);
                downstream[from] = Some(to);
                indegree[to] += 1;
            }
        }
    }

    // 单元自身贡献 1 个计数
    let mut counts = vec![1.0f64; n];
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut processed = 0usize;

    while let Some(i) = queue.pop_front() {
        processed += 1;
        if let Some(j) = downstream[i] {
            counts[j] += counts[i];
            indegree[j] -= 1;
            if indegree[j] == 0 {
                queue.push_back(j);
            }
        }
    }

    // 严格落差流向不成环；残留未处理单元说明编码被破坏
    if processed != n {
        return Err(TeError::internal(format!(
            "汇流图存在环: {} / {} 个单元未处理",
            n - processed,
            n
        )));
    }

    let area = dem.cell_size * dem.cell_size;
    let mut out = dem.zeros_like();
    for (i, &c) in counts.iter().enumerate() {
        out.data[i] = c * area;
    }
    Ok(out)
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// 自西向东下降的 5×5 斜面
    fn eastward_slope() -> RasterGrid {
        let mut data = Vec::with_capacity(25);
        for _y in 0..5 {
            for x in 0..5 {
                data.push(10.0 - x as f64);
            }
        }
        RasterGrid::from_data(data, 5, 5, 10.0).unwrap()
    }

    #[test]
    fn test_codes_in_valid_set() {
        let dem = eastward_slope();
        let fd = compute_flow_direction(&dem);
        for &code in &fd.codes {
            assert!(D8_CODES.contains(&code), "非法编码 {}", code);
        }
    }

    #[test]
    fn test_eastward_slope_flows_east() {
        let dem = eastward_slope();
        let fd = compute_flow_direction(&dem);
        for y in 1..4 {
            for x in 1..4 {
                assert_eq!(fd.code(x, y), D8Direction::East.code());
            }
        }
    }

    #[test]
    fn test_boundary_cells_are_zero() {
        let dem = eastward_slope();
        let fd = compute_flow_direction(&dem);
        for x in 0..5 {
            assert_eq!(fd.code(x, 0), 0);
            assert_eq!(fd.code(x, 4), 0);
        }
        for y in 0..5 {
            assert_eq!(fd.code(0, y), 0);
            assert_eq!(fd.code(4, y), 0);
        }
    }

    #[test]
    fn test_flat_terrain_no_flow() {
        let dem = RasterGrid::from_data(vec![5.0; 25], 5, 5, 10.0).unwrap();
        let fd = compute_flow_direction(&dem);
        assert!(fd.codes.iter().all(|&c| c == 0));
    }

    #[test]
    fn test_pit_cell_has_no_direction() {
        let mut dem = RasterGrid::from_data(vec![5.0; 25], 5, 5, 10.0).unwrap();
        dem.set(2, 2, 1.0);
        let fd = compute_flow_direction(&dem);
        assert_eq!(fd.code(2, 2), 0);
        // 洼地的邻居流入洼地
        assert_eq!(fd.code(1, 2), D8Direction::East.code());
        assert_eq!(fd.code(3, 2), D8Direction::West.code());
    }

    #[test]
    fn test_fill_sinks_removes_single_pit() {
        let mut dem = RasterGrid::from_data(vec![5.0; 25], 5, 5, 10.0).unwrap();
        dem.set(2, 2, 1.0);
        let filled = fill_sinks(&dem, 1);
        assert_eq!(filled.at(2, 2), 5.0);
        // 非洼地单元不变
        assert_eq!(filled.at(0, 0), 5.0);
        // 原栅格不被修改
        assert_eq!(dem.at(2, 2), 1.0);
    }

    #[test]
    fn test_fill_sinks_deterministic() {
        let mut dem = eastward_slope();
        dem.set(2, 2, -3.0);
        let a = fill_sinks(&dem, 3);
        let b = fill_sinks(&dem, 3);
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn test_accumulation_along_line() {
        // 单行向东流：上游每个单元累计数递增
        let dem = eastward_slope();
        let fd = compute_flow_direction(&dem);
        let acc = compute_flow_accumulation(&dem, &fd).unwrap();
        let cell_area = 100.0;
        // 内部行 y=2: x=1 无上游（除边界外），向东累计
        assert_eq!(acc.at(1, 2), 1.0 * cell_area);
        assert_eq!(acc.at(2, 2), 2.0 * cell_area);
        assert_eq!(acc.at(3, 2), 3.0 * cell_area);
    }

    #[test]
    fn test_accumulation_counts_include_self() {
        let dem = RasterGrid::from_data(vec![5.0; 9], 3, 3, 2.0).unwrap();
        let fd = compute_flow_direction(&dem);
        let acc = compute_flow_accumulation(&dem, &fd).unwrap();
        // 平坦地形无汇流：每个单元只计自身
        assert!(acc.data.iter().all(|&a| (a - 4.0).abs() < 1e-12));
    }

    #[test]
    fn test_accumulation_long_path_not_undercounted() {
        // 单一长坡：最下游内部单元应累计整条路径
        let width = 64;
        let mut data = Vec::with_capacity(width * 3);
        for _y in 0..3 {
            for x in 0..width {
                data.push((width - x) as f64);
            }
        }
        let dem = RasterGrid::from_data(data, width, 3, 1.0).unwrap();
        let fd = compute_flow_direction(&dem);
        let acc = compute_flow_accumulation(&dem, &fd).unwrap();
        // 内部行自 x=1 起流向东，x=width-2 处累计 width-2 个单元
        assert!((acc.at(width - 2, 1) - (width - 2) as f64).abs() < 1e-9);
    }

    #[test]
    fn test_code_roundtrip() {
        for dir in D8Direction::ALL {
            assert_eq!(D8Direction::from_code(dir.code()), Some(dir));
        }
        assert_eq!(D8Direction::from_code(0), None);
        assert_eq!(D8Direction::from_code(3), None);
    }
}
