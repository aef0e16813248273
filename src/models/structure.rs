//! # 晶体结构数据模型
//!
//! 定义晶格参数与原子结构表示，由 `builders/structure.rs` 构造，
//! 再由 `parsers/pwscf_in.rs` 序列化为 pw.x 输入。
//!
//! ## 依赖关系
//! - 被 `builders/`, `parsers/`, `batch/` 使用
//! - 无外部模块依赖

use crate::error::{QsweepError, Result};
use serde::{Deserialize, Serialize};

/// 标量晶格参数 (Å)
///
/// `a` 为面内晶格常数，`c` 为面外晶格常数，`scale` 为可选的统一线性缩放因子。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatticeParameters {
    pub a: f64,
    pub c: f64,
    pub scale: Option<f64>,
}

impl LatticeParameters {
    pub fn new(a: f64, c: f64) -> Self {
        LatticeParameters { a, c, scale: None }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    /// 检查所有长度与缩放因子均为有限正数
    pub fn validate(&self) -> Result<()> {
        let checks = [("a", Some(self.a)), ("c", Some(self.c)), ("scale", self.scale)];
        for (name, value) in checks {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(QsweepError::InvalidLattice(format!(
                        "{} must be positive and finite, got {}",
                        name, v
                    )));
                }
            }
        }
        Ok(())
    }

    /// 缩放后的面内晶格常数
    pub fn effective_a(&self) -> f64 {
        self.a * self.scale.unwrap_or(1.0)
    }

    /// 缩放后的面外晶格常数
    pub fn effective_c(&self) -> f64 {
        self.c * self.scale.unwrap_or(1.0)
    }
}

/// 晶格参数表示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    /// [[a1, a2, a3], [b1, b2, b3], [c1, c2, c3]]
    pub matrix: [[f64; 3]; 3],
}

impl Lattice {
    /// 六方晶格：a 沿 x，b 与 a 成 120°，c 沿 z
    pub fn hexagonal(a: f64, c: f64) -> Self {
        let half_sqrt3 = 3.0_f64.sqrt() / 2.0;
        Lattice {
            matrix: [[a, 0.0, 0.0], [-0.5 * a, half_sqrt3 * a, 0.0], [0.0, 0.0, c]],
        }
    }

    /// 计算晶格体积（有符号行列式）
    pub fn volume(&self) -> f64 {
        let a = self.matrix[0];
        let b = self.matrix[1];
        let c = self.matrix[2];

        a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
            + a[2] * (b[0] * c[1] - b[1] * c[0])
    }
}

/// 原子信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// 元素符号
    pub element: String,

    /// 分数坐标 [x, y, z]
    pub position: [f64; 3],
}

impl Atom {
    pub fn new(element: impl Into<String>, position: [f64; 3]) -> Self {
        Atom {
            element: element.into(),
            position,
        }
    }
}

/// 晶体结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crystal {
    /// 结构名称
    pub name: String,

    /// 晶格
    pub lattice: Lattice,

    /// 原子列表
    pub atoms: Vec<Atom>,
}

impl Crystal {
    /// 创建结构并检查晶胞非退化
    pub fn new(name: impl Into<String>, lattice: Lattice, atoms: Vec<Atom>) -> Result<Self> {
        let volume = lattice.volume().abs();
        if !volume.is_finite() || volume <= f64::EPSILON {
            return Err(QsweepError::InvalidLattice(format!(
                "cell vectors are degenerate (volume {})",
                volume
            )));
        }
        Ok(Crystal {
            name: name.into(),
            lattice,
            atoms,
        })
    }

    /// 晶胞体积 (Å³)
    pub fn volume(&self) -> f64 {
        self.lattice.volume().abs()
    }

    /// 按首次出现顺序去重的元素列表
    pub fn species(&self) -> Vec<String> {
        let mut species: Vec<String> = Vec::new();
        for atom in &self.atoms {
            if !species.iter().any(|s| s == &atom.element) {
                species.push(atom.element.clone());
            }
        }
        species
    }

    /// 计算化学式
    pub fn formula(&self) -> String {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

        for atom in &self.atoms {
            *counts.entry(atom.element.as_str()).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(el, count)| {
                if count == 1 {
                    el.to_string()
                } else {
                    format!("{}{}", el, count)
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// 计算每原子体积
    pub fn volume_per_atom(&self) -> f64 {
        self.volume() / self.atoms.len().max(1) as f64
    }
}
