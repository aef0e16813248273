//! # 结构构造器
//!
//! 由标量晶格参数展开晶体原型，得到完整的原子结构。
//!
//! ## 物种策略
//! 原型的基位点默认全部被同一元素覆盖（`SpeciesPolicy::Uniform`），
//! 需要真正的多元素基时使用 `SpeciesPolicy::PerSite` 显式指定。
//!
//! ## 依赖关系
//! - 被 `batch/sweep.rs`, `commands/input.rs` 调用
//! - 使用 `models/structure.rs`

use crate::error::{QsweepError, Result};
use crate::models::{Atom, Crystal, Lattice, LatticeParameters};

/// 晶体原型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prototype {
    /// 六方密堆，双原子基
    Hcp,
}

impl Prototype {
    /// 基位点的分数坐标
    pub fn basis(&self) -> &'static [[f64; 3]] {
        match self {
            Prototype::Hcp => &[[0.0, 0.0, 0.0], [1.0 / 3.0, 2.0 / 3.0, 0.5]],
        }
    }

    fn lattice(&self, a: f64, c: f64) -> Lattice {
        match self {
            Prototype::Hcp => Lattice::hexagonal(a, c),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Prototype::Hcp => "hcp",
        }
    }
}

/// 基位点的元素分配策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeciesPolicy {
    /// 所有位点使用同一元素
    Uniform(String),
    /// 每个位点单独指定元素，长度必须等于基大小
    PerSite(Vec<String>),
}

/// 结构构造器
#[derive(Debug, Clone)]
pub struct StructureBuilder {
    prototype: Prototype,
    species: SpeciesPolicy,
}

impl StructureBuilder {
    pub fn new(prototype: Prototype, species: SpeciesPolicy) -> Self {
        StructureBuilder { prototype, species }
    }

    /// hcp 铁
    pub fn hcp_iron() -> Self {
        Self::new(Prototype::Hcp, SpeciesPolicy::Uniform("Fe".to_string()))
    }

    /// 构造结构（纯函数，失败时不产生部分结构）
    pub fn build(&self, params: &LatticeParameters) -> Result<Crystal> {
        params.validate()?;

        let basis = self.prototype.basis();
        let elements: Vec<String> = match &self.species {
            SpeciesPolicy::Uniform(el) => vec![el.clone(); basis.len()],
            SpeciesPolicy::PerSite(list) => {
                if list.len() != basis.len() {
                    return Err(QsweepError::InvalidBasis(format!(
                        "{} prototype has {} sites but {} species were given",
                        self.prototype.name(),
                        basis.len(),
                        list.len()
                    )));
                }
                list.clone()
            }
        };

        let lattice = self
            .prototype
            .lattice(params.effective_a(), params.effective_c());
        let atoms = elements
            .into_iter()
            .zip(basis.iter())
            .map(|(el, pos)| Atom::new(el, *pos))
            .collect::<Vec<_>>();

        let name = format!(
            "{}_{}",
            atoms
                .first()
                .map(|a| a.element.as_str())
                .unwrap_or("X"),
            self.prototype.name()
        );

        Crystal::new(name, lattice, atoms)
    }
}
