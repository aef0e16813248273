//! # pw.x 输入文件生成
//!
//! 将 `RunConfiguration` + `Crystal` 序列化为 pw.x 输入文件。
//! 结构以 ibrav = 0 写出：CELL_PARAMETERS {angstrom} + ATOMIC_POSITIONS {crystal}。
//!
//! ## 依赖关系
//! - 被 `batch/job.rs`, `commands/input.rs` 使用
//! - 使用 `models/config.rs`, `models/structure.rs`, `models/element.rs`

use crate::error::{QsweepError, Result};
use crate::models::element::atomic_mass;
use crate::models::{Crystal, ParamValue, RunConfiguration, Section};

/// 生成完整的 pw.x 输入文件内容
///
/// 原子量表中没有的元素无法写出 ATOMIC_SPECIES，返回 `InvalidBasis`。
pub fn to_pwscf_input(config: &RunConfiguration, crystal: &Crystal) -> Result<String> {
    let species = crystal.species();
    let mut result = String::new();

    for section in Section::ALL {
        result.push_str(&format!("&{}\n", section.namelist()));

        if section == Section::System {
            // 结构相关的键由结构本身决定
            result.push_str("  ibrav = 0,\n");
            result.push_str(&format!("  nat = {},\n", crystal.atoms.len()));
            result.push_str(&format!("  ntyp = {},\n", species.len()));
        }

        if let Some(entries) = config.section(section) {
            for (key, value) in entries {
                result.push_str(&format!("  {} = {},\n", key, format_value(value)));
            }
        }
        result.push_str("/\n");
    }
    result.push('\n');

    // ATOMIC_SPECIES
    result.push_str("ATOMIC_SPECIES\n");
    for el in &species {
        let mass = atomic_mass(el).ok_or_else(|| {
            QsweepError::InvalidBasis(format!("no atomic mass known for element '{}'", el))
        })?;
        let file = config
            .pseudopotentials
            .get(el)
            .map(|p| p.file_name.as_str())
            .unwrap_or("");
        result.push_str(&format!("  {} {} {}\n", el, mass, file));
    }
    result.push('\n');

    // CELL_PARAMETERS
    result.push_str("CELL_PARAMETERS {angstrom}\n");
    for row in &crystal.lattice.matrix {
        result.push_str(&format!(
            "  {:16.10} {:16.10} {:16.10}\n",
            row[0], row[1], row[2]
        ));
    }
    result.push('\n');

    // ATOMIC_POSITIONS
    result.push_str("ATOMIC_POSITIONS {crystal}\n");
    for atom in &crystal.atoms {
        result.push_str(&format!(
            "  {} {:14.10} {:14.10} {:14.10}\n",
            atom.element, atom.position[0], atom.position[1], atom.position[2]
        ));
    }
    result.push('\n');

    // K_POINTS
    let k = &config.kpoints;
    let shift = if k.shifted { 1 } else { 0 };
    result.push_str(&format!("K_POINTS {{{}}}\n", k.scheme.as_str()));
    result.push_str(&format!(
        "  {} {} {}  {} {} {}\n",
        k.grid[0], k.grid[1], k.grid[2], shift, shift, shift
    ));

    Ok(result)
}

/// namelist 值的 Fortran 写法
fn format_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Int(i) => i.to_string(),
        ParamValue::Float(f) => {
            if *f != 0.0 && f.abs() < 1e-3 {
                format!("{:e}", f)
            } else {
                format!("{}", f)
            }
        }
        ParamValue::Bool(true) => ".true.".to_string(),
        ParamValue::Bool(false) => ".false.".to_string(),
        ParamValue::Str(s) => format!("'{}'", s),
    }
}
