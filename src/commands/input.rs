//! # input 命令实现
//!
//! 构造单个点的结构与配置并输出 pw.x 输入文件，便于在扫描前检查。
//!
//! ## 依赖关系
//! - 使用 `cli/input.rs` 定义的参数
//! - 复用 `commands/sweep.rs` 的构造辅助函数
//! - 使用 `parsers/pwscf_in.rs`

use crate::cli::input::InputArgs;
use crate::commands::sweep::{config_assembler, structure_builder};
use crate::error::{QsweepError, Result};
use crate::models::{LatticeParameters, PseudopotentialTable};
use crate::parsers::to_pwscf_input;
use crate::settings::parse_pseudo_spec;
use crate::utils::output;

use std::fs;

/// 执行 input 命令
pub fn execute(args: InputArgs) -> Result<()> {
    let deck = render_deck(&args)?;

    match &args.output {
        Some(path) => {
            fs::write(path, &deck).map_err(|e| QsweepError::FileWriteError {
                path: path.display().to_string(),
                source: e,
            })?;
            output::print_success(&format!("Input deck written to '{}'", path.display()));
        }
        None => print!("{}", deck),
    }
    Ok(())
}

/// 生成输入文件内容
fn render_deck(args: &InputArgs) -> Result<String> {
    let root = &args.pseudo.potentials_root;
    let mut table = PseudopotentialTable::new();
    for raw in &args.pseudo.pseudo {
        let spec = parse_pseudo_spec(raw, root)?;
        if !spec.path.is_file() {
            output::print_warning(&format!(
                "Pseudopotential file '{}' does not exist",
                spec.path.display()
            ));
        }
        table.insert(spec.element.clone(), spec);
    }

    let system = &args.system;
    let crystal = structure_builder(system)
        .build(&LatticeParameters::new(system.alat, system.clat))?;
    let config = config_assembler(system, root).assemble(
        system.calculation.into(),
        system.ecut,
        [system.nk; 3],
        &args.outdir,
        &table,
    )?;
    config.ensure_species_covered(&crystal)?;

    to_pwscf_input(&config, &crystal)
}
