//! # 批量执行器
//!
//! 按输入顺序收集结果的并行执行器。
//!
//! ## 功能
//! - jobs == 1 时顺序执行，否则使用独立的 rayon 线程池
//! - 结果顺序与输入顺序一致，与完成顺序无关
//! - 进度条显示
//!
//! ## 依赖关系
//! - 被 `batch/sweep.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::utils::progress;

use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::warn;

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
    show_progress: bool,
}

impl BatchRunner {
    /// 创建新的批量执行器
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self {
            jobs,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 处理全部输入，结果按输入顺序返回
    pub fn run<T, R, F>(&self, items: &[T], message: &str, processor: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        let total = items.len() as u64;
        let pb = if self.show_progress {
            progress::create_progress_bar(total, message)
        } else {
            progress::create_hidden_bar(total)
        };

        let results = if self.jobs <= 1 {
            run_sequential(items, &processor, &pb)
        } else {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.jobs)
                .build()
            {
                Ok(pool) => pool.install(|| {
                    items
                        .par_iter()
                        .map(|item| {
                            let result = processor(item);
                            pb.inc(1);
                            result
                        })
                        .collect()
                }),
                Err(e) => {
                    warn!(error = %e, "failed to build thread pool, running sequentially");
                    run_sequential(items, &processor, &pb)
                }
            }
        };

        pb.finish_and_clear();
        results
    }
}

fn run_sequential<T, R, F>(items: &[T], processor: &F, pb: &ProgressBar) -> Vec<R>
where
    F: Fn(&T) -> R,
{
    items
        .iter()
        .map(|item| {
            let result = processor(item);
            pb.inc(1);
            result
        })
        .collect()
}

/// 外层并发上限：jobs × ncpu 不超过可用核数
pub fn effective_jobs(requested: usize, ncpu: u32, cores: usize) -> usize {
    let ceiling = (cores / ncpu.max(1) as usize).max(1);
    requested.clamp(1, ceiling)
}
