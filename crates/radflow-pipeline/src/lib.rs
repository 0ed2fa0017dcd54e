//! # 影像分析流水线模块
//!
//! 把读取、规范化、检测、报告生成串成一次顺序执行的运行：
//! - 状态机：约束阶段只能按顺序推进，任一阶段都可转入失败
//! - 配置：阈值、超时、模板和输出文件名，支持文件与环境变量
//! - 结果：成功或失败二选一，失败时区分输入无效与处理错误

pub mod artifacts;
pub mod config;
pub mod pipeline;
pub mod result;
pub mod state_machine;

// 重新导出主要类型
pub use artifacts::ArtifactWriter;
pub use config::{ArtifactNames, PipelineConfig, ENV_PREFIX};
pub use pipeline::Pipeline;
pub use result::{FailureReason, OutputFiles, PipelineFailure, PipelineResult, PipelineSuccess};
pub use state_machine::{PipelineStage, PipelineStateMachine, StageEvent};
