//! 流水线状态机
//!
//! 管理单次运行中各阶段的顺序转换

use radflow_core::{RadflowError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 流水线阶段
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Pending,           // 未开始
    Reading,           // 读取与验证
    Normalizing,       // 像素规范化
    Detecting,         // 异常检测
    ExtractingContext, // 提取患者信息
    Composing,         // 生成报告
    Persisting,        // 写出结果文件
    Completed,         // 已完成
    Failed,            // 已失败
}

impl PipelineStage {
    /// 是否为终止状态
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Completed | PipelineStage::Failed)
    }
}

/// 阶段转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StageEvent {
    Started,
    Validated,
    Normalized,
    Detected,
    ContextExtracted,
    Composed,
    Persisted,
    Failed,
}

/// 流水线状态机
#[derive(Debug)]
pub struct PipelineStateMachine {
    transitions: HashMap<(PipelineStage, StageEvent), PipelineStage>,
}

impl PipelineStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        // 正常流程严格按顺序推进
        transitions.insert((PipelineStage::Pending, StageEvent::Started), PipelineStage::Reading);
        transitions.insert((PipelineStage::Reading, StageEvent::Validated), PipelineStage::Normalizing);
        transitions.insert((PipelineStage::Normalizing, StageEvent::Normalized), PipelineStage::Detecting);
        transitions.insert((PipelineStage::Detecting, StageEvent::Detected), PipelineStage::ExtractingContext);
        transitions.insert((PipelineStage::ExtractingContext, StageEvent::ContextExtracted), PipelineStage::Composing);
        transitions.insert((PipelineStage::Composing, StageEvent::Composed), PipelineStage::Persisting);
        transitions.insert((PipelineStage::Persisting, StageEvent::Persisted), PipelineStage::Completed);

        // 任一非终止阶段都可以失败
        for stage in Self::get_all_states() {
            if !stage.is_terminal() {
                transitions.insert((stage, StageEvent::Failed), PipelineStage::Failed);
            }
        }

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: &PipelineStage, event: &StageEvent) -> bool {
        self.transitions.contains_key(&(*from, *event))
    }

    /// 执行状态转换
    pub fn transition(&self, from: &PipelineStage, event: &StageEvent) -> Result<PipelineStage> {
        match self.transitions.get(&(*from, *event)) {
            Some(to) => Ok(*to),
            None => Err(RadflowError::InvalidStateTransition {
                from: format!("{:?}", from),
                event: format!("{:?}", event),
            }),
        }
    }

    /// 获取所有可能的状态
    pub fn get_all_states() -> Vec<PipelineStage> {
        vec![
            PipelineStage::Pending,
            PipelineStage::Reading,
            PipelineStage::Normalizing,
            PipelineStage::Detecting,
            PipelineStage::ExtractingContext,
            PipelineStage::Composing,
            PipelineStage::Persisting,
            PipelineStage::Completed,
            PipelineStage::Failed,
        ]
    }

    /// 获取状态的所有可能事件
    pub fn get_possible_events(&self, current_state: &PipelineStage) -> Vec<StageEvent> {
        self.transitions
            .keys()
            .filter(|(state, _)| state == current_state)
            .map(|(_, event)| *event)
            .collect()
    }
}

impl Default for PipelineStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let sm = PipelineStateMachine::new();
        let events = [
            StageEvent::Started,
            StageEvent::Validated,
            StageEvent::Normalized,
            StageEvent::Detected,
            StageEvent::ContextExtracted,
            StageEvent::Composed,
            StageEvent::Persisted,
        ];

        let mut stage = PipelineStage::Pending;
        for event in events {
            stage = sm.transition(&stage, &event).unwrap();
        }
        assert_eq!(stage, PipelineStage::Completed);
    }

    #[test]
    fn test_stages_cannot_be_skipped() {
        let sm = PipelineStateMachine::new();

        assert!(!sm.can_transition(&PipelineStage::Reading, &StageEvent::Detected));
        assert!(!sm.can_transition(&PipelineStage::Pending, &StageEvent::Validated));
        assert!(sm
            .transition(&PipelineStage::Normalizing, &StageEvent::Composed)
            .is_err());
    }

    #[test]
    fn test_failure_from_any_running_stage() {
        let sm = PipelineStateMachine::new();

        for stage in PipelineStateMachine::get_all_states() {
            assert_eq!(
                sm.can_transition(&stage, &StageEvent::Failed),
                !stage.is_terminal()
            );
        }
    }

    #[test]
    fn test_terminal_states_have_no_events() {
        let sm = PipelineStateMachine::new();
        assert!(sm.get_possible_events(&PipelineStage::Completed).is_empty());
        assert!(sm.get_possible_events(&PipelineStage::Failed).is_empty());
        assert_eq!(sm.get_possible_events(&PipelineStage::Detecting).len(), 2);
    }
}
