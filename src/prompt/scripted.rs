use super::{Choice, PromptError, Prompter};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// 스크립트에 미리 적어 둔 응답이다.
#[derive(Debug, Clone)]
pub(crate) enum ScriptedAnswer {
    /// confirm 응답.
    Confirm(bool),
    /// select 응답(0 기반 인덱스).
    Select(usize),
    /// text 응답.
    Text(String),
}

/// 미리 정한 응답을 순서대로 돌려주는 테스트용 Prompter이다.
///
/// 응답이 소진되면 EOF와 같이 [`PromptError::Closed`]를 반환한다.
#[derive(Debug, Default)]
pub(crate) struct ScriptedPrompter {
    /// 남은 응답 목록.
    answers: Mutex<VecDeque<ScriptedAnswer>>,
    /// 받은 질문 목록.
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// 응답 목록으로 Prompter를 생성한다.
    pub fn new(answers: impl IntoIterator<Item = ScriptedAnswer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// 지금까지 받은 질문을 반환한다.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().expect("ScriptedPrompter mutex poisoned").clone()
    }

    /// 아직 사용하지 않은 응답 개수를 반환한다.
    pub fn remaining(&self) -> usize {
        self.answers
            .lock()
            .expect("ScriptedPrompter mutex poisoned")
            .len()
    }

    fn next(&self, message: &str) -> Result<ScriptedAnswer, PromptError> {
        self.asked
            .lock()
            .expect("ScriptedPrompter mutex poisoned")
            .push(message.to_string());
        self.answers
            .lock()
            .expect("ScriptedPrompter mutex poisoned")
            .pop_front()
            .ok_or(PromptError::Closed)
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm(&self, message: &str) -> Result<bool, PromptError> {
        match self.next(message)? {
            ScriptedAnswer::Confirm(value) => Ok(value),
            other => Err(PromptError::Unexpected(format!("confirm '{message}' <- {other:?}"))),
        }
    }

    async fn select(&self, message: &str, choices: &[Choice]) -> Result<usize, PromptError> {
        match self.next(message)? {
            ScriptedAnswer::Select(index) if index < choices.len() => Ok(index),
            other => Err(PromptError::Unexpected(format!("select '{message}' <- {other:?}"))),
        }
    }

    async fn text(&self, message: &str, default: Option<&str>) -> Result<String, PromptError> {
        match self.next(message)? {
            ScriptedAnswer::Text(value) if value.is_empty() => {
                Ok(default.unwrap_or_default().to_string())
            }
            ScriptedAnswer::Text(value) => Ok(value),
            other => Err(PromptError::Unexpected(format!("text '{message}' <- {other:?}"))),
        }
    }
}
