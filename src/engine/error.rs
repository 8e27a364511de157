use crate::prompt::PromptError;
use crate::storage::StorageError;

/// 시나리오 실행을 중단시키는 오류를 표현한다.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// 같은 시나리오 안에 Step 이름이 중복된 경우이다.
    #[error("중복된 Step 이름이 존재합니다: {scenario}/{step}")]
    DuplicateStep { scenario: String, step: String },
    /// 입력 채널이 닫혀 더 이상 응답을 받을 수 없는 경우이다.
    #[error("Step '{step}' 입력 채널이 닫혔습니다.")]
    InputClosed { step: String },
    /// 입력 처리 중 발생한 오류이다.
    #[error("Step '{step}' 입력 실패: {source}")]
    Prompt {
        step: String,
        #[source]
        source: PromptError,
    },
    /// Action이 치명적 오류를 반환한 경우이다.
    #[error("Step '{step}' 실행 실패: {source:#}")]
    Action {
        step: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ScenarioError {
    /// 입력 오류를 Step 이름과 함께 분류한다.
    pub(crate) fn from_prompt(step: &str, err: PromptError) -> Self {
        match err {
            PromptError::Closed => ScenarioError::InputClosed {
                step: step.to_string(),
            },
            other => ScenarioError::Prompt {
                step: step.to_string(),
                source: other,
            },
        }
    }
}

/// Action이 반환하는 오류 분류이다.
///
/// `Recoverable`은 경고 후 다음 Step으로 진행하고, `Fatal`은 시나리오를 중단한다.
/// Action 안에서 입력이 닫히면 `InputClosed`로 Input Step과 같게 취급한다.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// 사용자에게 알리고 계속 진행할 수 있는 실패이다.
    #[error("{0}")]
    Recoverable(String),
    /// Action이 추가 입력을 받는 중 입력 채널이 닫혔다.
    #[error("입력 채널이 닫혔습니다.")]
    InputClosed,
    /// 시나리오를 중단해야 하는 실패이다.
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl ActionError {
    /// 복구 가능한 오류를 생성한다.
    pub fn recoverable(message: impl Into<String>) -> Self {
        ActionError::Recoverable(message.into())
    }
}

impl From<StorageError> for ActionError {
    fn from(err: StorageError) -> Self {
        ActionError::Fatal(anyhow::Error::new(err))
    }
}

impl From<PromptError> for ActionError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::Closed => ActionError::InputClosed,
            other => ActionError::Fatal(anyhow::Error::new(other)),
        }
    }
}
