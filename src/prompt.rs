use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::codec::LinesCodecError;

mod line;
#[cfg(test)]
pub(crate) mod scripted;

pub use line::LinePrompter;

/// 입력 채널에서 발생하는 오류이다.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// 입력이 EOF에 도달했거나 채널이 닫혔다.
    #[error("입력 채널이 닫혔습니다.")]
    Closed,
    /// 입출력 오류.
    #[error("입출력 오류: {0}")]
    Io(#[from] std::io::Error),
    /// 라인 디코딩 오류.
    #[error("입력 라인 해석 실패: {0}")]
    Codec(#[from] LinesCodecError),
    /// 선택지가 비어 있어 응답할 수 없다.
    #[error("선택 가능한 항목이 없습니다: {0}")]
    NoChoices(String),
    /// 스크립트 응답과 요청된 입력 종류가 맞지 않는다.
    #[error("예상하지 못한 입력 요청: {0}")]
    Unexpected(String),
}

/// select 입력의 선택지 하나를 표현한다.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    /// 화면에 보여줄 이름.
    pub label: String,
    /// 선택 시 상태에 기록할 값.
    pub value: Value,
}

impl Choice {
    /// 선택지를 생성한다.
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// 사용자 또는 스크립트 드라이버로부터 값을 받아오는 추상 계층이다.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// 예/아니오 응답을 받는다.
    async fn confirm(&self, message: &str) -> Result<bool, PromptError>;
    /// 선택지 중 하나를 고르고 그 인덱스를 반환한다.
    async fn select(&self, message: &str, choices: &[Choice]) -> Result<usize, PromptError>;
    /// 자유 텍스트를 받는다. 빈 입력이면 `default`를 사용한다.
    async fn text(&self, message: &str, default: Option<&str>) -> Result<String, PromptError>;
}

/// Prompter를 공유하기 위한 Arc 타입 별칭이다.
pub type SharedPrompter = Arc<dyn Prompter>;

/// 사용자에게 보여줄 출력을 받는 싱크이다.
pub trait Console: Send + Sync {
    /// 완성된 문자열을 출력한다.
    fn write(&self, text: &str);
}

/// 표준 출력으로 내보내는 기본 구현이다.
#[derive(Debug, Default, Clone)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn write(&self, text: &str) {
        println!("{text}");
    }
}

/// Console을 공유하기 위한 Arc 타입 별칭이다.
pub type SharedConsole = Arc<dyn Console>;

/// 출력 내용을 메모리에 쌓아두는 테스트용 콘솔이다.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingConsole {
    /// 출력된 문자열 목록.
    pub lines: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingConsole {
    /// 지금까지 출력된 문자열을 복사해 반환한다.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("RecordingConsole mutex poisoned").clone()
    }
}

#[cfg(test)]
impl Console for RecordingConsole {
    fn write(&self, text: &str) {
        self.lines
            .lock()
            .expect("RecordingConsole mutex poisoned")
            .push(text.to_string());
    }
}
