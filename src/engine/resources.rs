use super::events::EngineEvent;
use crate::prompt::{SharedConsole, SharedPrompter};
use tokio::sync::mpsc::UnboundedSender;

/// 엔진 실행 중 필요한 공용 리소스를 캡슐화한다.
///
/// Step은 이 컨텍스트를 통해서만 입력을 받고, 화면에 출력하고, 이벤트를 보낸다.
#[derive(Clone)]
pub struct RunContext {
    /// 사용자 입력 수단.
    pub prompter: SharedPrompter,
    /// 출력 대상 콘솔.
    pub console: SharedConsole,
    /// 이벤트 송신 채널.
    pub(crate) events: UnboundedSender<EngineEvent>,
    /// 참이면 confirm 질문을 묻지 않고 승인한다.
    pub auto_confirm: bool,
}

impl RunContext {
    /// 실행 컨텍스트를 생성한다.
    pub fn new(
        prompter: SharedPrompter,
        console: SharedConsole,
        events: UnboundedSender<EngineEvent>,
    ) -> Self {
        Self {
            prompter,
            console,
            events,
            auto_confirm: false,
        }
    }

    /// confirm 자동 승인 여부를 지정한다.
    pub fn with_auto_confirm(mut self, auto_confirm: bool) -> Self {
        self.auto_confirm = auto_confirm;
        self
    }

    /// 이벤트를 송신한다. 수신 측이 닫혀 있으면 무시한다.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }
}
