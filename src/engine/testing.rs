use super::events::EngineEvent;
use super::resources::RunContext;
use crate::prompt::RecordingConsole;
use crate::prompt::scripted::{ScriptedAnswer, ScriptedPrompter};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

/// 스크립트 응답과 기록용 콘솔로 구성한 테스트 실행 환경이다.
pub(crate) struct TestHarness {
    pub ctx: RunContext,
    pub prompter: Arc<ScriptedPrompter>,
    pub console: Arc<RecordingConsole>,
    pub events: UnboundedReceiver<EngineEvent>,
}

impl TestHarness {
    /// 응답 목록으로 실행 환경을 만든다.
    pub fn new(answers: impl IntoIterator<Item = ScriptedAnswer>) -> Self {
        let prompter = Arc::new(ScriptedPrompter::new(answers));
        let console = Arc::new(RecordingConsole::default());
        let (tx, events) = unbounded_channel();
        let ctx = RunContext::new(prompter.clone(), console.clone(), tx);
        Self {
            ctx,
            prompter,
            console,
            events,
        }
    }

    /// 지금까지 쌓인 이벤트를 모두 꺼낸다.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}
