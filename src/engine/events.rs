/// 엔진에서 외부(로그 출력, 테스트)로 전달되는 주요 이벤트 모델이다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Step 시작 알림.
    StepStarted { scenario: String, step: String },
    /// Step별 로그 라인.
    StepLog { step: String, line: String },
    /// skip 조건으로 실행하지 않은 Step.
    StepSkipped { scenario: String, step: String },
    /// Step 종료 알림.
    StepFinished {
        scenario: String,
        step: String,
        success: bool,
    },
    /// 종료 가드에 의해 시나리오가 멈춘 경우.
    ScenarioHalted { scenario: String, step: String },
    /// 시나리오 종료.
    ScenarioFinished { scenario: String },
}
