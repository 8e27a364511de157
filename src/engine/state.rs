use std::time::{Duration, Instant};

/// Step의 런타임 상태를 표현한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// 아직 실행 대기 상태.
    Pending,
    /// 실행 중.
    Running,
    /// 정상 종료.
    Success,
    /// skip 조건으로 건너뜀.
    Skipped,
    /// 종료 가드가 시나리오를 멈춤.
    Halted,
    /// 실패와 함께 오류 메시지를 포함한다.
    Failed(String),
}

/// 실행된 Step 하나의 기록이다.
#[derive(Debug, Clone)]
pub struct StepRuntimeState {
    /// 소속 시나리오 이름.
    pub scenario: String,
    /// Step 이름.
    pub step: String,
    /// 현재 상태 값.
    pub status: StepStatus,
    /// 시작 시각.
    pub started_at: Option<Instant>,
    /// 종료 시각.
    pub finished_at: Option<Instant>,
}

impl StepRuntimeState {
    /// 대기 상태의 기록을 생성한다.
    pub fn new(scenario: impl Into<String>, step: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            step: step.into(),
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
        }
    }

    /// 시작부터 종료까지 걸린 시간. 끝나지 않은 Step은 `None`이다.
    pub fn elapsed(&self) -> Option<Duration> {
        Some(self.finished_at?.saturating_duration_since(self.started_at?))
    }
}

/// 시나리오 실행 중 Step 기록을 실행 순서대로 보관한다.
#[derive(Debug, Clone, Default)]
pub struct ScenarioRuntime {
    /// 실행 순서대로 쌓인 Step 기록.
    pub steps: Vec<StepRuntimeState>,
}

impl ScenarioRuntime {
    /// 빈 런타임을 생성한다.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Step 시작을 기록하고 인덱스를 반환한다.
    pub(super) fn start(&mut self, scenario: &str, step: &str) -> usize {
        let mut record = StepRuntimeState::new(scenario, step);
        record.status = StepStatus::Running;
        record.started_at = Some(Instant::now());
        self.steps.push(record);
        self.steps.len() - 1
    }

    /// Step 종료 상태를 기록한다.
    pub(super) fn finish(&mut self, index: usize, status: StepStatus) {
        if let Some(record) = self.steps.get_mut(index) {
            record.status = status;
            record.finished_at = Some(Instant::now());
        }
    }

    /// 실행된(건너뛴 Step 포함) Step 이름을 순서대로 반환한다.
    #[cfg(test)]
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.step.as_str()).collect()
    }

    /// 지정한 Step의 마지막 상태를 조회한다.
    #[cfg(test)]
    pub fn status_of(&self, step: &str) -> Option<&StepStatus> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.step == step)
            .map(|s| &s.status)
    }
}
