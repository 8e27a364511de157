use super::context::ScenarioState;
use super::error::ScenarioError;
use super::events::EngineEvent;
use super::resources::RunContext;
use super::state::{ScenarioRuntime, StepStatus};
use super::steps::{Step, StepKind, StepRunResult, run_single_step};
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, error, info, warn};

/// 이름과 순서가 정해진 Step 목록이다.
pub struct Scenario {
    name: String,
    steps: Vec<Step>,
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("steps", &self.steps)
            .finish()
    }
}

impl Scenario {
    /// 시나리오를 생성한다. Step 이름이 중복되면 오류를 반환한다.
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Result<Self, ScenarioError> {
        let name = name.into();
        let mut seen: HashSet<&str> = HashSet::new();
        for step in &steps {
            if !seen.insert(step.name.as_str()) {
                return Err(ScenarioError::DuplicateStep {
                    scenario: name,
                    step: step.name.clone(),
                });
            }
        }
        Ok(Self { name, steps })
    }

    /// 시나리오 이름.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 시나리오를 실행한다. [`run_scenario`]와 같다.
    pub async fn run(
        &self,
        state: &mut ScenarioState,
        ctx: &RunContext,
    ) -> Result<RunReport, ScenarioError> {
        run_scenario(self, state, ctx).await
    }
}

/// 시나리오 실행 결과이다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// 모든 Step을 끝까지 처리했다.
    Completed,
    /// 종료 가드가 시나리오를 멈췄다.
    Halted { step: String, exit_code: i32 },
}

impl RunOutcome {
    /// 프로세스 종료 코드로 변환한다.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed => 0,
            RunOutcome::Halted { exit_code, .. } => *exit_code,
        }
    }
}

/// 실행 결과와 Step별 기록을 묶은 보고서이다.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub runtime: ScenarioRuntime,
}

/// Scenario 전체를 순서대로 실행하고 이벤트를 송신한다.
///
/// 복구 가능한 Action 실패는 기록만 하고 다음 Step으로 넘어가며,
/// 치명적 오류나 입력 종료는 즉시 오류로 반환한다.
pub async fn run_scenario(
    scenario: &Scenario,
    state: &mut ScenarioState,
    ctx: &RunContext,
) -> Result<RunReport, ScenarioError> {
    let mut runtime = ScenarioRuntime::new();
    let outcome = run_steps(scenario, state, ctx, &mut runtime).await?;
    Ok(RunReport { outcome, runtime })
}

/// Step 목록을 실행한다. 하위 시나리오는 같은 기록에 이어 붙인다.
pub(super) fn run_steps<'a>(
    scenario: &'a Scenario,
    state: &'a mut ScenarioState,
    ctx: &'a RunContext,
    runtime: &'a mut ScenarioRuntime,
) -> BoxFuture<'a, Result<RunOutcome, ScenarioError>> {
    Box::pin(async move {
        info!(scenario = %scenario.name, steps = scenario.steps.len(), "시나리오 시작");
        for step in &scenario.steps {
            let index = runtime.start(&scenario.name, &step.name);
            ctx.emit(EngineEvent::StepStarted {
                scenario: scenario.name.clone(),
                step: step.name.clone(),
            });
            debug!(scenario = %scenario.name, step = %step.name, kind = step.kind.label(), "Step 시작");

            let result = match &step.kind {
                StepKind::Nested(inner) if !step.should_skip(state) => {
                    run_steps(inner, state, ctx, runtime)
                        .await
                        .map(|outcome| match outcome {
                            RunOutcome::Completed => (StepRunResult::Completed, None),
                            RunOutcome::Halted { step, exit_code } => {
                                (StepRunResult::Halted { exit_code }, Some(step))
                            }
                        })
                }
                _ => run_single_step(step, state, ctx)
                    .await
                    .map(|result| (result, None)),
            };

            match result {
                Ok((StepRunResult::Completed, _)) => {
                    runtime.finish(index, StepStatus::Success);
                    ctx.emit(finished(scenario, step, true));
                }
                Ok((StepRunResult::Skipped, _)) => {
                    runtime.finish(index, StepStatus::Skipped);
                    debug!(scenario = %scenario.name, step = %step.name, "Step 건너뜀");
                    ctx.emit(EngineEvent::StepSkipped {
                        scenario: scenario.name.clone(),
                        step: step.name.clone(),
                    });
                }
                Ok((StepRunResult::Failed(message), _)) => {
                    runtime.finish(index, StepStatus::Failed(message));
                    ctx.emit(finished(scenario, step, false));
                }
                Ok((StepRunResult::Halted { exit_code }, inner)) => {
                    runtime.finish(index, StepStatus::Halted);
                    let halted_at = inner.unwrap_or_else(|| step.name.clone());
                    info!(scenario = %scenario.name, step = %halted_at, exit_code, "시나리오 종료 요청");
                    ctx.emit(EngineEvent::ScenarioHalted {
                        scenario: scenario.name.clone(),
                        step: halted_at.clone(),
                    });
                    return Ok(RunOutcome::Halted {
                        step: halted_at,
                        exit_code,
                    });
                }
                Err(err) => {
                    error!(scenario = %scenario.name, step = %step.name, error = %err, "Step 실패, 시나리오 중단");
                    runtime.finish(index, StepStatus::Failed(err.to_string()));
                    ctx.emit(finished(scenario, step, false));
                    return Err(err);
                }
            }
        }
        if runtime
            .steps
            .iter()
            .any(|s| matches!(s.status, StepStatus::Failed(_)))
        {
            warn!(scenario = %scenario.name, "일부 Step이 실패한 채로 시나리오 종료");
        } else {
            info!(scenario = %scenario.name, "시나리오 종료");
        }
        ctx.emit(EngineEvent::ScenarioFinished {
            scenario: scenario.name.clone(),
        });
        Ok(RunOutcome::Completed)
    })
}

fn finished(scenario: &Scenario, step: &Step, success: bool) -> EngineEvent {
    EngineEvent::StepFinished {
        scenario: scenario.name.clone(),
        step: step.name.clone(),
        success,
    }
}
