use super::super::context::ScenarioState;
use super::super::error::{ActionError, ScenarioError};
use super::super::resources::RunContext;
use super::loops::execute_while_loop;
use super::utils::log_step;
use super::{ActionFn, StepRunResult, WhileLoop};
use tracing::warn;

/// Action Step을 실행한다. 반복 구성이 있으면 반복 실행으로 넘긴다.
pub(super) async fn execute_action(
    step_name: &str,
    run: &ActionFn,
    repeat: Option<&WhileLoop>,
    state: &mut ScenarioState,
    ctx: &RunContext,
) -> Result<StepRunResult, ScenarioError> {
    match repeat {
        Some(config) => execute_while_loop(step_name, run, config, state, ctx).await,
        None => classify(step_name, run(state, ctx).await, ctx),
    }
}

/// Action 결과를 오류 분류에 따라 Step 결과로 바꾼다.
///
/// 복구 가능한 오류는 실패 결과로, 치명적 오류와 입력 종료는 시나리오 오류로 전달한다.
pub(super) fn classify(
    step_name: &str,
    result: Result<(), ActionError>,
    ctx: &RunContext,
) -> Result<StepRunResult, ScenarioError> {
    match result {
        Ok(()) => Ok(StepRunResult::Completed),
        Err(ActionError::Recoverable(message)) => {
            warn!(step = step_name, %message, "Action 실패, 다음 Step으로 진행");
            log_step(ctx, step_name, &format!("실패(계속 진행): {message}"));
            Ok(StepRunResult::Failed(message))
        }
        Err(ActionError::InputClosed) => Err(ScenarioError::InputClosed {
            step: step_name.to_string(),
        }),
        Err(ActionError::Fatal(source)) => Err(ScenarioError::Action {
            step: step_name.to_string(),
            source,
        }),
    }
}
