use super::super::context::ScenarioState;
use super::super::error::ScenarioError;
use super::super::resources::RunContext;
use super::action::classify;
use super::utils::log_step;
use super::{ActionFn, StepRunResult, WhileLoop, run_single_step};

/// 반복 구성이 붙은 Action을 실행한다.
///
/// 매 회차마다 입력 Step을 실행하고, 조건이 참이면 Action과 출력 Step을 실행한다.
/// 조건은 직전 회차가 바꾼 상태로 평가하며 거짓이 되는 즉시 멈춘다.
pub(super) async fn execute_while_loop(
    step_name: &str,
    run: &ActionFn,
    config: &WhileLoop,
    state: &mut ScenarioState,
    ctx: &RunContext,
) -> Result<StepRunResult, ScenarioError> {
    let mut iterations: usize = 0;
    loop {
        if let StepRunResult::Halted { exit_code } =
            run_single_step(&config.input, state, ctx).await?
        {
            return Ok(StepRunResult::Halted { exit_code });
        }
        if !(config.predicate)(state) {
            break;
        }
        iterations += 1;
        if let StepRunResult::Failed(message) = classify(step_name, run(state, ctx).await, ctx)? {
            log_step(
                ctx,
                step_name,
                &format!("{iterations}회차 실패 후 반복 계속: {message}"),
            );
        }
        if let StepRunResult::Halted { exit_code } =
            run_single_step(&config.output, state, ctx).await?
        {
            return Ok(StepRunResult::Halted { exit_code });
        }
    }
    log_step(ctx, step_name, &format!("반복 종료 ({iterations}회 실행)"));
    Ok(StepRunResult::Completed)
}
