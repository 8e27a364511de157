use super::super::events::EngineEvent;
use super::super::resources::RunContext;

/// Step 로그를 전송한다.
pub(super) fn log_step(ctx: &RunContext, step: &str, line: &str) {
    ctx.emit(EngineEvent::StepLog {
        step: step.to_string(),
        line: line.to_string(),
    });
}
