use super::super::context::ScenarioState;
use super::super::error::ScenarioError;
use super::super::resources::RunContext;
use super::utils::log_step;
use super::{InputKind, Message};
use crate::prompt::PromptError;
use serde_json::Value;

/// 입력을 받아 Step 이름을 키로 상태에 기록한다.
///
/// 자동 승인 모드에서는 confirm 질문을 보여주지 않고 `true`로 처리하며,
/// 기본값이 있는 text 질문은 기본값을 그대로 쓴다. select는 항상 묻는다.
pub(super) async fn execute_input(
    step_name: &str,
    message: &Message,
    kind: &InputKind,
    state: &mut ScenarioState,
    ctx: &RunContext,
) -> Result<(), ScenarioError> {
    let question = message.resolve(state);
    let value: Value = match kind {
        InputKind::Confirm => {
            if ctx.auto_confirm {
                log_step(ctx, step_name, &format!("[자동 승인] {question}"));
                Value::Bool(true)
            } else {
                let answer = ctx
                    .prompter
                    .confirm(&question)
                    .await
                    .map_err(|err| ScenarioError::from_prompt(step_name, err))?;
                Value::Bool(answer)
            }
        }
        InputKind::Select(choices) => {
            let index = ctx
                .prompter
                .select(&question, choices)
                .await
                .map_err(|err| ScenarioError::from_prompt(step_name, err))?;
            choices
                .get(index)
                .map(|choice| choice.value.clone())
                .ok_or_else(|| {
                    ScenarioError::from_prompt(
                        step_name,
                        PromptError::Unexpected(format!("선택 인덱스 범위 초과: {index}")),
                    )
                })?
        }
        InputKind::Text {
            default: Some(default),
        } if ctx.auto_confirm => {
            log_step(ctx, step_name, &format!("[자동 승인] {question} -> {default}"));
            Value::String(default.clone())
        }
        InputKind::Text { default } => {
            let answer = ctx
                .prompter
                .text(&question, default.as_deref())
                .await
                .map_err(|err| ScenarioError::from_prompt(step_name, err))?;
            Value::String(answer)
        }
    };
    log_step(ctx, step_name, &format!("입력 값: {value}"));
    state.set(step_name, value);
    Ok(())
}
