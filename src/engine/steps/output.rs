use super::super::context::ScenarioState;
use super::super::resources::RunContext;
use super::Message;

/// 메시지를 완성해 콘솔로 출력한다. 상태는 변경하지 않는다.
pub(super) fn execute_output(message: &Message, state: &ScenarioState, ctx: &RunContext) {
    let text = message.resolve(state);
    ctx.console.write(&text);
}
