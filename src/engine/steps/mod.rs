use super::context::ScenarioState;
use super::error::{ActionError, ScenarioError};
use super::resources::RunContext;
use super::runner::{RunOutcome, Scenario, run_steps};
use super::state::ScenarioRuntime;
use crate::prompt::Choice;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

mod action;
mod input;
mod loops;
mod output;
mod utils;

use action::execute_action;
use input::execute_input;
use output::execute_output;
use utils::log_step;

/// 상태를 보고 참/거짓을 판단하는 함수이다.
pub type StatePredicate = Arc<dyn Fn(&ScenarioState) -> bool + Send + Sync>;

/// 상태로부터 출력 문자열을 만드는 함수이다.
pub type RenderFn = Arc<dyn Fn(&ScenarioState) -> String + Send + Sync>;

/// 상태를 받아 외부 호출을 수행하는 비동기 Action 함수이다.
pub type ActionFn = Arc<
    dyn for<'a> Fn(&'a mut ScenarioState, &'a RunContext) -> BoxFuture<'a, Result<(), ActionError>>
        + Send
        + Sync,
>;

/// Output Step과 입력 질문에 쓰이는 메시지이다.
#[derive(Clone)]
pub enum Message {
    /// 고정 문자열.
    Text(String),
    /// `${key}` 플레이스홀더를 상태 값으로 치환하는 템플릿.
    Template(String),
    /// 상태를 받아 문자열을 만드는 함수.
    Render(RenderFn),
}

impl Message {
    /// 템플릿 메시지를 생성한다.
    pub fn template(template: impl Into<String>) -> Self {
        Message::Template(template.into())
    }

    /// 함수 기반 메시지를 생성한다.
    pub fn render<F>(f: F) -> Self
    where
        F: Fn(&ScenarioState) -> String + Send + Sync + 'static,
    {
        Message::Render(Arc::new(f))
    }

    /// 현재 상태로 메시지를 완성한다.
    ///
    /// 템플릿 치환에 실패하면 경고를 남기고 원문을 그대로 사용한다.
    pub fn resolve(&self, state: &ScenarioState) -> String {
        match self {
            Message::Text(text) => text.clone(),
            Message::Template(template) => {
                state.expand_placeholders(template).unwrap_or_else(|err| {
                    warn!(error = %err, "메시지 템플릿 치환 실패");
                    template.clone()
                })
            }
            Message::Render(f) => f(state),
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

/// Input Step이 받을 값의 종류이다.
#[derive(Clone)]
pub enum InputKind {
    /// 예/아니오.
    Confirm,
    /// 선택지 중 하나. 선택한 항목의 값을 기록한다.
    Select(Vec<Choice>),
    /// 자유 텍스트. 자동 승인 모드에서는 기본값이 있으면 묻지 않고 사용한다.
    Text { default: Option<String> },
}

/// Action 반복 구성이다.
///
/// `input` 실행 후 `predicate`가 참이면 Action과 `output`을 실행하고, 거짓이 되면 멈춘다.
pub struct WhileLoop {
    /// 반복 지속 조건.
    pub predicate: StatePredicate,
    /// 매 반복 시작 시 실행할 Step.
    pub input: Box<Step>,
    /// Action 실행 후 결과를 보여줄 Step.
    pub output: Box<Step>,
}

/// Step 종류를 표현한다.
pub enum StepKind {
    /// 메시지를 출력한다.
    Output(Message),
    /// 값을 입력받아 Step 이름을 키로 기록한다.
    Input { message: Message, kind: InputKind },
    /// 비동기 Action을 실행한다.
    Action {
        run: ActionFn,
        repeat: Option<WhileLoop>,
    },
    /// 지정한 키가 `false`이면 시나리오를 멈춘다.
    ExitGuard { key: String, exit_code: i32 },
    /// 하위 시나리오 전체를 실행한다.
    Nested(Scenario),
}

impl StepKind {
    /// 로그용 종류 이름을 반환한다.
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::Output(_) => "output",
            StepKind::Input { .. } => "input",
            StepKind::Action { .. } => "action",
            StepKind::ExitGuard { .. } => "exit_guard",
            StepKind::Nested(_) => "scenario",
        }
    }
}

/// Step은 Scenario 내 최소 실행 단위를 표현한다.
pub struct Step {
    /// 시나리오 안에서 고유한 이름. Input Step은 이 이름으로 값을 기록한다.
    pub name: String,
    /// Step 종류.
    pub kind: StepKind,
    /// 참이면 실행하지 않고 건너뛴다.
    pub skip_when: Option<StatePredicate>,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("kind", &self.kind.label())
            .field("skip_when", &self.skip_when.is_some())
            .finish()
    }
}

impl Step {
    fn new(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            kind,
            skip_when: None,
        }
    }

    /// Output Step을 생성한다.
    pub fn output(name: impl Into<String>, message: impl Into<Message>) -> Self {
        Self::new(name, StepKind::Output(message.into()))
    }

    /// confirm Input Step을 생성한다.
    pub fn confirm(name: impl Into<String>, message: impl Into<Message>) -> Self {
        Self::new(
            name,
            StepKind::Input {
                message: message.into(),
                kind: InputKind::Confirm,
            },
        )
    }

    /// select Input Step을 생성한다.
    pub fn select(name: impl Into<String>, message: impl Into<Message>, choices: Vec<Choice>) -> Self {
        Self::new(
            name,
            StepKind::Input {
                message: message.into(),
                kind: InputKind::Select(choices),
            },
        )
    }

    /// text Input Step을 생성한다.
    pub fn text(
        name: impl Into<String>,
        message: impl Into<Message>,
        default: Option<String>,
    ) -> Self {
        Self::new(
            name,
            StepKind::Input {
                message: message.into(),
                kind: InputKind::Text { default },
            },
        )
    }

    /// Action Step을 생성한다.
    ///
    /// ```ignore
    /// Step::action("create_buckets", move |state, _ctx| {
    ///     let storage = storage.clone();
    ///     Box::pin(async move { /* ... */ Ok(()) })
    /// })
    /// ```
    pub fn action<F>(name: impl Into<String>, run: F) -> Self
    where
        F: for<'a> Fn(&'a mut ScenarioState, &'a RunContext) -> BoxFuture<'a, Result<(), ActionError>>
            + Send
            + Sync
            + 'static,
    {
        Self::new(
            name,
            StepKind::Action {
                run: Arc::new(run),
                repeat: None,
            },
        )
    }

    /// `key`가 `false`이면 종료 코드 0으로 시나리오를 멈추는 가드를 생성한다.
    pub fn exit_on_false(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(
            format!("exit_on_{key}_false"),
            StepKind::ExitGuard { key, exit_code: 0 },
        )
    }

    /// 하위 시나리오를 Step으로 감싼다. 이름은 시나리오 이름을 따른다.
    pub fn nested(scenario: Scenario) -> Self {
        Self::new(scenario.name().to_string(), StepKind::Nested(scenario))
    }

    /// 건너뛰기 조건을 지정한다.
    pub fn skip_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ScenarioState) -> bool + Send + Sync + 'static,
    {
        self.skip_when = Some(Arc::new(predicate));
        self
    }

    /// Action Step에 반복 구성을 붙인다. 다른 종류의 Step에는 영향이 없다.
    pub fn repeat_while<F>(mut self, predicate: F, input: Step, output: Step) -> Self
    where
        F: Fn(&ScenarioState) -> bool + Send + Sync + 'static,
    {
        if let StepKind::Action { repeat, .. } = &mut self.kind {
            *repeat = Some(WhileLoop {
                predicate: Arc::new(predicate),
                input: Box::new(input),
                output: Box::new(output),
            });
        }
        self
    }

    /// 현재 상태에서 건너뛰어야 하는지 확인한다.
    pub fn should_skip(&self, state: &ScenarioState) -> bool {
        self.skip_when.as_ref().map(|p| p(state)).unwrap_or(false)
    }
}

/// Step 실행의 결과를 표현한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum StepRunResult {
    /// 실행 성공.
    Completed,
    /// skip 조건으로 실행하지 않음.
    Skipped,
    /// 종료 가드가 시나리오를 멈춤.
    Halted { exit_code: i32 },
    /// 복구 가능한 실패. 시나리오는 계속된다.
    Failed(String),
}

/// 단일 Step을 실행하고 결과를 반환한다.
///
/// 시나리오 본문의 하위 시나리오는 runner가 기록을 이어 붙이며 직접 실행하고,
/// 여기서는 반복 구성 안에 들어간 경우만 처리한다.
pub(super) fn run_single_step<'a>(
    step: &'a Step,
    state: &'a mut ScenarioState,
    ctx: &'a RunContext,
) -> BoxFuture<'a, Result<StepRunResult, ScenarioError>> {
    Box::pin(async move {
        if step.should_skip(state) {
            log_step(ctx, &step.name, "skip 조건 충족, 실행하지 않습니다.");
            return Ok(StepRunResult::Skipped);
        }
        match &step.kind {
            StepKind::Output(message) => {
                execute_output(message, state, ctx);
                Ok(StepRunResult::Completed)
            }
            StepKind::Input { message, kind } => {
                execute_input(&step.name, message, kind, state, ctx).await?;
                Ok(StepRunResult::Completed)
            }
            StepKind::Action { run, repeat } => {
                execute_action(&step.name, run, repeat.as_ref(), state, ctx).await
            }
            StepKind::ExitGuard { key, exit_code } => {
                if state.get_bool(key) == Some(false) {
                    log_step(ctx, &step.name, &format!("{key} = false, 시나리오를 종료합니다."));
                    Ok(StepRunResult::Halted {
                        exit_code: *exit_code,
                    })
                } else {
                    Ok(StepRunResult::Completed)
                }
            }
            StepKind::Nested(scenario) => {
                let mut nested_runtime = ScenarioRuntime::new();
                match run_steps(scenario, state, ctx, &mut nested_runtime).await? {
                    RunOutcome::Completed => Ok(StepRunResult::Completed),
                    RunOutcome::Halted { exit_code, .. } => Ok(StepRunResult::Halted { exit_code }),
                }
            }
        }
    })
}
