use super::keys::{BUCKET_PREFIX, BucketNames, FILE_NAMES, WELCOME_CONTINUE};
use crate::engine::{Message, Step};

const WELCOME: &str = "\
객체 잠금 안내 시나리오에 오신 것을 환영합니다.
이 시나리오는 세 개의 버킷을 만들고 법적 보존(legal hold)과
보존 기간(retention) 설정이 객체 삭제·덮어쓰기에 어떤 영향을 주는지 보여줍니다.";

const BUCKETS_TEMPLATE: &str = "\
다음 버킷을 사용합니다:
  - ${bucket_prefix}-no-lock
  - ${bucket_prefix}-lock-enabled
  - ${bucket_prefix}-retention-after-creation";

/// 환영 문구, 버킷 접두사 입력, 계속 진행 여부 질문을 만든다.
pub(super) fn welcome_steps(default_prefix: &str) -> Vec<Step> {
    vec![
        Step::output("welcome", WELCOME),
        Step::text(
            BUCKET_PREFIX,
            "버킷 이름 접두사를 입력하세요.",
            Some(default_prefix.to_string()),
        ),
        Step::output("welcome_buckets", Message::template(BUCKETS_TEMPLATE)),
        Step::confirm(WELCOME_CONTINUE, "계속 진행할까요?"),
        Step::exit_on_false(WELCOME_CONTINUE),
    ]
}

/// 데모 단계 안내 문구를 만든다.
pub(super) fn demo_intro() -> Step {
    Step::output(
        "demo_intro",
        Message::render(|state| {
            let Some(names) = BucketNames::load(state) else {
                return "저장된 버킷 정보가 없습니다. deploy 단계를 먼저 실행하세요.".to_string();
            };
            let files = state
                .get_as::<Vec<String>>(FILE_NAMES)
                .ok()
                .flatten()
                .unwrap_or_default();
            format!(
                "버킷 {}, {}, {} 의 파일({})을 조작해 봅니다.",
                names.no_lock,
                names.lock_enabled,
                names.retention,
                files.join(", ")
            )
        }),
    )
}
