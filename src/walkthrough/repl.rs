use super::keys::{BucketNames, REPL_CHOICE, REPL_OUTPUT};
use crate::engine::{ActionError, Message, RunContext, Step};
use crate::prompt::{Choice, PromptError};
use crate::storage::{
    DeleteObjectInput, ObjectRef, PutObjectInput, SharedStorage, StorageClient, StorageError,
};
use chrono::Utc;
use tracing::debug;

/// REPL 메뉴 항목이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplChoice {
    ListAll,
    Delete,
    DeleteWithBypass,
    Overwrite,
    ViewRetention,
    ViewLegalHold,
    Exit,
}

impl ReplChoice {
    /// 메뉴 표시 순서.
    pub const ALL: [ReplChoice; 7] = [
        ReplChoice::ListAll,
        ReplChoice::Delete,
        ReplChoice::DeleteWithBypass,
        ReplChoice::Overwrite,
        ReplChoice::ViewRetention,
        ReplChoice::ViewLegalHold,
        ReplChoice::Exit,
    ];

    /// 상태에 기록되는 정수 코드. 종료는 0이다.
    pub fn code(self) -> i64 {
        match self {
            ReplChoice::ListAll => 1,
            ReplChoice::Delete => 2,
            ReplChoice::DeleteWithBypass => 3,
            ReplChoice::Overwrite => 4,
            ReplChoice::ViewRetention => 5,
            ReplChoice::ViewLegalHold => 6,
            ReplChoice::Exit => 0,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|choice| choice.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            ReplChoice::ListAll => "List all files in buckets",
            ReplChoice::Delete => "Attempt to delete a file",
            ReplChoice::DeleteWithBypass => {
                "Attempt to delete a file with retention period bypass"
            }
            ReplChoice::Overwrite => "Attempt to overwrite a file",
            ReplChoice::ViewRetention => {
                "View the object and bucket retention settings for a file"
            }
            ReplChoice::ViewLegalHold => "View the legal hold settings for a file",
            ReplChoice::Exit => "Exit",
        }
    }

    /// select 선택지로 변환한다.
    pub fn choices() -> Vec<Choice> {
        Self::ALL
            .into_iter()
            .map(|choice| Choice::new(choice.label(), choice.code()))
            .collect()
    }
}

/// REPL 반복 Action을 만든다.
///
/// 매 회차 메뉴를 고르고, 종료(0)가 아니면 처리 결과를 `repl_output`에 기록해 출력한다.
/// 저장소 호출 실패는 결과 문자열로 바뀌며 반복을 멈추지 않는다.
pub(super) fn repl_step(storage: SharedStorage) -> Step {
    Step::action("demo_repl", move |state, ctx| {
        let storage = storage.clone();
        Box::pin(async move {
            let code = state.get_i64(REPL_CHOICE).unwrap_or_default();
            let output = match (ReplChoice::from_code(code), BucketNames::load(state)) {
                (None, _) => format!("알 수 없는 메뉴 코드입니다: {code}"),
                (Some(_), None) => {
                    "저장된 버킷 정보가 없습니다. deploy 단계를 먼저 실행하세요.".to_string()
                }
                (Some(choice), Some(names)) => {
                    handle_choice(choice, &names, storage.as_ref(), ctx).await?
                }
            };
            state.set(REPL_OUTPUT, output);
            Ok(())
        })
    })
    .repeat_while(
        |state| state.get_i64(REPL_CHOICE) != Some(ReplChoice::Exit.code()),
        Step::select(REPL_CHOICE, "무엇을 해볼까요?", ReplChoice::choices()),
        Step::output(
            "repl_result",
            Message::render(|state| state.get_str(REPL_OUTPUT).unwrap_or_default().to_string()),
        ),
    )
}

/// 메뉴 하나를 처리하고 결과 문자열을 반환한다.
///
/// 입력 채널 오류만 전파한다.
pub(super) async fn handle_choice(
    choice: ReplChoice,
    names: &BucketNames,
    storage: &dyn StorageClient,
    ctx: &RunContext,
) -> Result<String, ActionError> {
    debug!(?choice, "REPL 메뉴 처리");
    if choice == ReplChoice::ListAll {
        return Ok(list_all(names, storage).await);
    }
    if choice == ReplChoice::Exit {
        return Ok(String::new());
    }
    let Some(target) = choose_file(names, storage, ctx).await? else {
        return Ok("선택할 수 있는 파일이 없습니다.".to_string());
    };
    Ok(match choice {
        ReplChoice::Delete => delete_file(storage, &target, false).await,
        ReplChoice::DeleteWithBypass => delete_file(storage, &target, true).await,
        ReplChoice::Overwrite => overwrite_file(storage, &target).await,
        ReplChoice::ViewRetention => view_retention(storage, &target).await,
        ReplChoice::ViewLegalHold => view_legal_hold(storage, &target).await,
        ReplChoice::ListAll | ReplChoice::Exit => String::new(),
    })
}

async fn list_all(names: &BucketNames, storage: &dyn StorageClient) -> String {
    let mut lines = Vec::new();
    for bucket in names.all() {
        match storage.list_object_versions(bucket).await {
            Ok(versions) => {
                lines.push(format!("{bucket}:"));
                for version in versions.iter().filter(|v| !v.is_delete_marker) {
                    lines.push(format!(
                        "  {} (version {})",
                        version.key,
                        version.version_id.as_deref().unwrap_or("null")
                    ));
                }
            }
            Err(err) => lines.push(format!("{bucket}: 조회 실패 - {err}")),
        }
    }
    lines.join("\n")
}

/// 모든 버킷의 객체 버전 중 하나를 고르게 한다.
async fn choose_file(
    names: &BucketNames,
    storage: &dyn StorageClient,
    ctx: &RunContext,
) -> Result<Option<ObjectRef>, PromptError> {
    let mut targets = Vec::new();
    for bucket in names.all() {
        match storage.list_object_versions(bucket).await {
            Ok(versions) => targets.extend(
                versions
                    .into_iter()
                    .filter(|v| !v.is_delete_marker)
                    .map(|v| ObjectRef::new(bucket, v.key, v.version_id)),
            ),
            Err(err) => debug!(bucket, error = %err, "파일 목록 조회 실패"),
        }
    }
    if targets.is_empty() {
        return Ok(None);
    }
    let choices: Vec<Choice> = targets
        .iter()
        .map(|target| Choice::new(target.to_string(), target.to_string()))
        .collect();
    let index = ctx.prompter.select("대상 파일을 고르세요.", &choices).await?;
    Ok(targets.into_iter().nth(index))
}

/// 객체 버전 하나를 삭제하고 결과 문자열을 반환한다.
pub(super) async fn delete_file(
    storage: &dyn StorageClient,
    target: &ObjectRef,
    bypass_governance_retention: bool,
) -> String {
    let input = DeleteObjectInput {
        bucket: target.bucket.clone(),
        key: target.key.clone(),
        version_id: target.version_id.clone(),
        bypass_governance_retention,
    };
    match storage.delete_object(input).await {
        Ok(()) if bypass_governance_retention => {
            format!("보존 기간을 우회해 삭제했습니다: {target}")
        }
        Ok(()) => format!("삭제했습니다: {target}"),
        Err(err) => describe_failure("삭제", target, &err),
    }
}

async fn overwrite_file(storage: &dyn StorageClient, target: &ObjectRef) -> String {
    let input = PutObjectInput {
        bucket: target.bucket.clone(),
        key: target.key.clone(),
        body: format!("{} 덮어쓰기 {}", target.key, Utc::now().to_rfc3339()).into_bytes(),
    };
    match storage.put_object(input).await {
        Ok(output) => format!(
            "덮어썼습니다: {}/{} (새 version {})",
            target.bucket,
            target.key,
            output.version_id.as_deref().unwrap_or("null")
        ),
        Err(err) => describe_failure("덮어쓰기", target, &err),
    }
}

async fn view_retention(storage: &dyn StorageClient, target: &ObjectRef) -> String {
    let object = match storage.get_object_retention(target).await {
        Ok(Some(retention)) => format!(
            "{} 모드, {} 까지",
            retention.mode,
            retention.retain_until.to_rfc3339()
        ),
        Ok(None) => "설정 없음".to_string(),
        Err(err) => format!("조회 실패 - {err}"),
    };
    let bucket = match storage.get_object_lock_configuration(&target.bucket).await {
        Ok(Some(config)) => match config.default_retention {
            Some(rule) => format!("객체 잠금 활성화, 기본 보존 {} {}일", rule.mode, rule.days),
            None => format!("객체 잠금 활성화: {}", config.enabled),
        },
        Ok(None) => "객체 잠금 설정 없음".to_string(),
        Err(err) => format!("조회 실패 - {err}"),
    };
    format!("{target}\n  객체 보존: {object}\n  버킷 설정: {bucket}")
}

async fn view_legal_hold(storage: &dyn StorageClient, target: &ObjectRef) -> String {
    match storage.get_object_legal_hold(target).await {
        Ok(Some(status)) => format!("{target}\n  법적 보존: {status}"),
        Ok(None) => format!("{target}\n  법적 보존: 설정 없음"),
        Err(err) => describe_failure("법적 보존 조회", target, &err),
    }
}

fn describe_failure(action: &str, target: &ObjectRef, err: &StorageError) -> String {
    format!("{action} 실패: {target}\n  {err}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::TestHarness;
    use crate::engine::{Scenario, ScenarioError, ScenarioState};
    use crate::prompt::scripted::ScriptedAnswer;
    use crate::storage::{
        CreateBucketInput, InMemoryStorage, LegalHoldStatus, ObjectLockConfiguration,
        ObjectRetention, ObjectVersion, PutObjectOutput,
    };
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// delete_object 입력만 기록하는 목업 저장소이다.
    #[derive(Default)]
    struct RecordingStorage {
        deletes: Mutex<Vec<DeleteObjectInput>>,
    }

    fn unused<T>() -> Result<T, StorageError> {
        Err(StorageError::Backend("테스트에서 사용하지 않음".into()))
    }

    #[async_trait]
    impl StorageClient for RecordingStorage {
        async fn create_bucket(&self, _input: CreateBucketInput) -> Result<(), StorageError> {
            unused()
        }
        async fn delete_bucket(&self, _bucket: &str) -> Result<(), StorageError> {
            unused()
        }
        async fn put_bucket_versioning(&self, _bucket: &str, _on: bool) -> Result<(), StorageError> {
            unused()
        }
        async fn put_object_lock_configuration(
            &self,
            _bucket: &str,
            _config: ObjectLockConfiguration,
        ) -> Result<(), StorageError> {
            unused()
        }
        async fn get_object_lock_configuration(
            &self,
            _bucket: &str,
        ) -> Result<Option<ObjectLockConfiguration>, StorageError> {
            unused()
        }
        async fn list_object_versions(
            &self,
            _bucket: &str,
        ) -> Result<Vec<ObjectVersion>, StorageError> {
            unused()
        }
        async fn put_object(&self, _input: PutObjectInput) -> Result<PutObjectOutput, StorageError> {
            unused()
        }
        async fn delete_object(&self, input: DeleteObjectInput) -> Result<(), StorageError> {
            self.deletes.lock().expect("mutex poisoned").push(input);
            Ok(())
        }
        async fn get_object_legal_hold(
            &self,
            _target: &ObjectRef,
        ) -> Result<Option<LegalHoldStatus>, StorageError> {
            unused()
        }
        async fn put_object_legal_hold(
            &self,
            _target: &ObjectRef,
            _status: LegalHoldStatus,
        ) -> Result<(), StorageError> {
            unused()
        }
        async fn get_object_retention(
            &self,
            _target: &ObjectRef,
        ) -> Result<Option<ObjectRetention>, StorageError> {
            unused()
        }
        async fn put_object_retention(
            &self,
            _target: &ObjectRef,
            _retention: ObjectRetention,
            _bypass: bool,
        ) -> Result<(), StorageError> {
            unused()
        }
    }

    /// 보존 기간 우회 삭제가 저장소에 정확한 입력을 전달하는지 검증한다.
    #[tokio::test]
    async fn delete_with_bypass_sends_exact_input() {
        let storage = RecordingStorage::default();
        let mut state = ScenarioState::new();
        state.set("bucketA", "bucket-a");
        state.set("bucketB", "bucket-b");
        let bucket = state.get_str("bucketA").expect("bucketA 없음");
        let target = ObjectRef::new(bucket, "k", Some("v".to_string()));

        let output = delete_file(&storage, &target, true).await;

        assert!(output.contains("우회"));
        let deletes = storage.deletes.lock().expect("mutex poisoned").clone();
        assert_eq!(
            deletes,
            vec![DeleteObjectInput {
                bucket: "bucket-a".into(),
                key: "k".into(),
                version_id: Some("v".into()),
                bypass_governance_retention: true,
            }]
        );
    }

    /// 메뉴 코드가 선택지 값과 일치하는지 검증한다.
    #[test]
    fn menu_codes_round_trip() {
        for choice in ReplChoice::ALL {
            assert_eq!(ReplChoice::from_code(choice.code()), Some(choice));
        }
        assert_eq!(ReplChoice::from_code(42), None);
        assert_eq!(ReplChoice::choices().len(), 7);
        assert_eq!(ReplChoice::choices()[6].value, serde_json::json!(0));
    }

    async fn deployed_storage(names: &BucketNames) -> Arc<InMemoryStorage> {
        let storage = Arc::new(InMemoryStorage::new());
        for (bucket, lock) in [(&names.no_lock, false), (&names.lock_enabled, true), (&names.retention, false)] {
            storage
                .create_bucket(CreateBucketInput {
                    bucket: bucket.clone(),
                    object_lock_enabled: lock,
                })
                .await
                .expect("버킷 생성 실패");
        }
        storage
            .put_object(PutObjectInput {
                bucket: names.lock_enabled.clone(),
                key: "file0.txt".into(),
                body: b"zero".to_vec(),
            })
            .await
            .expect("업로드 실패");
        storage
    }

    /// 목록 조회 후 종료를 고르면 정확히 한 번만 처리되는지 검증한다.
    #[tokio::test]
    async fn list_then_exit_runs_one_iteration() {
        let names = BucketNames::from_prefix("repl");
        let storage = deployed_storage(&names).await;
        let harness = TestHarness::new([ScriptedAnswer::Select(0), ScriptedAnswer::Select(6)]);
        let scenario =
            Scenario::new("demo", vec![repl_step(storage.clone())]).expect("시나리오 생성 실패");
        let mut state = ScenarioState::new();
        names.store(&mut state);

        scenario.run(&mut state, &harness.ctx).await.expect("실행 실패");

        let lines = harness.console.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("repl-lock-enabled:"));
        assert!(lines[0].contains("file0.txt"));
        assert_eq!(state.get_i64(REPL_CHOICE), Some(0));
        assert_eq!(harness.prompter.remaining(), 0);
    }

    /// 법적 보존으로 삭제가 거부되어도 반복이 계속되는지 검증한다.
    #[tokio::test]
    async fn failed_delete_is_reported_and_loop_continues() {
        let names = BucketNames::from_prefix("hold");
        let storage = deployed_storage(&names).await;
        let versions = storage
            .list_object_versions(&names.lock_enabled)
            .await
            .expect("목록 조회 실패");
        let target = ObjectRef::new(
            names.lock_enabled.clone(),
            "file0.txt",
            versions[0].version_id.clone(),
        );
        storage
            .put_object_legal_hold(&target, LegalHoldStatus::On)
            .await
            .expect("법적 보존 설정 실패");
        let harness = TestHarness::new([
            ScriptedAnswer::Select(2),
            ScriptedAnswer::Select(0),
            ScriptedAnswer::Select(5),
            ScriptedAnswer::Select(0),
            ScriptedAnswer::Select(6),
        ]);
        let scenario =
            Scenario::new("demo", vec![repl_step(storage.clone())]).expect("시나리오 생성 실패");
        let mut state = ScenarioState::new();
        names.store(&mut state);

        scenario.run(&mut state, &harness.ctx).await.expect("실행 실패");

        let lines = harness.console.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("삭제 실패"));
        assert!(lines[1].contains("법적 보존: ON"));
        let remaining = storage
            .list_object_versions(&names.lock_enabled)
            .await
            .expect("목록 조회 실패");
        assert_eq!(remaining.len(), 1);
    }

    /// 버킷 정보 없이 메뉴를 고르면 안내 문구가 기록되는지 검증한다.
    #[tokio::test]
    async fn missing_buckets_are_reported_inline() {
        let storage = Arc::new(InMemoryStorage::new());
        let harness = TestHarness::new([ScriptedAnswer::Select(1), ScriptedAnswer::Select(6)]);
        let scenario = Scenario::new("demo", vec![repl_step(storage)]).expect("시나리오 생성 실패");
        let mut state = ScenarioState::new();

        scenario.run(&mut state, &harness.ctx).await.expect("실행 실패");

        assert!(state
            .get_str(REPL_OUTPUT)
            .expect("결과 없음")
            .contains("deploy"));
    }

    /// 파일 선택 중 입력이 끊기면 Input Step과 같은 InputClosed로 중단되는지 검증한다.
    #[tokio::test]
    async fn closed_input_in_file_picker_is_input_closed() {
        let names = BucketNames::from_prefix("eof");
        let storage = deployed_storage(&names).await;
        let harness = TestHarness::new([ScriptedAnswer::Select(1)]);
        let scenario =
            Scenario::new("demo", vec![repl_step(storage.clone())]).expect("시나리오 생성 실패");
        let mut state = ScenarioState::new();
        names.store(&mut state);

        let err = scenario
            .run(&mut state, &harness.ctx)
            .await
            .expect_err("입력 종료가 오류가 아닙니다");

        assert!(matches!(err, ScenarioError::InputClosed { ref step } if step == "demo_repl"));
        assert_eq!(harness.prompter.asked().len(), 2);
        assert_eq!(
            storage
                .list_object_versions(&names.lock_enabled)
                .await
                .expect("목록 조회 실패")
                .len(),
            1
        );
    }
}
