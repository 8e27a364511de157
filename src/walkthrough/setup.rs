use super::keys::{
    BUCKET_PREFIX, BucketNames, CONFIRM_CREATE_BUCKETS, CONFIRM_LEGAL_HOLD_FILE_ENABLED,
    CONFIRM_LEGAL_HOLD_FILE_RETENTION, CONFIRM_POPULATE_BUCKETS, CONFIRM_RETENTION_FILE_ENABLED,
    CONFIRM_RETENTION_FILE_RETENTION, CONFIRM_UPDATE_RETENTION, FILE_NAMES, not_confirmed,
};
use crate::config::WalkthroughConfig;
use crate::engine::{ActionError, Message, ScenarioState, Step};
use crate::storage::{
    CreateBucketInput, DefaultRetention, LegalHoldStatus, ObjectLockConfiguration, ObjectRef,
    ObjectRetention, PutObjectInput, RetentionMode, SharedStorage, StorageError,
};
use chrono::{Duration, Utc};
use tracing::{info, warn};

/// 버킷을 만들고 보존 설정을 적용하는 Step 목록을 만든다.
///
/// 각 단계 앞에는 confirm과 종료 가드가 있고, 파일 단위 보호 설정은
/// 거절하면 건너뛴다.
pub(super) fn deploy_steps(storage: &SharedStorage, config: &WalkthroughConfig) -> Vec<Step> {
    let mut steps = vec![
        Step::confirm(CONFIRM_CREATE_BUCKETS, "버킷 세 개를 생성할까요?"),
        Step::exit_on_false(CONFIRM_CREATE_BUCKETS),
        create_buckets(storage.clone(), config.bucket_prefix.clone()),
        Step::confirm(
            CONFIRM_UPDATE_RETENTION,
            format!(
                "생성 후 버킷에 {}일 GOVERNANCE 기본 보존 기간을 설정할까요?",
                config.retention_days
            ),
        ),
        Step::exit_on_false(CONFIRM_UPDATE_RETENTION),
        update_retention(storage.clone(), config.retention_days),
        Step::confirm(
            CONFIRM_POPULATE_BUCKETS,
            format!("각 버킷에 파일 {}개를 업로드할까요?", config.file_count),
        ),
        Step::exit_on_false(CONFIRM_POPULATE_BUCKETS),
        populate_buckets(storage.clone(), config.file_count),
    ];
    steps.extend(protect_file_steps(
        storage,
        config.retention_days,
        CONFIRM_LEGAL_HOLD_FILE_ENABLED,
        CONFIRM_RETENTION_FILE_ENABLED,
        |names| names.lock_enabled.clone(),
    ));
    steps.extend(protect_file_steps(
        storage,
        config.retention_days,
        CONFIRM_LEGAL_HOLD_FILE_RETENTION,
        CONFIRM_RETENTION_FILE_RETENTION,
        |names| names.retention.clone(),
    ));
    steps
}

fn bucket_names(state: &ScenarioState) -> Result<BucketNames, ActionError> {
    BucketNames::load(state)
        .ok_or_else(|| ActionError::Fatal(anyhow::anyhow!("버킷 이름이 상태에 없습니다.")))
}

/// 세 버킷을 만든다. 접두사는 입력받은 값, 없으면 설정 값을 쓴다.
///
/// 이미 있는 버킷은 그대로 재사용하고, 나머지를 모두 만든 뒤 복구 가능한 실패로 알린다.
fn create_buckets(storage: SharedStorage, default_prefix: String) -> Step {
    Step::action("create_buckets", move |state, ctx| {
        let storage = storage.clone();
        let prefix = state
            .get_str(BUCKET_PREFIX)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(default_prefix.as_str())
            .to_string();
        let names = BucketNames::from_prefix(&prefix);
        Box::pin(async move {
            let mut reused = Vec::new();
            for (bucket, lock) in [
                (&names.no_lock, false),
                (&names.lock_enabled, true),
                (&names.retention, false),
            ] {
                let created = storage
                    .create_bucket(CreateBucketInput {
                        bucket: bucket.clone(),
                        object_lock_enabled: lock,
                    })
                    .await;
                match created {
                    Ok(()) => {
                        info!(bucket = %bucket, object_lock = lock, "버킷 생성");
                        ctx.console.write(&format!("버킷 생성 완료: {bucket}"));
                    }
                    Err(StorageError::BucketAlreadyExists(_)) => {
                        warn!(bucket = %bucket, "이미 있는 버킷을 재사용");
                        reused.push(bucket.clone());
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            names.store(state);
            if reused.is_empty() {
                Ok(())
            } else {
                Err(ActionError::recoverable(format!(
                    "이미 있는 버킷을 재사용합니다: {}",
                    reused.join(", ")
                )))
            }
        })
    })
}

fn update_retention(storage: SharedStorage, days: u32) -> Step {
    Step::action("update_retention", move |state, ctx| {
        let storage = storage.clone();
        Box::pin(async move {
            let names = bucket_names(state)?;
            storage.put_bucket_versioning(&names.retention, true).await?;
            storage
                .put_object_lock_configuration(
                    &names.retention,
                    ObjectLockConfiguration {
                        enabled: true,
                        default_retention: Some(DefaultRetention {
                            mode: RetentionMode::Governance,
                            days,
                        }),
                    },
                )
                .await?;
            ctx.console.write(&format!(
                "{} 에 버전 관리와 {days}일 GOVERNANCE 기본 보존 기간을 설정했습니다.",
                names.retention
            ));
            Ok(())
        })
    })
}

fn populate_buckets(storage: SharedStorage, file_count: usize) -> Step {
    Step::action("populate_buckets", move |state, ctx| {
        let storage = storage.clone();
        Box::pin(async move {
            let names = bucket_names(state)?;
            let files: Vec<String> = (0..file_count).map(|i| format!("file{i}.txt")).collect();
            for bucket in names.all() {
                for file in &files {
                    storage
                        .put_object(PutObjectInput {
                            bucket: bucket.to_string(),
                            key: file.clone(),
                            body: format!("{file} 의 내용").into_bytes(),
                        })
                        .await?;
                }
                ctx.console
                    .write(&format!("{bucket} 에 파일 {}개 업로드", files.len()));
            }
            state.set_as(FILE_NAMES, &files)?;
            Ok(())
        })
    })
}

/// 한 버킷의 file0에 법적 보존을, file1에 보존 기간을 거는 선택 Step들을 만든다.
fn protect_file_steps(
    storage: &SharedStorage,
    days: u32,
    legal_hold_key: &'static str,
    retention_key: &'static str,
    pick: fn(&BucketNames) -> String,
) -> Vec<Step> {
    let hold_storage = storage.clone();
    let retention_storage = storage.clone();
    vec![
        Step::confirm(
            legal_hold_key,
            Message::render(move |state| {
                let bucket = BucketNames::load(state).map(|n| pick(&n)).unwrap_or_default();
                format!("{bucket} 의 file0.txt 에 법적 보존을 설정할까요?")
            }),
        ),
        Step::action(legal_hold_key.trim_start_matches("confirm_"), move |state, ctx| {
            let storage = hold_storage.clone();
            Box::pin(async move {
                let bucket = pick(&bucket_names(state)?);
                let target = ObjectRef::new(bucket, "file0.txt", None);
                storage
                    .put_object_legal_hold(&target, LegalHoldStatus::On)
                    .await?;
                ctx.console.write(&format!("법적 보존 설정: {target}"));
                Ok(())
            })
        })
        .skip_when(not_confirmed(legal_hold_key)),
        Step::confirm(
            retention_key,
            Message::render(move |state| {
                let bucket = BucketNames::load(state).map(|n| pick(&n)).unwrap_or_default();
                format!("{bucket} 의 file1.txt 에 {days}일 보존 기간을 설정할까요?")
            }),
        ),
        Step::action(retention_key.trim_start_matches("confirm_"), move |state, ctx| {
            let storage = retention_storage.clone();
            Box::pin(async move {
                let bucket = pick(&bucket_names(state)?);
                let target = ObjectRef::new(bucket, "file1.txt", None);
                let retention = ObjectRetention {
                    mode: RetentionMode::Governance,
                    retain_until: Utc::now() + Duration::days(i64::from(days)),
                };
                storage
                    .put_object_retention(&target, retention.clone(), false)
                    .await?;
                ctx.console.write(&format!(
                    "보존 기간 설정: {target} ({} 까지 {})",
                    retention.retain_until.format("%Y-%m-%d %H:%M"),
                    retention.mode
                ));
                Ok(())
            })
        })
        .skip_when(not_confirmed(retention_key)),
    ]
}
