use super::keys::{BucketNames, CONFIRM_CLEANUP};
use crate::engine::{ActionError, Step};
use crate::storage::{
    DeleteObjectInput, LegalHoldStatus, ObjectRef, SharedStorage, StorageClient, StorageError,
};
use tracing::{info, warn};

/// 버킷 하나를 정리한 결과이다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanOutcome {
    /// 버킷이 이미 없었다.
    AlreadyGone,
    /// 버전을 모두 지우고 버킷을 삭제했다.
    Removed { versions: usize },
}

/// 정리 확인 질문과 정리 Action을 만든다.
pub(super) fn clean_steps(storage: SharedStorage, prefix: String) -> Vec<Step> {
    vec![
        Step::confirm(
            CONFIRM_CLEANUP,
            "생성한 버킷과 파일을 모두 삭제할까요?",
        ),
        Step::exit_on_false(CONFIRM_CLEANUP),
        Step::action("clean_buckets", move |state, ctx| {
            let storage = storage.clone();
            let names = BucketNames::load(state).unwrap_or_else(|| BucketNames::from_prefix(&prefix));
            Box::pin(async move {
                for bucket in names.all() {
                    let line = match clean_bucket(storage.as_ref(), bucket).await? {
                        CleanOutcome::AlreadyGone => format!("{bucket}: 이미 삭제된 버킷입니다."),
                        CleanOutcome::Removed { versions } => {
                            format!("{bucket}: 객체 버전 {versions}개와 버킷을 삭제했습니다.")
                        }
                    };
                    ctx.console.write(&line);
                }
                Ok(())
            })
        }),
    ]
}

/// 버킷의 보호 설정을 풀고 모든 버전을 지운 뒤 버킷을 삭제한다.
///
/// 버킷이나 객체가 이미 없으면 성공으로 처리한다. 그 외 오류는 전파한다.
pub async fn clean_bucket(
    storage: &dyn StorageClient,
    bucket: &str,
) -> Result<CleanOutcome, ActionError> {
    let versions = match storage.list_object_versions(bucket).await {
        Ok(versions) => versions,
        Err(err) if err.is_not_found() => {
            info!(bucket, "버킷이 없어 정리를 건너뜀");
            return Ok(CleanOutcome::AlreadyGone);
        }
        Err(err) => return Err(err.into()),
    };
    let lock_enabled = storage
        .get_object_lock_configuration(bucket)
        .await?
        .map(|config| config.enabled)
        .unwrap_or(false);

    for version in &versions {
        let target = ObjectRef::new(bucket, version.key.clone(), version.version_id.clone());
        if lock_enabled && !version.is_delete_marker {
            clear_legal_hold(storage, &target).await?;
        }
        let deleted = storage
            .delete_object(DeleteObjectInput {
                bucket: bucket.to_string(),
                key: version.key.clone(),
                version_id: version.version_id.clone(),
                bypass_governance_retention: true,
            })
            .await;
        match deleted {
            Ok(()) => {}
            Err(err) if err.is_not_found() => warn!(%target, "이미 삭제된 객체"),
            Err(err) => return Err(err.into()),
        }
    }

    match storage.delete_bucket(bucket).await {
        Ok(()) => {}
        Err(StorageError::NoSuchBucket(_)) => {
            info!(bucket, "버킷이 이미 삭제됨");
            return Ok(CleanOutcome::AlreadyGone);
        }
        Err(err) => return Err(err.into()),
    }
    info!(bucket, versions = versions.len(), "버킷 정리 완료");
    Ok(CleanOutcome::Removed {
        versions: versions.len(),
    })
}

async fn clear_legal_hold(storage: &dyn StorageClient, target: &ObjectRef) -> Result<(), ActionError> {
    match storage.get_object_legal_hold(target).await {
        Ok(Some(LegalHoldStatus::On)) => {
            storage
                .put_object_legal_hold(target, LegalHoldStatus::Off)
                .await?;
            info!(%target, "법적 보존 해제");
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(err) if err.is_not_found() => Ok(()),
        Err(err) => Err(err.into()),
    }
}
