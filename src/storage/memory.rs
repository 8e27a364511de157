use super::{
    CreateBucketInput, DeleteObjectInput, LegalHoldStatus, ObjectLockConfiguration, ObjectRef,
    ObjectRetention, ObjectVersion, PutObjectInput, PutObjectOutput, RetentionMode, StorageClient,
    StorageError,
};
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// 버전 관리가 꺼진 버킷의 객체가 갖는 버전 ID이다.
const NULL_VERSION: &str = "null";

/// 객체 버전 하나의 저장 형태이다.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredVersion {
    key: String,
    version_id: String,
    is_delete_marker: bool,
    #[serde(default)]
    body: Vec<u8>,
    legal_hold: Option<LegalHoldStatus>,
    retention: Option<ObjectRetention>,
}

/// 버킷 하나의 저장 형태이다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BucketData {
    versioning: bool,
    lock: Option<ObjectLockConfiguration>,
    /// 업로드 순서대로 쌓인 버전 목록.
    versions: Vec<StoredVersion>,
    next_version: u64,
}

impl BucketData {
    fn lock_enabled(&self) -> bool {
        self.lock.as_ref().map(|c| c.enabled).unwrap_or(false)
    }

    fn require_lock(&self, bucket: &str) -> Result<(), StorageError> {
        if self.lock_enabled() {
            Ok(())
        } else {
            Err(StorageError::InvalidRequest(format!(
                "버킷에 객체 잠금 설정이 없습니다: {bucket}"
            )))
        }
    }

    fn allocate_version(&mut self) -> String {
        if !self.versioning {
            return NULL_VERSION.to_string();
        }
        self.next_version += 1;
        format!("v{:06}", self.next_version)
    }

    /// 지정한 버전, 또는 키의 최신 버전 위치를 찾는다.
    fn position(&self, key: &str, version_id: Option<&str>) -> Option<usize> {
        match version_id {
            Some(version) => self
                .versions
                .iter()
                .position(|v| v.key == key && v.version_id == version),
            None => self
                .versions
                .iter()
                .rposition(|v| v.key == key)
                .filter(|&index| !self.versions[index].is_delete_marker),
        }
    }

    fn version_mut(
        &mut self,
        bucket: &str,
        target: &ObjectRef,
    ) -> Result<&mut StoredVersion, StorageError> {
        let index = self
            .position(&target.key, target.version_id.as_deref())
            .ok_or_else(|| StorageError::NoSuchKey {
                bucket: bucket.to_string(),
                key: target.key.clone(),
            })?;
        Ok(&mut self.versions[index])
    }
}

/// 보존 설정이 아직 유효한지 확인한다.
fn retention_active(retention: &ObjectRetention) -> bool {
    retention.retain_until > Utc::now()
}

/// 파일로 저장·복원 가능한 저장소 전체 상태이다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreSnapshot {
    buckets: BTreeMap<String, BucketData>,
}

/// 프로세스 메모리에서 동작하는 StorageClient 구현이다.
///
/// 법적 보존과 GOVERNANCE/COMPLIANCE 보존 기간을 실제 저장소처럼 검사하며,
/// 내용을 JSON 파일로 저장해 다른 실행 단계와 공유할 수 있다.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    /// 버킷 맵이다.
    inner: Mutex<StoreSnapshot>,
}

impl InMemoryStorage {
    /// 비어 있는 저장소를 생성한다.
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// 스냅샷 파일에서 저장소를 복원한다. 파일이 없으면 빈 저장소를 반환한다.
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        let snapshot = match fs::read_to_string(path).await {
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("저장소 스냅샷 해석 실패: {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreSnapshot::default(),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("저장소 스냅샷 읽기 실패: {}", path.display()));
            }
        };
        Ok(Self {
            inner: Mutex::new(snapshot),
        })
    }

    /// 현재 저장소 내용을 스냅샷 파일로 기록한다. 상위 디렉터리가 없으면 만든다.
    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        let text = {
            let guard = self.inner.lock().await;
            serde_json::to_string_pretty(&*guard).context("저장소 스냅샷 직렬화 실패")?
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("디렉터리 생성 실패: {}", parent.display()))?;
        }
        fs::write(path, text)
            .await
            .with_context(|| format!("저장소 스냅샷 쓰기 실패: {}", path.display()))
    }

    /// 존재하는 버킷 이름을 반환한다.
    #[cfg(test)]
    pub async fn bucket_names(&self) -> Vec<String> {
        self.inner.lock().await.buckets.keys().cloned().collect()
    }
}

fn bucket_mut<'a>(
    snapshot: &'a mut StoreSnapshot,
    bucket: &str,
) -> Result<&'a mut BucketData, StorageError> {
    snapshot
        .buckets
        .get_mut(bucket)
        .ok_or_else(|| StorageError::NoSuchBucket(bucket.to_string()))
}

#[async_trait]
impl StorageClient for InMemoryStorage {
    async fn create_bucket(&self, input: CreateBucketInput) -> Result<(), StorageError> {
        let mut guard = self.inner.lock().await;
        if guard.buckets.contains_key(&input.bucket) {
            return Err(StorageError::BucketAlreadyExists(input.bucket));
        }
        let data = BucketData {
            versioning: input.object_lock_enabled,
            lock: input.object_lock_enabled.then(|| ObjectLockConfiguration {
                enabled: true,
                default_retention: None,
            }),
            ..BucketData::default()
        };
        debug!(bucket = %input.bucket, lock = input.object_lock_enabled, "버킷 생성");
        guard.buckets.insert(input.bucket, data);
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let mut guard = self.inner.lock().await;
        let data = bucket_mut(&mut guard, bucket)?;
        if !data.versions.is_empty() {
            return Err(StorageError::BucketNotEmpty(bucket.to_string()));
        }
        guard.buckets.remove(bucket);
        debug!(bucket, "버킷 삭제");
        Ok(())
    }

    async fn put_bucket_versioning(&self, bucket: &str, enabled: bool) -> Result<(), StorageError> {
        let mut guard = self.inner.lock().await;
        let data = bucket_mut(&mut guard, bucket)?;
        if !enabled && data.lock_enabled() {
            return Err(StorageError::InvalidRequest(format!(
                "객체 잠금이 켜진 버킷은 버전 관리를 끌 수 없습니다: {bucket}"
            )));
        }
        data.versioning = enabled;
        Ok(())
    }

    async fn put_object_lock_configuration(
        &self,
        bucket: &str,
        config: ObjectLockConfiguration,
    ) -> Result<(), StorageError> {
        let mut guard = self.inner.lock().await;
        let data = bucket_mut(&mut guard, bucket)?;
        if !data.versioning {
            return Err(StorageError::InvalidRequest(format!(
                "객체 잠금을 켜려면 버전 관리가 필요합니다: {bucket}"
            )));
        }
        if !config.enabled {
            return Err(StorageError::InvalidRequest(format!(
                "객체 잠금은 해제할 수 없습니다: {bucket}"
            )));
        }
        data.lock = Some(config);
        Ok(())
    }

    async fn get_object_lock_configuration(
        &self,
        bucket: &str,
    ) -> Result<Option<ObjectLockConfiguration>, StorageError> {
        let mut guard = self.inner.lock().await;
        let data = bucket_mut(&mut guard, bucket)?;
        Ok(data.lock.clone())
    }

    async fn list_object_versions(&self, bucket: &str) -> Result<Vec<ObjectVersion>, StorageError> {
        let mut guard = self.inner.lock().await;
        let data = bucket_mut(&mut guard, bucket)?;
        let mut listed: Vec<(usize, ObjectVersion)> = data
            .versions
            .iter()
            .enumerate()
            .map(|(index, v)| {
                let is_latest = data.versions[index + 1..].iter().all(|later| later.key != v.key);
                (
                    index,
                    ObjectVersion {
                        key: v.key.clone(),
                        version_id: Some(v.version_id.clone()),
                        is_latest,
                        is_delete_marker: v.is_delete_marker,
                    },
                )
            })
            .collect();
        // 키 순서, 같은 키는 최신 버전부터.
        listed.sort_by(|(ia, a), (ib, b)| a.key.cmp(&b.key).then(ib.cmp(ia)));
        Ok(listed.into_iter().map(|(_, v)| v).collect())
    }

    async fn put_object(&self, input: PutObjectInput) -> Result<PutObjectOutput, StorageError> {
        let mut guard = self.inner.lock().await;
        let data = bucket_mut(&mut guard, &input.bucket)?;
        let retention = data
            .lock
            .as_ref()
            .and_then(|c| c.default_retention.as_ref())
            .map(|rule| ObjectRetention {
                mode: rule.mode,
                retain_until: Utc::now() + chrono::Duration::days(i64::from(rule.days)),
            });
        if !data.versioning {
            data.versions.retain(|v| v.key != input.key);
        }
        let version_id = data.allocate_version();
        data.versions.push(StoredVersion {
            key: input.key,
            version_id: version_id.clone(),
            is_delete_marker: false,
            body: input.body,
            legal_hold: None,
            retention,
        });
        Ok(PutObjectOutput {
            version_id: data.versioning.then_some(version_id),
        })
    }

    async fn delete_object(&self, input: DeleteObjectInput) -> Result<(), StorageError> {
        let mut guard = self.inner.lock().await;
        let data = bucket_mut(&mut guard, &input.bucket)?;
        let Some(version) = input.version_id.as_deref() else {
            if data.versioning {
                let version_id = data.allocate_version();
                data.versions.push(StoredVersion {
                    key: input.key,
                    version_id,
                    is_delete_marker: true,
                    body: Vec::new(),
                    legal_hold: None,
                    retention: None,
                });
            } else {
                data.versions.retain(|v| v.key != input.key);
            }
            return Ok(());
        };
        let Some(index) = data.position(&input.key, Some(version)) else {
            return Ok(());
        };
        let stored = &data.versions[index];
        if stored.legal_hold == Some(LegalHoldStatus::On) {
            return Err(StorageError::AccessDenied(format!(
                "법적 보존이 적용된 객체입니다: {}/{} ({version})",
                input.bucket, input.key
            )));
        }
        if let Some(retention) = stored.retention.as_ref().filter(|r| retention_active(r)) {
            let blocked = match retention.mode {
                RetentionMode::Compliance => true,
                RetentionMode::Governance => !input.bypass_governance_retention,
            };
            if blocked {
                return Err(StorageError::AccessDenied(format!(
                    "{} 보존 기간({})이 끝나지 않은 객체입니다: {}/{} ({version})",
                    retention.mode, retention.retain_until, input.bucket, input.key
                )));
            }
        }
        data.versions.remove(index);
        Ok(())
    }

    async fn get_object_legal_hold(
        &self,
        target: &ObjectRef,
    ) -> Result<Option<LegalHoldStatus>, StorageError> {
        let mut guard = self.inner.lock().await;
        let data = bucket_mut(&mut guard, &target.bucket)?;
        data.require_lock(&target.bucket)?;
        Ok(data.version_mut(&target.bucket, target)?.legal_hold)
    }

    async fn put_object_legal_hold(
        &self,
        target: &ObjectRef,
        status: LegalHoldStatus,
    ) -> Result<(), StorageError> {
        let mut guard = self.inner.lock().await;
        let data = bucket_mut(&mut guard, &target.bucket)?;
        data.require_lock(&target.bucket)?;
        data.version_mut(&target.bucket, target)?.legal_hold = Some(status);
        Ok(())
    }

    async fn get_object_retention(
        &self,
        target: &ObjectRef,
    ) -> Result<Option<ObjectRetention>, StorageError> {
        let mut guard = self.inner.lock().await;
        let data = bucket_mut(&mut guard, &target.bucket)?;
        data.require_lock(&target.bucket)?;
        Ok(data.version_mut(&target.bucket, target)?.retention.clone())
    }

    async fn put_object_retention(
        &self,
        target: &ObjectRef,
        retention: ObjectRetention,
        bypass_governance_retention: bool,
    ) -> Result<(), StorageError> {
        let mut guard = self.inner.lock().await;
        let data = bucket_mut(&mut guard, &target.bucket)?;
        data.require_lock(&target.bucket)?;
        let stored = data.version_mut(&target.bucket, target)?;
        if let Some(current) = stored.retention.as_ref().filter(|r| retention_active(r)) {
            let weakens = retention.retain_until < current.retain_until || retention.mode != current.mode;
            let blocked = match current.mode {
                RetentionMode::Compliance => weakens,
                RetentionMode::Governance => weakens && !bypass_governance_retention,
            };
            if blocked {
                return Err(StorageError::AccessDenied(format!(
                    "기존 {} 보존 설정을 약화할 수 없습니다: {target}",
                    current.mode
                )));
            }
        }
        stored.retention = Some(retention);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DefaultRetention;

    async fn locked_bucket_with_file(storage: &InMemoryStorage) -> String {
        storage
            .create_bucket(CreateBucketInput {
                bucket: "locked".into(),
                object_lock_enabled: true,
            })
            .await
            .expect("버킷 생성 실패");
        storage
            .put_object(PutObjectInput {
                bucket: "locked".into(),
                key: "file0.txt".into(),
                body: b"content".to_vec(),
            })
            .await
            .expect("업로드 실패")
            .version_id
            .expect("버전 ID 없음")
    }

    fn delete_input(version: &str, bypass: bool) -> DeleteObjectInput {
        DeleteObjectInput {
            bucket: "locked".into(),
            key: "file0.txt".into(),
            version_id: Some(version.to_string()),
            bypass_governance_retention: bypass,
        }
    }

    /// 법적 보존이 걸린 버전은 우회 옵션과 관계없이 삭제할 수 없는지 검증한다.
    #[tokio::test]
    async fn legal_hold_blocks_delete_until_cleared() {
        let storage = InMemoryStorage::new();
        let version = locked_bucket_with_file(&storage).await;
        let target = ObjectRef::new("locked", "file0.txt", Some(version.clone()));
        storage
            .put_object_legal_hold(&target, LegalHoldStatus::On)
            .await
            .expect("법적 보존 설정 실패");

        let err = storage
            .delete_object(delete_input(&version, true))
            .await
            .expect_err("법적 보존 중 삭제는 실패해야 한다");
        assert!(matches!(err, StorageError::AccessDenied(_)));

        storage
            .put_object_legal_hold(&target, LegalHoldStatus::Off)
            .await
            .expect("법적 보존 해제 실패");
        storage
            .delete_object(delete_input(&version, false))
            .await
            .expect("해제 후 삭제는 성공해야 한다");
    }

    /// GOVERNANCE 보존은 우회 옵션이 있을 때만 삭제되는지 검증한다.
    #[tokio::test]
    async fn governance_retention_requires_bypass() {
        let storage = InMemoryStorage::new();
        let version = locked_bucket_with_file(&storage).await;
        let target = ObjectRef::new("locked", "file0.txt", Some(version.clone()));
        storage
            .put_object_retention(
                &target,
                ObjectRetention {
                    mode: RetentionMode::Governance,
                    retain_until: Utc::now() + chrono::Duration::days(1),
                },
                false,
            )
            .await
            .expect("보존 설정 실패");

        assert!(storage.delete_object(delete_input(&version, false)).await.is_err());
        storage
            .delete_object(delete_input(&version, true))
            .await
            .expect("우회 삭제는 성공해야 한다");
        assert!(storage
            .list_object_versions("locked")
            .await
            .expect("목록 조회 실패")
            .is_empty());
    }

    /// 기본 보존 규칙이 새 객체에 적용되는지 검증한다.
    #[tokio::test]
    async fn default_retention_applies_to_new_objects() {
        let storage = InMemoryStorage::new();
        storage
            .create_bucket(CreateBucketInput {
                bucket: "later".into(),
                object_lock_enabled: false,
            })
            .await
            .expect("버킷 생성 실패");
        let config = ObjectLockConfiguration {
            enabled: true,
            default_retention: Some(DefaultRetention {
                mode: RetentionMode::Governance,
                days: 1,
            }),
        };
        let err = storage
            .put_object_lock_configuration("later", config.clone())
            .await
            .expect_err("버전 관리 없이 잠금 설정은 실패해야 한다");
        assert!(matches!(err, StorageError::InvalidRequest(_)));

        storage
            .put_bucket_versioning("later", true)
            .await
            .expect("버전 관리 설정 실패");
        storage
            .put_object_lock_configuration("later", config)
            .await
            .expect("잠금 설정 실패");
        let output = storage
            .put_object(PutObjectInput {
                bucket: "later".into(),
                key: "file1.txt".into(),
                body: Vec::new(),
            })
            .await
            .expect("업로드 실패");
        let retention = storage
            .get_object_retention(&ObjectRef::new("later", "file1.txt", output.version_id))
            .await
            .expect("보존 조회 실패")
            .expect("기본 보존이 적용되어야 한다");
        assert_eq!(retention.mode, RetentionMode::Governance);
    }

    /// 버전 관리 버킷에서 덮어쓰기와 삭제가 새 버전/삭제 마커를 만드는지 검증한다.
    #[tokio::test]
    async fn versioned_bucket_keeps_history() {
        let storage = InMemoryStorage::new();
        locked_bucket_with_file(&storage).await;
        storage
            .put_object(PutObjectInput {
                bucket: "locked".into(),
                key: "file0.txt".into(),
                body: b"new".to_vec(),
            })
            .await
            .expect("덮어쓰기 실패");
        storage
            .delete_object(DeleteObjectInput {
                bucket: "locked".into(),
                key: "file0.txt".into(),
                version_id: None,
                bypass_governance_retention: false,
            })
            .await
            .expect("삭제 마커 생성 실패");

        let versions = storage
            .list_object_versions("locked")
            .await
            .expect("목록 조회 실패");
        assert_eq!(versions.len(), 3);
        assert!(versions[0].is_latest && versions[0].is_delete_marker);
        assert!(versions[1..].iter().all(|v| !v.is_latest && !v.is_delete_marker));
    }

    /// 스냅샷 파일로 저장 후 복원한 저장소가 같은 내용을 갖는지 검증한다.
    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().expect("임시 디렉터리 생성 실패");
        let path = dir.path().join("store.json");
        let storage = InMemoryStorage::new();
        locked_bucket_with_file(&storage).await;
        storage.save(&path).await.expect("저장 실패");

        let reopened = InMemoryStorage::open(&path).await.expect("복원 실패");
        assert_eq!(reopened.bucket_names().await, vec!["locked".to_string()]);
        let missing = InMemoryStorage::open(&dir.path().join("none.json"))
            .await
            .expect("없는 파일은 빈 저장소여야 한다");
        assert!(missing.bucket_names().await.is_empty());
    }

    /// 상위 디렉터리가 없는 경로에도 스냅샷을 기록하는지 검증한다.
    #[tokio::test]
    async fn snapshot_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().expect("임시 디렉터리 생성 실패");
        let path = dir.path().join("out").join("nested").join("store.json");
        let storage = InMemoryStorage::new();
        locked_bucket_with_file(&storage).await;
        storage.save(&path).await.expect("하위 디렉터리 저장 실패");

        let reopened = InMemoryStorage::open(&path).await.expect("복원 실패");
        assert_eq!(reopened.bucket_names().await, vec!["locked".to_string()]);
    }

    /// 비어 있지 않은 버킷과 없는 버킷 삭제가 각각 구분된 오류를 내는지 검증한다.
    #[tokio::test]
    async fn delete_bucket_reports_not_empty_and_missing() {
        let storage = InMemoryStorage::new();
        locked_bucket_with_file(&storage).await;
        assert!(matches!(
            storage.delete_bucket("locked").await,
            Err(StorageError::BucketNotEmpty(_))
        ));
        let missing = storage.delete_bucket("nothing").await.expect_err("없는 버킷");
        assert!(missing.is_not_found());
    }
}
