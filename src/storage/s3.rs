use super::{
    CreateBucketInput, DefaultRetention, DeleteObjectInput, LegalHoldStatus,
    ObjectLockConfiguration, ObjectRef, ObjectRetention, ObjectVersion, PutObjectInput,
    PutObjectOutput, RetentionMode, StorageClient, StorageError,
};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime as SmithyDateTime};
use aws_sdk_s3::types::{
    BucketLocationConstraint, BucketVersioningStatus, CreateBucketConfiguration,
    DefaultRetention as S3DefaultRetention, ObjectLockConfiguration as S3ObjectLockConfiguration,
    ObjectLockEnabled, ObjectLockLegalHold, ObjectLockLegalHoldStatus, ObjectLockRetention,
    ObjectLockRetentionMode, ObjectLockRule, VersioningConfiguration,
};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Amazon S3(또는 호환 서비스)에 연결된 StorageClient 구현이다.
pub struct S3Storage {
    client: Client,
    region: Option<String>,
}

impl S3Storage {
    /// 환경 자격 증명으로 클라이언트를 생성한다.
    pub async fn new(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let config = loader.load().await;
        let region = region.or_else(|| config.region().map(|r| r.to_string()));
        Self {
            client: Client::new(&config),
            region,
        }
    }
}

/// 객체에 법적 보존이나 보존 기간이 설정되지 않았을 때 S3가 돌려주는 오류 코드이다.
const NO_LOCK_SETTING: &str = "NoSuchObjectLockConfiguration";

/// SDK 오류를 저장소 오류로 분류한다. `key`는 객체 단위 호출에서만 넘긴다.
fn map_sdk_error<E, R>(bucket: &str, key: Option<&str>, err: SdkError<E, R>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    classify_code(err.code(), bucket, key, message)
}

fn classify_code(
    code: Option<&str>,
    bucket: &str,
    key: Option<&str>,
    message: String,
) -> StorageError {
    match code {
        Some("NoSuchBucket") => StorageError::NoSuchBucket(bucket.to_string()),
        Some("NoSuchKey") | Some("NoSuchVersion") => StorageError::NoSuchKey {
            bucket: bucket.to_string(),
            key: key.unwrap_or_default().to_string(),
        },
        Some("BucketAlreadyExists") | Some("BucketAlreadyOwnedByYou") => {
            StorageError::BucketAlreadyExists(bucket.to_string())
        }
        Some("BucketNotEmpty") => StorageError::BucketNotEmpty(bucket.to_string()),
        Some("AccessDenied") => StorageError::AccessDenied(message),
        Some("InvalidRequest") | Some("ObjectLockConfigurationNotFoundError") => {
            StorageError::InvalidRequest(message)
        }
        _ => StorageError::Backend(message),
    }
}

/// 조회 대상 설정이 없다는 응답인지 확인한다. 이 경우 조회 결과는 `None`이다.
fn is_missing_lock_setting(code: Option<&str>) -> bool {
    code == Some(NO_LOCK_SETTING)
}

fn to_s3_mode(mode: RetentionMode) -> ObjectLockRetentionMode {
    match mode {
        RetentionMode::Governance => ObjectLockRetentionMode::Governance,
        RetentionMode::Compliance => ObjectLockRetentionMode::Compliance,
    }
}

fn from_s3_mode(mode: &ObjectLockRetentionMode) -> RetentionMode {
    match mode {
        ObjectLockRetentionMode::Compliance => RetentionMode::Compliance,
        _ => RetentionMode::Governance,
    }
}

fn to_s3_hold(status: LegalHoldStatus) -> ObjectLockLegalHoldStatus {
    match status {
        LegalHoldStatus::On => ObjectLockLegalHoldStatus::On,
        LegalHoldStatus::Off => ObjectLockLegalHoldStatus::Off,
    }
}

#[async_trait]
impl StorageClient for S3Storage {
    async fn create_bucket(&self, input: CreateBucketInput) -> Result<(), StorageError> {
        let mut request = self
            .client
            .create_bucket()
            .bucket(&input.bucket)
            .object_lock_enabled_for_bucket(input.object_lock_enabled);
        if let Some(region) = self.region.as_deref().filter(|r| *r != "us-east-1") {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }
        request
            .send()
            .await
            .map_err(|e| map_sdk_error(&input.bucket, None, e))?;
        debug!(bucket = %input.bucket, "S3 버킷 생성");
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| map_sdk_error(bucket, None, e))?;
        Ok(())
    }

    async fn put_bucket_versioning(&self, bucket: &str, enabled: bool) -> Result<(), StorageError> {
        let status = if enabled {
            BucketVersioningStatus::Enabled
        } else {
            BucketVersioningStatus::Suspended
        };
        self.client
            .put_bucket_versioning()
            .bucket(bucket)
            .versioning_configuration(VersioningConfiguration::builder().status(status).build())
            .send()
            .await
            .map_err(|e| map_sdk_error(bucket, None, e))?;
        Ok(())
    }

    async fn put_object_lock_configuration(
        &self,
        bucket: &str,
        config: ObjectLockConfiguration,
    ) -> Result<(), StorageError> {
        let mut builder = S3ObjectLockConfiguration::builder();
        if config.enabled {
            builder = builder.object_lock_enabled(ObjectLockEnabled::Enabled);
        }
        if let Some(rule) = &config.default_retention {
            builder = builder.rule(
                ObjectLockRule::builder()
                    .default_retention(
                        S3DefaultRetention::builder()
                            .mode(to_s3_mode(rule.mode))
                            .days(i32::try_from(rule.days).unwrap_or(i32::MAX))
                            .build(),
                    )
                    .build(),
            );
        }
        self.client
            .put_object_lock_configuration()
            .bucket(bucket)
            .object_lock_configuration(builder.build())
            .send()
            .await
            .map_err(|e| map_sdk_error(bucket, None, e))?;
        Ok(())
    }

    async fn get_object_lock_configuration(
        &self,
        bucket: &str,
    ) -> Result<Option<ObjectLockConfiguration>, StorageError> {
        let output = match self
            .client
            .get_object_lock_configuration()
            .bucket(bucket)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) if err.code() == Some("ObjectLockConfigurationNotFoundError") => {
                return Ok(None);
            }
            Err(err) => return Err(map_sdk_error(bucket, None, err)),
        };
        Ok(output.object_lock_configuration().map(|config| {
            let default_retention = config
                .rule()
                .and_then(|rule| rule.default_retention())
                .and_then(|retention| {
                    Some(DefaultRetention {
                        mode: from_s3_mode(retention.mode()?),
                        days: u32::try_from(retention.days()?).ok()?,
                    })
                });
            ObjectLockConfiguration {
                enabled: config.object_lock_enabled() == Some(&ObjectLockEnabled::Enabled),
                default_retention,
            }
        }))
    }

    async fn list_object_versions(&self, bucket: &str) -> Result<Vec<ObjectVersion>, StorageError> {
        let mut listed = Vec::new();
        let mut key_marker: Option<String> = None;
        let mut version_marker: Option<String> = None;
        loop {
            let output = self
                .client
                .list_object_versions()
                .bucket(bucket)
                .set_key_marker(key_marker.take())
                .set_version_id_marker(version_marker.take())
                .send()
                .await
                .map_err(|e| map_sdk_error(bucket, None, e))?;
            for version in output.versions() {
                listed.push(ObjectVersion {
                    key: version.key().unwrap_or_default().to_string(),
                    version_id: version.version_id().map(str::to_string),
                    is_latest: version.is_latest().unwrap_or(false),
                    is_delete_marker: false,
                });
            }
            for marker in output.delete_markers() {
                listed.push(ObjectVersion {
                    key: marker.key().unwrap_or_default().to_string(),
                    version_id: marker.version_id().map(str::to_string),
                    is_latest: marker.is_latest().unwrap_or(false),
                    is_delete_marker: true,
                });
            }
            if output.is_truncated() != Some(true) {
                break;
            }
            key_marker = output.next_key_marker().map(str::to_string);
            version_marker = output.next_version_id_marker().map(str::to_string);
        }
        Ok(listed)
    }

    async fn put_object(&self, input: PutObjectInput) -> Result<PutObjectOutput, StorageError> {
        let output = self
            .client
            .put_object()
            .bucket(&input.bucket)
            .key(&input.key)
            .body(ByteStream::from(input.body))
            .send()
            .await
            .map_err(|e| map_sdk_error(&input.bucket, Some(&input.key), e))?;
        Ok(PutObjectOutput {
            version_id: output.version_id().map(str::to_string),
        })
    }

    async fn delete_object(&self, input: DeleteObjectInput) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&input.bucket)
            .key(&input.key)
            .set_version_id(input.version_id.clone())
            .bypass_governance_retention(input.bypass_governance_retention)
            .send()
            .await
            .map_err(|e| map_sdk_error(&input.bucket, Some(&input.key), e))?;
        Ok(())
    }

    async fn get_object_legal_hold(
        &self,
        target: &ObjectRef,
    ) -> Result<Option<LegalHoldStatus>, StorageError> {
        let output = match self
            .client
            .get_object_legal_hold()
            .bucket(&target.bucket)
            .key(&target.key)
            .set_version_id(target.version_id.clone())
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) if is_missing_lock_setting(err.code()) => return Ok(None),
            Err(err) => return Err(map_sdk_error(&target.bucket, Some(&target.key), err)),
        };
        Ok(output
            .legal_hold()
            .and_then(|hold| hold.status())
            .map(|status| match status {
                ObjectLockLegalHoldStatus::On => LegalHoldStatus::On,
                _ => LegalHoldStatus::Off,
            }))
    }

    async fn put_object_legal_hold(
        &self,
        target: &ObjectRef,
        status: LegalHoldStatus,
    ) -> Result<(), StorageError> {
        self.client
            .put_object_legal_hold()
            .bucket(&target.bucket)
            .key(&target.key)
            .set_version_id(target.version_id.clone())
            .legal_hold(ObjectLockLegalHold::builder().status(to_s3_hold(status)).build())
            .send()
            .await
            .map_err(|e| map_sdk_error(&target.bucket, Some(&target.key), e))?;
        Ok(())
    }

    async fn get_object_retention(
        &self,
        target: &ObjectRef,
    ) -> Result<Option<ObjectRetention>, StorageError> {
        let output = match self
            .client
            .get_object_retention()
            .bucket(&target.bucket)
            .key(&target.key)
            .set_version_id(target.version_id.clone())
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) if is_missing_lock_setting(err.code()) => return Ok(None),
            Err(err) => return Err(map_sdk_error(&target.bucket, Some(&target.key), err)),
        };
        Ok(output.retention().and_then(|retention| {
            let until = retention.retain_until_date()?;
            Some(ObjectRetention {
                mode: from_s3_mode(retention.mode()?),
                retain_until: DateTime::<Utc>::from_timestamp(until.secs(), 0)?,
            })
        }))
    }

    async fn put_object_retention(
        &self,
        target: &ObjectRef,
        retention: ObjectRetention,
        bypass_governance_retention: bool,
    ) -> Result<(), StorageError> {
        self.client
            .put_object_retention()
            .bucket(&target.bucket)
            .key(&target.key)
            .set_version_id(target.version_id.clone())
            .bypass_governance_retention(bypass_governance_retention)
            .retention(
                ObjectLockRetention::builder()
                    .mode(to_s3_mode(retention.mode))
                    .retain_until_date(SmithyDateTime::from_secs(retention.retain_until.timestamp()))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| map_sdk_error(&target.bucket, Some(&target.key), e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_hold_or_retention_reads_as_unset() {
        assert!(is_missing_lock_setting(Some("NoSuchObjectLockConfiguration")));
        assert!(!is_missing_lock_setting(Some("NoSuchKey")));
        assert!(!is_missing_lock_setting(None));

        // 분류기를 거치면 조회 실패로 취급되므로 getter에서 먼저 걸러야 한다.
        let err = classify_code(Some(NO_LOCK_SETTING), "b", Some("k"), "x".into());
        assert_eq!(err, StorageError::Backend("x".into()));
    }

    #[test]
    fn missing_key_carries_bucket_and_key() {
        let err = classify_code(
            Some("NoSuchVersion"),
            "demo-lock-enabled",
            Some("file0.txt"),
            String::new(),
        );
        assert_eq!(
            err,
            StorageError::NoSuchKey {
                bucket: "demo-lock-enabled".into(),
                key: "file0.txt".into(),
            }
        );
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "객체가 존재하지 않습니다: demo-lock-enabled/file0.txt");
    }

    #[test]
    fn service_codes_map_to_storage_errors() {
        assert_eq!(
            classify_code(Some("NoSuchBucket"), "b", None, String::new()),
            StorageError::NoSuchBucket("b".into())
        );
        assert_eq!(
            classify_code(Some("BucketAlreadyOwnedByYou"), "b", None, String::new()),
            StorageError::BucketAlreadyExists("b".into())
        );
        assert_eq!(
            classify_code(Some("AccessDenied"), "b", Some("k"), "거부".into()),
            StorageError::AccessDenied("거부".into())
        );
        assert_eq!(
            classify_code(None, "b", None, "timeout".into()),
            StorageError::Backend("timeout".into())
        );
    }
}
