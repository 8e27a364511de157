use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

mod memory;
#[cfg(feature = "s3")]
mod s3;

pub use memory::InMemoryStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;

/// 저장소 호출에서 발생하는 오류이다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// 버킷이 존재하지 않는다.
    #[error("버킷이 존재하지 않습니다: {0}")]
    NoSuchBucket(String),
    /// 객체가 존재하지 않는다.
    #[error("객체가 존재하지 않습니다: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },
    /// 이미 존재하는 버킷이다.
    #[error("이미 존재하는 버킷입니다: {0}")]
    BucketAlreadyExists(String),
    /// 비어 있지 않은 버킷은 삭제할 수 없다.
    #[error("버킷이 비어 있지 않습니다: {0}")]
    BucketNotEmpty(String),
    /// 보호 설정(법적 보존, 보존 기간)으로 거부되었다.
    #[error("접근이 거부되었습니다: {0}")]
    AccessDenied(String),
    /// 요청 자체가 유효하지 않다.
    #[error("잘못된 요청입니다: {0}")]
    InvalidRequest(String),
    /// 그 외 백엔드 오류.
    #[cfg_attr(not(feature = "s3"), allow(dead_code))]
    #[error("저장소 오류: {0}")]
    Backend(String),
}

impl StorageError {
    /// 대상 리소스가 이미 없는 경우인지 확인한다.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::NoSuchBucket(_) | StorageError::NoSuchKey { .. }
        )
    }
}

/// 버킷 생성 입력이다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBucketInput {
    /// 버킷 이름.
    pub bucket: String,
    /// 생성 시 객체 잠금을 활성화할지 여부.
    pub object_lock_enabled: bool,
}

/// 객체 업로드 입력이다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectInput {
    /// 버킷 이름.
    pub bucket: String,
    /// 객체 키.
    pub key: String,
    /// 객체 본문.
    pub body: Vec<u8>,
}

/// 객체 업로드 결과이다.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PutObjectOutput {
    /// 생성된 버전 ID. 버전 관리가 꺼진 버킷이면 `None`이다.
    pub version_id: Option<String>,
}

/// 객체 삭제 입력이다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteObjectInput {
    /// 버킷 이름.
    pub bucket: String,
    /// 객체 키.
    pub key: String,
    /// 삭제할 버전 ID. 없으면 최신 객체를 대상으로 한다.
    pub version_id: Option<String>,
    /// GOVERNANCE 보존 기간을 우회할지 여부.
    pub bypass_governance_retention: bool,
}

/// 특정 객체(버전)를 가리키는 참조이다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// 버킷 이름.
    pub bucket: String,
    /// 객체 키.
    pub key: String,
    /// 버전 ID.
    pub version_id: Option<String>,
}

impl ObjectRef {
    /// 참조를 생성한다.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, version_id: Option<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            version_id,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version_id {
            Some(version) => write!(f, "{}/{} (version {version})", self.bucket, self.key),
            None => write!(f, "{}/{}", self.bucket, self.key),
        }
    }
}

/// 버킷에 저장된 객체 버전 정보이다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectVersion {
    /// 객체 키.
    pub key: String,
    /// 버전 ID.
    pub version_id: Option<String>,
    /// 최신 버전 여부.
    pub is_latest: bool,
    /// 삭제 마커 여부.
    pub is_delete_marker: bool,
}

/// 보존 모드이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetentionMode {
    /// 권한이 있으면 우회할 수 있는 보존.
    Governance,
    /// 누구도 우회할 수 없는 보존.
    Compliance,
}

impl fmt::Display for RetentionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetentionMode::Governance => write!(f, "GOVERNANCE"),
            RetentionMode::Compliance => write!(f, "COMPLIANCE"),
        }
    }
}

/// 객체 단위 보존 설정이다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRetention {
    /// 보존 모드.
    pub mode: RetentionMode,
    /// 보존 만료 시각.
    pub retain_until: DateTime<Utc>,
}

/// 버킷 기본 보존 규칙이다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultRetention {
    /// 보존 모드.
    pub mode: RetentionMode,
    /// 보존 일수.
    pub days: u32,
}

/// 버킷 객체 잠금 설정이다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLockConfiguration {
    /// 객체 잠금 활성화 여부.
    pub enabled: bool,
    /// 기본 보존 규칙.
    pub default_retention: Option<DefaultRetention>,
}

/// 법적 보존 상태이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LegalHoldStatus {
    /// 법적 보존 적용.
    On,
    /// 법적 보존 해제.
    Off,
}

impl fmt::Display for LegalHoldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegalHoldStatus::On => write!(f, "ON"),
            LegalHoldStatus::Off => write!(f, "OFF"),
        }
    }
}

/// 객체 잠금 시나리오가 사용하는 저장소 호출 계층이다.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// 버킷을 생성한다.
    async fn create_bucket(&self, input: CreateBucketInput) -> Result<(), StorageError>;
    /// 빈 버킷을 삭제한다.
    async fn delete_bucket(&self, bucket: &str) -> Result<(), StorageError>;
    /// 버킷 버전 관리를 켜거나 끈다.
    async fn put_bucket_versioning(&self, bucket: &str, enabled: bool) -> Result<(), StorageError>;
    /// 버킷 객체 잠금 설정을 기록한다.
    async fn put_object_lock_configuration(
        &self,
        bucket: &str,
        config: ObjectLockConfiguration,
    ) -> Result<(), StorageError>;
    /// 버킷 객체 잠금 설정을 조회한다. 설정이 없으면 `None`이다.
    async fn get_object_lock_configuration(
        &self,
        bucket: &str,
    ) -> Result<Option<ObjectLockConfiguration>, StorageError>;
    /// 버킷의 모든 객체 버전과 삭제 마커를 조회한다.
    async fn list_object_versions(&self, bucket: &str) -> Result<Vec<ObjectVersion>, StorageError>;
    /// 객체를 업로드한다.
    async fn put_object(&self, input: PutObjectInput) -> Result<PutObjectOutput, StorageError>;
    /// 객체(버전)를 삭제한다.
    async fn delete_object(&self, input: DeleteObjectInput) -> Result<(), StorageError>;
    /// 법적 보존 상태를 조회한다.
    async fn get_object_legal_hold(
        &self,
        target: &ObjectRef,
    ) -> Result<Option<LegalHoldStatus>, StorageError>;
    /// 법적 보존 상태를 기록한다.
    async fn put_object_legal_hold(
        &self,
        target: &ObjectRef,
        status: LegalHoldStatus,
    ) -> Result<(), StorageError>;
    /// 객체 보존 설정을 조회한다.
    async fn get_object_retention(
        &self,
        target: &ObjectRef,
    ) -> Result<Option<ObjectRetention>, StorageError>;
    /// 객체 보존 설정을 기록한다.
    async fn put_object_retention(
        &self,
        target: &ObjectRef,
        retention: ObjectRetention,
        bypass_governance_retention: bool,
    ) -> Result<(), StorageError>;
}

/// StorageClient를 공유하기 위한 Arc 타입 별칭이다.
pub type SharedStorage = Arc<dyn StorageClient>;
