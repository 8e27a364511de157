use crate::engine::ScenarioState;
use serde::{Deserialize, Serialize};

/// 사용자가 정한 버킷 이름 접두사.
pub const BUCKET_PREFIX: &str = "bucket_prefix";
pub const WELCOME_CONTINUE: &str = "welcome_continue";
pub const CONFIRM_CREATE_BUCKETS: &str = "confirm_create_buckets";
pub const CONFIRM_UPDATE_RETENTION: &str = "confirm_update_retention";
pub const CONFIRM_POPULATE_BUCKETS: &str = "confirm_populate_buckets";
pub const CONFIRM_LEGAL_HOLD_FILE_ENABLED: &str = "confirm_set_legal_hold_file_enabled";
pub const CONFIRM_RETENTION_FILE_ENABLED: &str = "confirm_set_retention_period_file_enabled";
pub const CONFIRM_LEGAL_HOLD_FILE_RETENTION: &str = "confirm_set_legal_hold_file_retention";
pub const CONFIRM_RETENTION_FILE_RETENTION: &str = "confirm_set_retention_period_file_retention";
pub const CONFIRM_CLEANUP: &str = "confirm_cleanup";

/// 업로드한 파일 이름 목록.
pub const FILE_NAMES: &str = "file_names";
/// REPL에서 고른 메뉴 코드.
pub const REPL_CHOICE: &str = "repl_choice";
/// REPL 처리 결과 문자열.
pub const REPL_OUTPUT: &str = "repl_output";

const BUCKET_NO_LOCK: &str = "bucket_no_lock";
const BUCKET_LOCK_ENABLED: &str = "bucket_lock_enabled";
const BUCKET_RETENTION: &str = "bucket_retention_after_creation";

/// 시나리오가 다루는 세 버킷의 이름이다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketNames {
    /// 객체 잠금 없이 만든 버킷.
    pub no_lock: String,
    /// 생성 시 객체 잠금을 켠 버킷.
    pub lock_enabled: String,
    /// 생성 후 보존 설정을 추가한 버킷.
    pub retention: String,
}

impl BucketNames {
    /// 접두사로 버킷 이름을 정한다.
    pub fn from_prefix(prefix: &str) -> Self {
        Self {
            no_lock: format!("{prefix}-no-lock"),
            lock_enabled: format!("{prefix}-lock-enabled"),
            retention: format!("{prefix}-retention-after-creation"),
        }
    }

    /// 생성 순서대로 이름을 반환한다.
    pub fn all(&self) -> [&str; 3] {
        [
            self.no_lock.as_str(),
            self.lock_enabled.as_str(),
            self.retention.as_str(),
        ]
    }

    /// 상태에 기록한다.
    pub fn store(&self, state: &mut ScenarioState) {
        state.set(BUCKET_NO_LOCK, self.no_lock.as_str());
        state.set(BUCKET_LOCK_ENABLED, self.lock_enabled.as_str());
        state.set(BUCKET_RETENTION, self.retention.as_str());
    }

    /// 상태에서 읽는다. 하나라도 없으면 `None`이다.
    pub fn load(state: &ScenarioState) -> Option<Self> {
        Some(Self {
            no_lock: state.get_str(BUCKET_NO_LOCK)?.to_string(),
            lock_enabled: state.get_str(BUCKET_LOCK_ENABLED)?.to_string(),
            retention: state.get_str(BUCKET_RETENTION)?.to_string(),
        })
    }
}

/// confirm 결과가 명시적으로 true가 아니면 참이다.
pub fn not_confirmed(key: &'static str) -> impl Fn(&ScenarioState) -> bool + Send + Sync + 'static {
    move |state| state.get_bool(key) != Some(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 기록한 버킷 이름이 그대로 복원되는지 검증한다.
    #[test]
    fn bucket_names_survive_state() {
        let names = BucketNames::from_prefix("demo");
        let mut state = ScenarioState::new();
        assert!(BucketNames::load(&state).is_none());

        names.store(&mut state);

        assert_eq!(BucketNames::load(&state), Some(names.clone()));
        assert_eq!(
            names.all(),
            ["demo-no-lock", "demo-lock-enabled", "demo-retention-after-creation"]
        );
    }
}
