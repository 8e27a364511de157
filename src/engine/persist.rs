use super::context::ScenarioState;
use super::error::ActionError;
use super::events::EngineEvent;
use super::steps::Step;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// 상태 파일을 읽는다. 파일이 없으면 빈 상태를 반환한다.
pub async fn load_state(path: &Path) -> anyhow::Result<ScenarioState> {
    match fs::read_to_string(path).await {
        Ok(text) => serde_json::from_str(&text)
            .with_context(|| format!("상태 파일 해석 실패: {}", path.display())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "상태 파일 없음, 빈 상태로 시작");
            Ok(ScenarioState::new())
        }
        Err(err) => Err(err).with_context(|| format!("상태 파일 읽기 실패: {}", path.display())),
    }
}

/// 상태를 JSON 파일로 기록한다. 상위 디렉터리가 없으면 만든다.
pub async fn save_state(state: &ScenarioState, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("디렉터리 생성 실패: {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(state).context("상태 직렬화 실패")?;
    fs::write(path, text)
        .await
        .with_context(|| format!("상태 파일 쓰기 실패: {}", path.display()))?;
    debug!(path = %path.display(), keys = state.len(), "상태 저장");
    Ok(())
}

/// 현재 상태를 `path`에 저장하는 Action Step을 만든다.
pub fn save_state_step(name: impl Into<String>, path: PathBuf) -> Step {
    Step::action(name, move |state, _ctx| {
        let path = path.clone();
        Box::pin(async move {
            save_state(state, &path).await.map_err(ActionError::Fatal)
        })
    })
}

/// `path`의 상태를 읽어 현재 상태에 합치는 Action Step을 만든다.
///
/// 파일이 없으면 아무것도 바꾸지 않는다.
pub fn load_state_step(name: impl Into<String>, path: PathBuf) -> Step {
    let name = name.into();
    let step_name = name.clone();
    Step::action(name, move |state, ctx| {
        let path = path.clone();
        let step_name = step_name.clone();
        Box::pin(async move {
            let loaded = load_state(&path).await.map_err(ActionError::Fatal)?;
            if !loaded.is_empty() {
                ctx.emit(EngineEvent::StepLog {
                    step: step_name,
                    line: format!("{} 에서 {}개 키를 읽었습니다.", path.display(), loaded.len()),
                });
            }
            state.merge(loaded);
            Ok(())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// 없는 파일을 읽으면 빈 상태가 되는지 검증한다.
    #[tokio::test]
    async fn missing_state_file_yields_empty_state() {
        let dir = tempfile::tempdir().expect("임시 디렉터리 생성 실패");
        let state = load_state(&dir.path().join("absent.json"))
            .await
            .expect("상태 읽기 실패");
        assert!(state.is_empty());
    }

    /// 저장한 상태가 그대로 복원되는지 검증한다.
    #[tokio::test]
    async fn saved_state_is_restored() {
        let dir = tempfile::tempdir().expect("임시 디렉터리 생성 실패");
        let path = dir.path().join("nested").join("state.json");
        let mut state = ScenarioState::new();
        state.set("bucket_a", "demo-no-lock");
        state.set("confirm", true);
        state.set("files", json!(["file0.txt", "file1.txt"]));

        save_state(&state, &path).await.expect("상태 저장 실패");
        let restored = load_state(&path).await.expect("상태 읽기 실패");

        assert_eq!(restored, state);
    }

    /// 손상된 상태 파일은 오류로 보고되는지 검증한다.
    #[tokio::test]
    async fn corrupt_state_file_is_reported() {
        let dir = tempfile::tempdir().expect("임시 디렉터리 생성 실패");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").expect("파일 작성 실패");

        let err = load_state(&path).await.expect_err("손상된 파일이 허용되었습니다");
        assert!(err.to_string().contains("상태 파일 해석 실패"));
    }

    /// 읽기 Step이 저장된 값을 현재 상태에 덮어써 합치는지 검증한다.
    #[tokio::test]
    async fn load_step_merges_into_current_state() {
        use crate::engine::Scenario;
        use crate::engine::testing::TestHarness;

        let dir = tempfile::tempdir().expect("임시 디렉터리 생성 실패");
        let path = dir.path().join("state.json");
        let mut saved = ScenarioState::new();
        saved.set("bucket_no_lock", "saved-bucket");
        save_state(&saved, &path).await.expect("상태 저장 실패");

        let harness = TestHarness::new([]);
        let scenario = Scenario::new("load", vec![load_state_step("load_state", path)])
            .expect("시나리오 생성 실패");
        let mut state = ScenarioState::new();
        state.set("bucket_no_lock", "stale");
        state.set("kept", true);

        scenario.run(&mut state, &harness.ctx).await.expect("실행 실패");

        assert_eq!(state.get_str("bucket_no_lock"), Some("saved-bucket"));
        assert_eq!(state.get_bool("kept"), Some(true));
    }
}
