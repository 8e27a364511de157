mod clean;
mod keys;
mod repl;
mod setup;
mod welcome;

use crate::config::WalkthroughConfig;
use crate::engine::{Scenario, ScenarioError, Step, load_state_step, save_state_step};
use crate::storage::SharedStorage;
use std::sync::Arc;

/// 실행할 단계이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Phase {
    /// 버킷 생성과 보호 설정.
    Deploy,
    /// 대화형 탐색.
    Demo,
    /// 리소스 정리.
    Clean,
    /// 세 단계를 이어서 실행.
    All,
}

/// 저장소와 설정을 묶어 단계별 시나리오를 만든다.
#[derive(Clone)]
pub struct Walkthrough {
    storage: SharedStorage,
    config: Arc<WalkthroughConfig>,
}

impl Walkthrough {
    pub fn new(storage: SharedStorage, config: WalkthroughConfig) -> Self {
        Self {
            storage,
            config: Arc::new(config),
        }
    }

    /// 단계에 해당하는 시나리오를 만든다.
    pub fn scenario(&self, phase: Phase) -> Result<Scenario, ScenarioError> {
        match phase {
            Phase::Deploy => self.deploy(),
            Phase::Demo => self.demo(),
            Phase::Clean => self.clean(),
            Phase::All => self.all(),
        }
    }

    pub fn deploy(&self) -> Result<Scenario, ScenarioError> {
        let mut steps = welcome::welcome_steps(&self.config.bucket_prefix);
        steps.extend(setup::deploy_steps(&self.storage, &self.config));
        steps.push(save_state_step("save_state", self.config.state_file.clone()));
        Scenario::new("deploy", steps)
    }

    pub fn demo(&self) -> Result<Scenario, ScenarioError> {
        Scenario::new(
            "demo",
            vec![
                load_state_step("load_state", self.config.state_file.clone()),
                welcome::demo_intro(),
                repl::repl_step(self.storage.clone()),
                save_state_step("save_state", self.config.state_file.clone()),
            ],
        )
    }

    pub fn clean(&self) -> Result<Scenario, ScenarioError> {
        let mut steps = vec![load_state_step("load_state", self.config.state_file.clone())];
        steps.extend(clean::clean_steps(
            self.storage.clone(),
            self.config.bucket_prefix.clone(),
        ));
        steps.push(save_state_step("save_state", self.config.state_file.clone()));
        Scenario::new("clean", steps)
    }

    pub fn all(&self) -> Result<Scenario, ScenarioError> {
        Scenario::new(
            "all",
            vec![
                Step::nested(self.deploy()?),
                Step::nested(self.demo()?),
                Step::nested(self.clean()?),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::keys::BucketNames;
    use crate::engine::testing::TestHarness;
    use crate::engine::{RunOutcome, ScenarioState, StepStatus, load_state};
    use crate::prompt::scripted::ScriptedAnswer;
    use crate::storage::{InMemoryStorage, LegalHoldStatus, ObjectRef, StorageClient};
    use std::path::Path;

    fn walkthrough(dir: &Path, storage: Arc<InMemoryStorage>) -> Walkthrough {
        let config = WalkthroughConfig {
            bucket_prefix: "wt".into(),
            state_file: dir.join("state.json"),
            local_store: dir.join("store.json"),
            ..WalkthroughConfig::default()
        };
        Walkthrough::new(storage, config)
    }

    /// 시작 확인을 거절하면 버킷을 만들기 전에 종료되는지 검증한다.
    #[tokio::test]
    async fn declined_welcome_exits_before_bucket_creation() {
        let dir = tempfile::tempdir().expect("임시 디렉터리 생성 실패");
        let storage = Arc::new(InMemoryStorage::new());
        let harness = TestHarness::new([
            ScriptedAnswer::Text("custom".into()),
            ScriptedAnswer::Confirm(false),
        ]);
        let scenario = walkthrough(dir.path(), storage.clone())
            .deploy()
            .expect("시나리오 생성 실패");
        let mut state = ScenarioState::new();

        let report = scenario.run(&mut state, &harness.ctx).await.expect("실행 실패");

        assert_eq!(
            report.outcome,
            RunOutcome::Halted {
                step: "exit_on_welcome_continue_false".into(),
                exit_code: 0
            }
        );
        assert!(storage.bucket_names().await.is_empty());
        assert!(!dir.path().join("state.json").exists());
        assert!(harness.console.lines()[1].contains("custom-retention-after-creation"));
    }

    /// 파일 보호 설정을 일부만 승인했을 때 해당 설정만 적용되는지 검증한다.
    #[tokio::test]
    async fn deploy_applies_only_confirmed_protections() {
        let dir = tempfile::tempdir().expect("임시 디렉터리 생성 실패");
        let storage = Arc::new(InMemoryStorage::new());
        let harness = TestHarness::new([
            ScriptedAnswer::Text(String::new()),
            ScriptedAnswer::Confirm(true),
            ScriptedAnswer::Confirm(true),
            ScriptedAnswer::Confirm(true),
            ScriptedAnswer::Confirm(true),
            ScriptedAnswer::Confirm(true),
            ScriptedAnswer::Confirm(false),
            ScriptedAnswer::Confirm(false),
            ScriptedAnswer::Confirm(true),
        ]);
        let scenario = walkthrough(dir.path(), storage.clone())
            .deploy()
            .expect("시나리오 생성 실패");
        let mut state = ScenarioState::new();

        let report = scenario.run(&mut state, &harness.ctx).await.expect("실행 실패");

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(
            report.runtime.status_of("set_retention_period_file_enabled"),
            Some(&StepStatus::Skipped)
        );
        assert_eq!(
            report.runtime.status_of("set_legal_hold_file_retention"),
            Some(&StepStatus::Skipped)
        );
        assert_eq!(storage.bucket_names().await.len(), 3);

        let hold = storage
            .get_object_legal_hold(&ObjectRef::new("wt-lock-enabled", "file0.txt", None))
            .await
            .expect("법적 보존 조회 실패");
        assert_eq!(hold, Some(LegalHoldStatus::On));
        let retention = storage
            .get_object_retention(&ObjectRef::new("wt-lock-enabled", "file1.txt", None))
            .await
            .expect("보존 조회 실패");
        assert_eq!(retention, None);
        let retention = storage
            .get_object_retention(&ObjectRef::new(
                "wt-retention-after-creation",
                "file1.txt",
                None,
            ))
            .await
            .expect("보존 조회 실패");
        assert!(retention.is_some());

        let saved = load_state(&dir.path().join("state.json"))
            .await
            .expect("상태 읽기 실패");
        assert_eq!(BucketNames::load(&saved), BucketNames::load(&state));
        assert_eq!(saved.get_bool(keys::CONFIRM_CLEANUP), None);
    }

    /// 이미 있는 버킷으로 다시 배포하면 경고만 남기고 끝까지 진행하는지 검증한다.
    #[tokio::test]
    async fn redeploy_reuses_existing_buckets() {
        let dir = tempfile::tempdir().expect("임시 디렉터리 생성 실패");
        let storage = Arc::new(InMemoryStorage::new());
        let harness = TestHarness::new([]);
        let ctx = harness.ctx.clone().with_auto_confirm(true);
        let wt = walkthrough(dir.path(), storage.clone());

        let first = wt
            .deploy()
            .expect("시나리오 생성 실패")
            .run(&mut ScenarioState::new(), &ctx)
            .await
            .expect("첫 배포 실패");
        assert_eq!(first.runtime.status_of("create_buckets"), Some(&StepStatus::Success));

        let mut state = ScenarioState::new();
        let second = wt
            .deploy()
            .expect("시나리오 생성 실패")
            .run(&mut state, &ctx)
            .await
            .expect("재배포 실패");

        assert_eq!(second.outcome, RunOutcome::Completed);
        assert!(matches!(
            second.runtime.status_of("create_buckets"),
            Some(StepStatus::Failed(message)) if message.contains("wt-no-lock")
        ));
        assert_eq!(
            second.runtime.status_of("populate_buckets"),
            Some(&StepStatus::Success)
        );
        assert_eq!(BucketNames::load(&state), Some(BucketNames::from_prefix("wt")));
        assert_eq!(storage.bucket_names().await.len(), 3);
        assert!(harness.prompter.asked().is_empty());
    }

    /// 세 단계를 이어서 실행하면 모든 리소스가 정리되는지 검증한다.
    #[tokio::test]
    async fn all_phases_leave_no_buckets() {
        let dir = tempfile::tempdir().expect("임시 디렉터리 생성 실패");
        let storage = Arc::new(InMemoryStorage::new());
        let harness = TestHarness::new([
            ScriptedAnswer::Select(0),
            ScriptedAnswer::Select(2),
            ScriptedAnswer::Select(1),
            ScriptedAnswer::Select(6),
        ]);
        let ctx = harness.ctx.clone().with_auto_confirm(true);
        let scenario = walkthrough(dir.path(), storage.clone())
            .all()
            .expect("시나리오 생성 실패");
        let mut state = ScenarioState::new();

        let report = scenario.run(&mut state, &ctx).await.expect("실행 실패");

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert!(storage.bucket_names().await.is_empty());
        assert_eq!(harness.prompter.remaining(), 0);
        let names = report.runtime.step_names();
        let deploy = names.iter().position(|n| *n == "deploy").expect("deploy 없음");
        let demo = names.iter().position(|n| *n == "demo").expect("demo 없음");
        let clean = names.iter().position(|n| *n == "clean").expect("clean 없음");
        assert!(deploy < demo && demo < clean);
    }

    /// 단계 이름이 올바른 시나리오로 연결되는지 검증한다.
    #[test]
    fn phases_map_to_named_scenarios() {
        let dir = tempfile::tempdir().expect("임시 디렉터리 생성 실패");
        let wt = walkthrough(dir.path(), Arc::new(InMemoryStorage::new()));
        for (phase, name) in [
            (Phase::Deploy, "deploy"),
            (Phase::Demo, "demo"),
            (Phase::Clean, "clean"),
            (Phase::All, "all"),
        ] {
            assert_eq!(wt.scenario(phase).expect("생성 실패").name(), name);
        }
    }
}
