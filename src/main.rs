mod config;
mod engine;
mod prompt;
mod storage;
mod walkthrough;

use anyhow::Context;
use clap::Parser;
use config::{Backend, WalkthroughConfig, load_config_from_file};
use engine::{EngineEvent, RunContext, RunOutcome, ScenarioError, ScenarioState};
use prompt::{LinePrompter, StdoutConsole};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use storage::{InMemoryStorage, SharedStorage};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use walkthrough::{Phase, Walkthrough};

/// 객체 잠금 안내 시나리오 실행기.
#[derive(Debug, Parser)]
#[command(name = "lockstep", version)]
struct Cli {
    /// 실행할 단계.
    #[arg(short, long, value_enum, default_value = "all")]
    scenario: Phase,
    /// 모든 확인 질문에 예로 답한다.
    #[arg(short = 'y', long = "yes")]
    yes: bool,
    /// 디버그 로그를 출력한다.
    #[arg(short, long)]
    verbose: bool,
    /// 설정 파일 경로.
    #[arg(long, default_value = "lockstep.yaml")]
    config: PathBuf,
    /// 설정의 상태 파일 경로를 덮어쓴다.
    #[arg(long)]
    state_file: Option<PathBuf>,
}

/// 설정을 읽고 선택한 단계를 실행하는 진입점이다.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(outcome) => ExitCode::from(u8::try_from(outcome.exit_code()).unwrap_or(1)),
        Err(err) => {
            error!("{err:#}");
            eprintln!("오류: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<RunOutcome> {
    let mut config = load_config_from_file(&cli.config)?;
    if let Some(state_file) = cli.state_file {
        config.state_file = state_file;
    }
    debug!(?config, "설정 로드");

    let local = match config.backend {
        Backend::Local => Some(Arc::new(
            InMemoryStorage::open(&config.local_store).await?,
        )),
        Backend::S3 => None,
    };
    let storage = build_storage(&config, local.clone()).await?;

    let (tx, rx) = unbounded_channel();
    let drain = tokio::spawn(log_events(rx));
    let ctx = RunContext::new(Arc::new(LinePrompter::stdio()), Arc::new(StdoutConsole), tx)
        .with_auto_confirm(cli.yes);

    let scenario = Walkthrough::new(storage, config.clone()).scenario(cli.scenario)?;
    let mut state = ScenarioState::new();
    let result = scenario.run(&mut state, &ctx).await;
    drop(ctx);
    if let Err(err) = drain.await {
        warn!(error = %err, "이벤트 로그 작업이 비정상 종료됨");
    }

    // 실행이 실패해도 로컬 저장소 내용은 기록한다.
    if let Some(local) = &local {
        local
            .save(&config.local_store)
            .await
            .context("로컬 저장소 저장 실패")?;
    }

    let report = result.map_err(describe)?;
    for record in &report.runtime.steps {
        debug!(
            scenario = %record.scenario,
            step = %record.step,
            status = ?record.status,
            elapsed = ?record.elapsed(),
            "Step 기록"
        );
    }
    match &report.outcome {
        RunOutcome::Completed => info!(steps = report.runtime.steps.len(), "실행 종료"),
        RunOutcome::Halted { step, exit_code } => {
            info!(%step, exit_code, "사용자 선택으로 실행 종료")
        }
    }
    Ok(report.outcome)
}

async fn build_storage(
    config: &WalkthroughConfig,
    local: Option<Arc<InMemoryStorage>>,
) -> anyhow::Result<SharedStorage> {
    match local {
        Some(local) => Ok(local as SharedStorage),
        #[cfg(feature = "s3")]
        None => Ok(Arc::new(storage::S3Storage::new(config.region.clone()).await) as SharedStorage),
        #[cfg(not(feature = "s3"))]
        None => anyhow::bail!(
            "backend: s3 를 사용하려면 s3 기능을 켜고 빌드해야 합니다 (region: {:?}).",
            config.region
        ),
    }
}

fn describe(err: ScenarioError) -> anyhow::Error {
    match err {
        ScenarioError::InputClosed { step } => {
            anyhow::anyhow!("입력이 종료되어 '{step}' 단계에서 중단했습니다.")
        }
        other => anyhow::Error::new(other),
    }
}

/// 엔진 이벤트를 tracing 로그로 옮긴다.
async fn log_events(mut rx: UnboundedReceiver<EngineEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            EngineEvent::StepStarted { scenario, step } => debug!(%scenario, %step, "Step 시작"),
            EngineEvent::StepLog { step, line } => debug!(%step, "{line}"),
            EngineEvent::StepSkipped { scenario, step } => info!(%scenario, %step, "Step 건너뜀"),
            EngineEvent::StepFinished {
                scenario,
                step,
                success,
            } => debug!(%scenario, %step, success, "Step 종료"),
            EngineEvent::ScenarioHalted { scenario, step } => {
                info!(%scenario, %step, "사용자 거절로 종료")
            }
            EngineEvent::ScenarioFinished { scenario } => debug!(%scenario, "시나리오 완료"),
        }
    }
}
