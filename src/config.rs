use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::engine::ScenarioState;

/// 저장소 백엔드 종류를 표현한다.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// 프로세스 내부 저장소. 스냅샷 파일로 실행 단계를 잇는다.
    #[default]
    Local,
    /// Amazon S3.
    S3,
}

/// 객체 잠금 안내 시나리오의 실행 설정이다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WalkthroughConfig {
    /// 생성할 버킷 이름의 접두사.
    pub bucket_prefix: String,
    /// 실행 단계 사이에 상태를 잇는 파일 경로.
    pub state_file: PathBuf,
    /// 보존 기간(일).
    pub retention_days: u32,
    /// 버킷마다 업로드할 파일 개수.
    pub file_count: usize,
    /// S3 리전.
    pub region: Option<String>,
    /// 저장소 백엔드.
    pub backend: Backend,
    /// 로컬 백엔드 스냅샷 파일 경로.
    pub local_store: PathBuf,
}

impl Default for WalkthroughConfig {
    fn default() -> Self {
        Self {
            bucket_prefix: "lockstep-demo".into(),
            state_file: PathBuf::from("state.json"),
            retention_days: 1,
            file_count: 2,
            region: None,
            backend: Backend::Local,
            local_store: PathBuf::from("local-store.json"),
        }
    }
}

impl WalkthroughConfig {
    /// 문자열 필드의 `${VAR}` 플레이스홀더를 환경 변수로 치환한다.
    fn expand_env(mut self) -> anyhow::Result<Self> {
        let env = ScenarioState::new();
        self.bucket_prefix = env.expand_required(&self.bucket_prefix, "bucket_prefix")?;
        self.state_file = expand_path(&env, &self.state_file, "state_file")?;
        self.local_store = expand_path(&env, &self.local_store, "local_store")?;
        if let Some(region) = &self.region {
            self.region = Some(env.expand_required(region, "region")?);
        }
        Ok(self)
    }

    /// 값 범위를 확인한다.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bucket_prefix.trim().is_empty() {
            anyhow::bail!("bucket_prefix 값이 비어 있습니다.");
        }
        // 법적 보존과 보존 기간 데모가 file0, file1을 사용한다.
        if self.file_count < 2 {
            anyhow::bail!("file_count는 2 이상이어야 합니다: {}", self.file_count);
        }
        if self.retention_days == 0 {
            anyhow::bail!("retention_days는 1 이상이어야 합니다.");
        }
        Ok(())
    }
}

fn expand_path(env: &ScenarioState, path: &Path, field: &str) -> anyhow::Result<PathBuf> {
    let raw = path.to_string_lossy();
    Ok(PathBuf::from(env.expand_required(&raw, field)?))
}

/// YAML 파일을 읽어 설정으로 역직렬화한다. 파일이 없으면 기본값을 사용한다.
pub fn load_config_from_file(path: &Path) -> anyhow::Result<WalkthroughConfig> {
    match File::open(path) {
        Ok(mut file) => load_config_from_reader(&mut file)
            .with_context(|| format!("설정 파일 해석 실패: {}", path.display())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "설정 파일 없음, 기본값 사용");
            Ok(WalkthroughConfig::default())
        }
        Err(err) => Err(err).with_context(|| format!("설정 파일 열기 실패: {}", path.display())),
    }
}

/// Reader에서 YAML을 읽어 설정 구조체로 파싱한다.
pub fn load_config_from_reader<R: Read>(reader: &mut R) -> anyhow::Result<WalkthroughConfig> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    let config: WalkthroughConfig = if buf.trim().is_empty() {
        WalkthroughConfig::default()
    } else {
        serde_yaml::from_str(&buf)?
    };
    let config = config.expand_env()?;
    config.validate()?;
    Ok(config)
}
