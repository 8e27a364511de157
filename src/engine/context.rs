use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 시나리오 실행 중 Step 간 값을 공유하기 위한 상태 저장소이다.
///
/// 문자열 키에 JSON 값을 보관하며, 앞선 Step이 기록한 값은 명시적으로 덮어쓰기 전까지
/// 같은 타입으로 유지된다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioState {
    /// 키별 값 저장소이다.
    vars: BTreeMap<String, Value>,
}

impl ScenarioState {
    /// 비어 있는 상태를 생성한다.
    pub fn new() -> Self {
        Self {
            vars: BTreeMap::new(),
        }
    }

    /// 상태 값을 설정한다.
    ///
    /// # 매개변수
    /// - `key`: 저장할 키.
    /// - `value`: JSON으로 변환 가능한 값.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }

    /// 직렬화 가능한 구조체를 상태에 기록한다.
    pub fn set_as<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> anyhow::Result<()> {
        let key = key.into();
        let encoded = serde_json::to_value(value)
            .with_context(|| format!("상태 값 직렬화 실패: {key}"))?;
        self.vars.insert(key, encoded);
        Ok(())
    }

    /// 원시 JSON 값을 조회한다.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// 불리언 값을 조회한다.
    ///
    /// # 반환값
    /// 키가 없거나 타입이 다르면 `None`을 반환한다.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.vars.get(key).and_then(Value::as_bool)
    }

    /// 문자열 값을 조회한다.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.vars.get(key).and_then(Value::as_str)
    }

    /// 정수 값을 조회한다.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.vars.get(key).and_then(Value::as_i64)
    }

    /// 저장된 값을 지정한 타입으로 역직렬화한다.
    ///
    /// # 반환값
    /// 키가 없으면 `Ok(None)`, 타입이 맞지 않으면 오류를 반환한다.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.vars.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .with_context(|| format!("상태 값 타입이 일치하지 않습니다: {key}")),
            None => Ok(None),
        }
    }

    /// 저장된 키 개수를 반환한다.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// 상태가 비었는지 확인한다.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// 다른 상태의 값을 덮어써 합친다.
    pub fn merge(&mut self, other: ScenarioState) {
        self.vars.extend(other.vars);
    }

    /// `${key}` 패턴을 상태 값 또는 환경 변수로 치환한다.
    ///
    /// 문자열 값은 그대로, 그 외 값은 JSON 표기로 삽입한다.
    pub fn expand_placeholders(&self, template: &str) -> anyhow::Result<String> {
        static PLACEHOLDER: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("정규식 컴파일 실패"));
        let mut missing: Vec<String> = Vec::new();
        let result = PLACEHOLDER.replace_all(template, |caps: &regex::Captures| {
            let key = &caps[1];
            match self.get(key) {
                Some(Value::String(text)) => return text.clone(),
                Some(other) => return other.to_string(),
                None => {}
            }
            if let Ok(env_val) = std::env::var(key) {
                return env_val;
            }
            missing.push(key.to_string());
            format!("${{{key}}}")
        });
        let result = result.to_string();
        if !missing.is_empty() {
            anyhow::bail!("플레이스홀더 치환 실패 ({}): {result}", missing.join(", "));
        }
        Ok(result)
    }

    /// `template` 문자열을 치환하되 값이 없을 경우 명시적인 오류를 발생시킨다.
    pub fn expand_required(&self, template: &str, field: &str) -> anyhow::Result<String> {
        self.expand_placeholders(template)
            .with_context(|| format!("{field} 필드의 플레이스홀더를 치환할 수 없습니다."))
    }
}
