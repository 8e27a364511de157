use super::{Choice, PromptError, Prompter};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, Stdin, Stdout};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, LinesCodec};

/// 한 줄 입력 최대 길이이다.
const MAX_LINE_LENGTH: usize = 4096;

/// 라인 단위 입출력 스트림 위에서 동작하는 Prompter 구현이다.
///
/// 잘못된 응답은 안내 문구를 출력한 뒤 다시 묻고, EOF는 [`PromptError::Closed`]로 보고한다.
pub struct LinePrompter<R, W> {
    /// 라인 디코더로 감싼 입력 스트림.
    reader: Mutex<FramedRead<R, LinesCodec>>,
    /// 질문을 출력할 스트림.
    writer: Mutex<W>,
}

impl LinePrompter<Stdin, Stdout> {
    /// 표준 입출력에 연결된 Prompter를 생성한다.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> LinePrompter<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// 주어진 입출력 스트림으로 Prompter를 생성한다.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(FramedRead::new(
                reader,
                LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
            )),
            writer: Mutex::new(writer),
        }
    }

    async fn write_text(&self, text: &str) -> Result<(), PromptError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn read_line(&self) -> Result<String, PromptError> {
        let mut reader = self.reader.lock().await;
        match reader.next().await {
            Some(Ok(line)) => Ok(line.trim().to_string()),
            Some(Err(err)) => Err(PromptError::Codec(err)),
            None => Err(PromptError::Closed),
        }
    }
}

#[async_trait]
impl<R, W> Prompter for LinePrompter<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn confirm(&self, message: &str) -> Result<bool, PromptError> {
        loop {
            self.write_text(&format!("{message} (y/n) ")).await?;
            let answer = self.read_line().await?;
            match answer.to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.write_text("y 또는 n으로 답해 주세요.\n").await?,
            }
        }
    }

    async fn select(&self, message: &str, choices: &[Choice]) -> Result<usize, PromptError> {
        if choices.is_empty() {
            return Err(PromptError::NoChoices(message.to_string()));
        }
        let mut menu = format!("{message}\n");
        for (index, choice) in choices.iter().enumerate() {
            menu.push_str(&format!("  {}) {}\n", index + 1, choice.label));
        }
        loop {
            self.write_text(&menu).await?;
            self.write_text("> ").await?;
            let answer = self.read_line().await?;
            match answer.parse::<usize>() {
                Ok(number) if (1..=choices.len()).contains(&number) => return Ok(number - 1),
                _ => {
                    self.write_text(&format!("1에서 {} 사이의 번호를 입력해 주세요.\n", choices.len()))
                        .await?
                }
            }
        }
    }

    async fn text(&self, message: &str, default: Option<&str>) -> Result<String, PromptError> {
        match default {
            Some(value) => self.write_text(&format!("{message} [{value}] ")).await?,
            None => self.write_text(&format!("{message} ")).await?,
        }
        let answer = self.read_line().await?;
        if answer.is_empty() {
            if let Some(value) = default {
                return Ok(value.to_string());
            }
        }
        Ok(answer)
    }
}
