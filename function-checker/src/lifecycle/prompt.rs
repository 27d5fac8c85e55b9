//! Manual confirmation of ingress reachability

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tracing::info;

/// Asks the operator a yes/no question
#[async_trait]
pub trait ConfirmationPrompt: Send {
    /// `Ok(true)` for yes, `Ok(false)` for no or end of input
    async fn confirm(&mut self, question: &str) -> std::io::Result<bool>;
}

/// Parse one answer line: `y` or `n`, any case, surrounding whitespace ignored
pub fn parse_answer(line: &str) -> Option<bool> {
    let answer = line.trim();
    if answer.eq_ignore_ascii_case("y") {
        Some(true)
    } else if answer.eq_ignore_ascii_case("n") {
        Some(false)
    } else {
        None
    }
}

/// Line based prompt over any async reader/writer pair
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R, W> LinePrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    async fn write(&mut self, text: &str) -> std::io::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await
    }
}

impl LinePrompt<BufReader<Stdin>, Stdout> {
    /// Prompt on the process stdin/stdout
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

#[async_trait]
impl<R, W> ConfirmationPrompt for LinePrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn confirm(&mut self, question: &str) -> std::io::Result<bool> {
        self.write(&format!("{} [y/n]: ", question)).await?;

        let mut line = String::new();
        loop {
            line.clear();
            if self.input.read_line(&mut line).await? == 0 {
                info!("No answer on input, treating as 'n'");
                return Ok(false);
            }

            match parse_answer(&line) {
                Some(answer) => return Ok(answer),
                None => {
                    self.write("Invalid input. Please press 'y' if the test was successful, 'n' if it was not: ")
                        .await?;
                }
            }
        }
    }
}

/// Answers every question with a fixed value (`--assume-yes`)
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl ConfirmationPrompt for AutoConfirm {
    async fn confirm(&mut self, question: &str) -> std::io::Result<bool> {
        info!(answer = self.0, "{}", question);
        Ok(self.0)
    }
}
