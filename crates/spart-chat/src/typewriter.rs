use std::io::Write;
use std::time::Duration;

use futures::{Stream, StreamExt as _, stream};

/// Typewriter-style reveal of a finished answer, one character per tick.
#[derive(Clone, Copy, Debug)]
pub struct Typewriter {
    delay: Duration,
}

impl Default for Typewriter {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(15),
        }
    }
}

impl Typewriter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Yields the characters of `text` in order, sleeping `delay` before each
    /// one after the first.
    pub fn reveal(&self, text: &str) -> impl Stream<Item = char> + Send + use<> {
        let delay = self.delay;
        let chars: Vec<char> = text.chars().collect();
        stream::iter(chars.into_iter().enumerate()).then(move |(index, ch)| async move {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            ch
        })
    }

    /// Writes `text` to `out` character by character, flushing after each.
    pub async fn write_to<W: Write>(&self, text: &str, out: &mut W) -> std::io::Result<()> {
        let mut chars = Box::pin(self.reveal(text));
        let mut buf = [0u8; 4];
        while let Some(ch) = chars.next().await {
            out.write_all(ch.encode_utf8(&mut buf).as_bytes())?;
            out.flush()?;
        }
        Ok(())
    }
}
