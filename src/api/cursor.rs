//! Poll cursor for `GET /responses/new`, kept as an append-only file of Unix timestamps.
//!
//! Lines are decimal seconds with millisecond precision (`1700000000.250`).
//! Whole-second lines from older files still parse.

use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt as _;
use tokio::sync::Mutex;

/// Last-polled timestamp, persisted one decimal value per line.
///
/// Values are handled in milliseconds. The current cursor is the last
/// non-empty line that parses. Appends are strictly increasing: each writes
/// `max(now, last + 1ms)`, so repeated polls never push it past the clock by
/// more than a millisecond each.
#[derive(Debug)]
pub struct QueryCursor {
    path: PathBuf,
    lock: Mutex<()>,
}

impl QueryCursor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file (and its directory) if it doesn't exist yet.
    pub async fn ensure_exists(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        Ok(())
    }

    /// The stored cursor in milliseconds. Unreadable files count as "no cursor".
    pub async fn current(&self) -> Option<i64> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => last_timestamp(&contents),
            Err(error) => {
                tracing::debug!(%error, path = %self.path.display(), "cursor file unreadable");
                None
            }
        }
    }

    /// Run `query` with the current cursor, then advance the cursor to `now_millis`.
    ///
    /// The cursor advances whatever the query produced. Concurrent polls in
    /// this process are serialized; other processes sharing the file are not.
    pub async fn poll<T, F, Fut>(&self, now_millis: i64, query: F) -> T
    where
        F: FnOnce(Option<i64>) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let _guard = self.lock.lock().await;

        let last = self.current().await;
        let result = query(last).await;

        let next = last.map_or(now_millis, |last| now_millis.max(last + 1));
        if let Err(error) = self.append(next).await {
            tracing::error!(%error, path = %self.path.display(), "failed to advance query cursor");
        }

        result
    }

    async fn append(&self, millis: i64) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format_millis(millis).as_bytes()).await?;
        file.flush().await
    }
}

fn format_millis(millis: i64) -> String {
    format!("{}.{:03}\n", millis.div_euclid(1000), millis.rem_euclid(1000))
}

fn parse_millis(line: &str) -> Option<i64> {
    let Some((seconds, fraction)) = line.split_once('.') else {
        return line.parse::<i64>().ok()?.checked_mul(1000);
    };
    if fraction.is_empty() || !fraction.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let seconds = seconds.parse::<i64>().ok()?;
    let mut millis = 0;
    for (position, digit) in fraction.bytes().take(3).enumerate() {
        millis += i64::from(digit - b'0') * 10_i64.pow(2 - position as u32);
    }
    seconds.checked_mul(1000)?.checked_add(millis)
}

fn last_timestamp(contents: &str) -> Option<i64> {
    contents
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find_map(parse_millis)
}
