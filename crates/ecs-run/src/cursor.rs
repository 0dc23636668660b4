//! Log Tail Cursor
//!
//! Follows one CloudWatch log stream across poll cycles. Deduplication rests
//! entirely on the forward token: every poll resumes from the last stored
//! token, so a record is returned at most once as long as the service hands
//! out advancing tokens.

use crate::aws::{LogFetchError, LogOperations, LogRecord};
use ecs_run_common::LogLocation;
use ecs_run_common::defaults::MAX_LOG_PAGES_PER_POLL;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum CursorState {
    /// Stream name not derivable; polling yields nothing
    Uninitialized,
    Active {
        group: String,
        stream: String,
        /// None until the first page has been read
        token: Option<String>,
    },
}

/// Per-stream pagination state
#[derive(Debug, Clone)]
pub struct LogCursor {
    state: CursorState,
    max_pages: usize,
}

/// Records returned by one poll, in the order the service returned them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogBatch {
    records: Vec<LogRecord>,
}

impl LogBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl IntoIterator for LogBatch {
    type Item = LogRecord;
    type IntoIter = std::vec::IntoIter<LogRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl Default for LogCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl LogCursor {
    pub fn new() -> Self {
        Self {
            state: CursorState::Uninitialized,
            max_pages: MAX_LOG_PAGES_PER_POLL,
        }
    }

    /// Cursor for a task's stream, left uninitialized when the task
    /// definition has no log location
    pub fn for_task(location: Option<&LogLocation>, app_name: &str, task_id: &str) -> Self {
        let mut cursor = Self::new();
        if let Some(location) = location {
            cursor.activate(location, app_name, task_id);
        }
        cursor
    }

    /// Limit the number of pages drained by a single poll
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Point the cursor at the task's stream. Re-activating an already
    /// active cursor keeps its position.
    pub fn activate(&mut self, location: &LogLocation, app_name: &str, task_id: &str) {
        if self.is_active() {
            return;
        }
        let stream = location.stream_name(app_name, task_id);
        debug!(group = %location.group, stream = %stream, "Log cursor activated");
        self.state = CursorState::Active {
            group: location.group.clone(),
            stream,
            token: None,
        };
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, CursorState::Active { .. })
    }

    /// `(group, stream)` once active
    pub fn stream(&self) -> Option<(&str, &str)> {
        match &self.state {
            CursorState::Active { group, stream, .. } => Some((group, stream)),
            CursorState::Uninitialized => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match &self.state {
            CursorState::Active { token, .. } => token.as_deref(),
            CursorState::Uninitialized => None,
        }
    }

    /// Read every record written since the previous poll.
    ///
    /// Pages are fetched until the service hands back the token that was
    /// sent, which means there is nothing newer. Reading starts from the head
    /// of the stream on the very first request. If a request fails after
    /// some pages were read, those records are returned and the failing page
    /// is retried on the next poll.
    pub async fn poll<L: LogOperations>(&mut self, logs: &L) -> Result<LogBatch, LogFetchError> {
        let CursorState::Active {
            group,
            stream,
            token,
        } = &mut self.state
        else {
            return Ok(LogBatch::default());
        };

        let mut records = Vec::new();

        for _ in 0..self.max_pages {
            let sent = token.clone();
            let page = match logs
                .fetch(group, stream, sent.as_deref(), sent.is_none())
                .await
            {
                Ok(page) => page,
                Err(e) if !records.is_empty() => {
                    debug!(error = %e, "Log fetch failed mid-poll, keeping records read so far");
                    break;
                }
                Err(e) => return Err(e),
            };

            match page.next_token {
                Some(next) if sent.as_deref() != Some(next.as_str()) => {
                    records.extend(page.records);
                    *token = Some(next);
                }
                // Same token back (or none at all): nothing new past this point
                _ => break,
            }
        }

        Ok(LogBatch { records })
    }
}
