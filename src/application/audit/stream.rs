//! Lazy, restartable walk over the audit trail.
//!
//! Entries are fetched in keyset pages ordered by `(timestamp, id)`, and
//! only the current page is held in memory. Entries appended during a walk
//! never shift or repeat earlier ones.

use std::collections::VecDeque;
use std::sync::Arc;

use futures_util::stream::{self, Stream};

use crate::domain::audit::{AuditCursor, AuditEntry, AuditFilter};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

pub struct AuditStream {
    repos: Arc<dyn RepositoryProvider>,
    filter: AuditFilter,
    page_size: u64,
    origin: Option<AuditCursor>,
    cursor: Option<AuditCursor>,
    buffer: VecDeque<AuditEntry>,
    exhausted: bool,
}

impl AuditStream {
    pub fn new(repos: Arc<dyn RepositoryProvider>, filter: AuditFilter, page_size: u64) -> Self {
        Self {
            repos,
            filter,
            page_size: page_size.max(1),
            origin: None,
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    pub fn filter(&self) -> &AuditFilter {
        &self.filter
    }

    /// Position of the last entry handed out, if any.
    pub fn position(&self) -> Option<AuditCursor> {
        self.cursor
    }

    /// Go back to where this stream started.
    pub fn restart(&mut self) {
        self.seek(self.origin);
    }

    /// Continue with the first entry after `cursor`. Later restarts return
    /// here.
    pub fn resume_after(&mut self, cursor: AuditCursor) {
        self.origin = Some(cursor);
        self.seek(Some(cursor));
    }

    fn seek(&mut self, cursor: Option<AuditCursor>) {
        self.cursor = cursor;
        self.buffer.clear();
        self.exhausted = false;
    }

    async fn fill(&mut self) -> DomainResult<()> {
        if !self.buffer.is_empty() || self.exhausted {
            return Ok(());
        }
        // the buffer is empty, so the fetch position is the last yielded entry
        let page = self
            .repos
            .audit()
            .page_after(&self.filter, self.cursor, self.page_size)
            .await?;
        if (page.len() as u64) < self.page_size {
            self.exhausted = true;
        }
        self.buffer.extend(page);
        Ok(())
    }

    /// Next entry, or `None` at the end of the trail.
    pub async fn next(&mut self) -> DomainResult<Option<AuditEntry>> {
        self.fill().await?;
        let entry = self.buffer.pop_front();
        if let Some(e) = &entry {
            self.cursor = Some(e.cursor());
        }
        Ok(entry)
    }

    /// Up to one page of entries. Empty at the end of the trail.
    pub async fn next_page(&mut self) -> DomainResult<Vec<AuditEntry>> {
        let mut page = Vec::new();
        while (page.len() as u64) < self.page_size {
            match self.next().await? {
                Some(e) => page.push(e),
                None => break,
            }
        }
        Ok(page)
    }

    /// Drain the remainder of the stream.
    pub async fn collect_remaining(&mut self) -> DomainResult<Vec<AuditEntry>> {
        let mut all = Vec::new();
        while let Some(e) = self.next().await? {
            all.push(e);
        }
        Ok(all)
    }

    /// Adapt into a `futures` stream.
    pub fn into_stream(self) -> impl Stream<Item = DomainResult<AuditEntry>> {
        stream::try_unfold(self, |mut s| async move {
            let next = s.next().await?;
            Ok::<_, DomainError>(next.map(|e| (e, s)))
        })
    }
}
