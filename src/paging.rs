//! Row paging: which rows to ask for, and single-flight bookkeeping.
//!
//! Every fetch carries a generation number. Only the response whose
//! generation matches the fetch currently in flight is applied; anything
//! else (superseded or issued before an invalidation) is discarded.

use crate::page::DataPage;

/// Inclusive range of zero-based data rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowWindow {
    pub start: usize,
    pub end: usize,
}

impl RowWindow {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn contains(&self, row: usize) -> bool {
        row >= self.start && row <= self.end
    }
}

/// Window to materialize for a viewport whose first row is `top`.
pub fn request_window(top: usize, page_size: usize, total: usize) -> Option<RowWindow> {
    if total == 0 {
        return None;
    }
    let last = total - 1;
    let start = top.min(last);
    let end = (start + page_size.max(1) - 1).min(last);
    Some(RowWindow::new(start, end))
}

/// Extend `requested` back to the end of the loaded window when the gap
/// between them is at most one page, so scrolling keeps one contiguous block.
pub fn bridge_window(
    requested: RowWindow,
    loaded: Option<RowWindow>,
    page_size: usize,
) -> RowWindow {
    match loaded {
        Some(loaded) if requested.start > loaded.end => {
            let gap = requested.start - loaded.end - 1;
            if gap <= page_size {
                RowWindow::new(loaded.end + 1, requested.end)
            } else {
                requested
            }
        }
        _ => requested,
    }
}

/// Collapse sorted row indexes into `"a-b"` / `"a"` range strings.
pub fn collapse_ranges(rows: &[usize]) -> Vec<String> {
    let mut out = Vec::new();
    let mut iter = rows.iter().copied();
    let Some(first) = iter.next() else {
        return out;
    };
    let (mut start, mut prev) = (first, first);
    let mut push = |start: usize, end: usize| {
        if start == end {
            out.push(start.to_string());
        } else {
            out.push(format!("{}-{}", start, end));
        }
    };
    for row in iter {
        if row == prev + 1 {
            prev = row;
            continue;
        }
        push(start, prev);
        start = row;
        prev = row;
    }
    push(start, prev);
    out
}

/// Range strings for rows of `window` not yet in `page`.
pub fn missing_ranges(window: RowWindow, page: &DataPage) -> Vec<String> {
    let missing: Vec<usize> = (window.start..=window.end)
        .filter(|row| !page.contains(*row))
        .collect();
    collapse_ranges(&missing)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub generation: u64,
    pub window: RowWindow,
    pub ranges: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pager {
    page_size: usize,
    generation: u64,
    in_flight: Option<FetchRequest>,
    queued: Option<RowWindow>,
    loaded: Option<RowWindow>,
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            ..Default::default()
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn in_flight(&self) -> Option<&FetchRequest> {
        self.in_flight.as_ref()
    }

    pub fn queued(&self) -> Option<RowWindow> {
        self.queued
    }

    pub fn loaded(&self) -> Option<RowWindow> {
        self.loaded
    }

    /// Ask for `window`. Returns the fetch to issue, or None when the rows are
    /// already cached or another fetch is in flight (the window is then
    /// queued, replacing any earlier queued window). Otherwise `window`
    /// supersedes whatever was queued.
    pub fn request(&mut self, window: RowWindow, page: &DataPage) -> Option<FetchRequest> {
        let window = bridge_window(window, self.loaded, self.page_size);
        if self.in_flight.is_some() {
            log::debug!(
                "Fetch in flight, queueing rows {}-{}",
                window.start,
                window.end
            );
            self.queued = Some(window);
            return None;
        }
        self.queued = None;
        let ranges = missing_ranges(window, page);
        if ranges.is_empty() {
            self.loaded = Some(window);
            return None;
        }
        self.generation += 1;
        let request = FetchRequest {
            generation: self.generation,
            window,
            ranges,
        };
        log::debug!(
            "Issuing fetch generation {} for {:?}",
            request.generation,
            request.ranges
        );
        self.in_flight = Some(request.clone());
        Some(request)
    }

    /// Record the response for `generation`. Returns true when it is the
    /// current in-flight fetch and should be applied.
    pub fn complete(&mut self, generation: u64) -> bool {
        match &self.in_flight {
            Some(current) if current.generation == generation => {
                self.loaded = Some(current.window);
                self.in_flight = None;
                true
            }
            _ => {
                log::debug!("Discarding stale response generation {}", generation);
                false
            }
        }
    }

    /// Like [`Pager::complete`] for a failed fetch. The loaded window stays
    /// and the queued window is dropped; the next scroll asks again.
    pub fn fail(&mut self, generation: u64) -> bool {
        match &self.in_flight {
            Some(current) if current.generation == generation => {
                self.in_flight = None;
                self.queued = None;
                true
            }
            _ => false,
        }
    }

    /// Replay the most recent queued window, if any, once nothing is in flight.
    pub fn next_request(&mut self, page: &DataPage) -> Option<FetchRequest> {
        if self.in_flight.is_some() {
            return None;
        }
        let window = self.queued.take()?;
        self.request(window, page)
    }

    /// Forget everything loaded or pending. Responses to earlier fetches will
    /// no longer match and are discarded.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.in_flight = None;
        self.queued = None;
        self.loaded = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn page_with(rows: impl IntoIterator<Item = usize>) -> DataPage {
        let columns = vec![Column::new("a", "int64", 1)];
        let results: BTreeMap<String, serde_json::Map<String, serde_json::Value>> = rows
            .into_iter()
            .map(|r| {
                let mut m = serde_json::Map::new();
                m.insert("a".to_string(), json!(r));
                (r.to_string(), m)
            })
            .collect();
        let mut page = DataPage::default();
        page.merge_results(&results, &columns, 2);
        page
    }

    #[test]
    fn test_collapse_ranges() {
        assert_eq!(collapse_ranges(&[10, 11, 12]), vec!["10-12"]);
        assert_eq!(collapse_ranges(&[1, 3, 4, 9]), vec!["1", "3-4", "9"]);
        assert!(collapse_ranges(&[]).is_empty());
    }

    #[test]
    fn test_request_window_clamped() {
        assert_eq!(request_window(0, 56, 1000), Some(RowWindow::new(0, 55)));
        assert_eq!(request_window(980, 56, 1000), Some(RowWindow::new(980, 999)));
        assert_eq!(request_window(5, 56, 0), None);
    }

    #[test]
    fn test_bridges_to_loaded_window() {
        let page = page_with(0..=55);
        let mut pager = Pager::new(56);
        pager.loaded = Some(RowWindow::new(0, 55));
        let req = pager.request(RowWindow::new(100, 150), &page).unwrap();
        assert_eq!(req.ranges, vec!["56-150"]);
        assert_eq!(req.window, RowWindow::new(56, 150));
    }

    #[test]
    fn test_far_jump_leaves_sparse_cache() {
        let page = page_with((0..=55).chain(520..=530));
        let mut pager = Pager::new(56);
        pager.loaded = Some(RowWindow::new(0, 55));
        let req = pager.request(RowWindow::new(500, 555), &page).unwrap();
        assert_eq!(req.ranges, vec!["500-519", "531-555"]);
    }

    #[test]
    fn test_cached_window_issues_nothing() {
        let page = page_with(0..=55);
        let mut pager = Pager::new(56);
        assert!(pager.request(RowWindow::new(10, 40), &page).is_none());
        assert_eq!(pager.generation(), 0);
    }

    #[test]
    fn test_rapid_requests_replay_only_latest() {
        let mut page = DataPage::default();
        let mut pager = Pager::new(10);
        let first = pager.request(RowWindow::new(0, 9), &page).unwrap();

        assert!(pager.request(RowWindow::new(100, 109), &page).is_none());
        assert!(pager.request(RowWindow::new(200, 209), &page).is_none());
        assert!(pager.request(RowWindow::new(300, 309), &page).is_none());
        assert_eq!(pager.queued(), Some(RowWindow::new(300, 309)));

        assert!(pager.complete(first.generation));
        page = page_with(0..=9);
        let next = pager.next_request(&page).unwrap();
        assert_eq!(next.ranges, vec!["300-309"]);
        assert!(pager.next_request(&page).is_none());
    }

    #[test]
    fn test_invalidate_discards_in_flight_response() {
        let page = DataPage::default();
        let mut pager = Pager::new(10);
        let stale = pager.request(RowWindow::new(0, 9), &page).unwrap();
        pager.request(RowWindow::new(50, 59), &page);
        pager.invalidate();
        assert!(pager.queued().is_none());
        assert!(!pager.complete(stale.generation));

        let fresh = pager.request(RowWindow::new(0, 9), &page).unwrap();
        assert!(fresh.generation > stale.generation);
        assert!(!pager.complete(stale.generation));
        assert!(pager.complete(fresh.generation));
        assert_eq!(pager.loaded(), Some(RowWindow::new(0, 9)));
    }

    #[test]
    fn test_failed_fetch_clears_in_flight() {
        let page = DataPage::default();
        let mut pager = Pager::new(10);
        let req = pager.request(RowWindow::new(0, 9), &page).unwrap();
        assert!(pager.fail(req.generation));
        assert!(pager.in_flight().is_none());
        assert!(pager.loaded().is_none());
    }

    #[test]
    fn test_failed_fetch_drops_queued_window() {
        let mut page = DataPage::default();
        let mut pager = Pager::new(10);
        let first = pager.request(RowWindow::new(0, 9), &page).unwrap();
        assert!(pager.request(RowWindow::new(400, 409), &page).is_none());
        assert!(pager.fail(first.generation));
        assert!(pager.queued().is_none());

        let latest = pager.request(RowWindow::new(700, 709), &page).unwrap();
        assert!(pager.complete(latest.generation));
        page = page_with(700..=709);
        assert!(pager.next_request(&page).is_none());
        assert_eq!(pager.loaded(), Some(RowWindow::new(700, 709)));
    }

    #[test]
    fn test_satisfied_request_supersedes_queue() {
        let page = page_with(0..=9);
        let mut pager = Pager::new(10);
        pager.queued = Some(RowWindow::new(400, 409));
        assert!(pager.request(RowWindow::new(0, 9), &page).is_none());
        assert!(pager.queued().is_none());
        assert!(pager.next_request(&page).is_none());
    }
}
