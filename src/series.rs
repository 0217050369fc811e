//! Chronological ordering and fixed-size paging of sensor records.

use serde::Serialize;

use crate::model::SensorRecord;
use crate::timezone::format_record_time;

/// Rows per table page.
pub const ITEMS_PER_PAGE: usize = 100;

/// Sort records ascending by timestamp. The sort is stable, so equal
/// timestamps keep their extraction order.
pub fn sort_records(mut records: Vec<SensorRecord>) -> Vec<SensorRecord> {
    records.sort_by_key(|r| r.timestamp);
    records
}

/// A sorted record sequence split into pages of [`ITEMS_PER_PAGE`].
#[derive(Debug, Clone, Default)]
pub struct RecordPages {
    records: Vec<SensorRecord>,
}

impl RecordPages {
    /// Sort `records` and wrap them for paging.
    pub fn new(records: Vec<SensorRecord>) -> Self {
        Self {
            records: sort_records(records),
        }
    }

    pub fn records(&self) -> &[SensorRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `ceil(len / ITEMS_PER_PAGE)`; zero for an empty sequence.
    pub fn total_pages(&self) -> usize {
        self.records.len().div_ceil(ITEMS_PER_PAGE)
    }

    /// Clamp a requested page index into `[0, total_pages)`.
    ///
    /// Returns `None` when there are no pages at all.
    pub fn clamp_page(&self, page: usize) -> Option<usize> {
        let pages = self.total_pages();
        (pages > 0).then(|| page.min(pages - 1))
    }

    /// Records on `page` after clamping; empty when there are no pages.
    pub fn page(&self, page: usize) -> &[SensorRecord] {
        match self.clamp_page(page) {
            Some(page) => {
                let start = page * ITEMS_PER_PAGE;
                let end = (start + ITEMS_PER_PAGE).min(self.records.len());
                &self.records[start..end]
            }
            None => &[],
        }
    }

    /// Table rows for `page`, numbered from 1 across the whole sequence.
    pub fn rows(&self, page: usize) -> Vec<TableRow> {
        let Some(page) = self.clamp_page(page) else {
            return Vec::new();
        };
        self.page(page)
            .iter()
            .enumerate()
            .map(|(i, record)| TableRow::new(page * ITEMS_PER_PAGE + i + 1, record))
            .collect()
    }

    pub fn into_records(self) -> Vec<SensorRecord> {
        self.records
    }
}

/// One rendered row of the temperature table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub serial: usize,
    pub timestamp: i64,
    pub date: String,
    pub temperature: f64,
    pub temperature_label: String,
}

impl TableRow {
    fn new(serial: usize, record: &SensorRecord) -> Self {
        Self {
            serial,
            timestamp: record.timestamp,
            date: format_record_time(record.timestamp),
            temperature: record.temperature,
            temperature_label: format!("{:.1}°C", record.temperature),
        }
    }
}

/// What a temperature view should show once a report has been processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableState {
    /// The report came back without any usable readings.
    Empty,

    /// At least one page of readings is available.
    Ready,
}

impl TableState {
    pub fn of(pages: &RecordPages) -> Self {
        if pages.is_empty() {
            TableState::Empty
        } else {
            TableState::Ready
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(timestamp: i64, temperature: f64) -> SensorRecord {
        SensorRecord {
            timestamp,
            temperature,
        }
    }

    fn many(n: usize) -> Vec<SensorRecord> {
        (0..n).map(|i| rec(10_000 - i as i64, i as f64)).collect()
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let sorted = sort_records(vec![rec(5, 1.0), rec(3, 2.0), rec(5, 3.0), rec(1, 4.0)]);
        assert_eq!(sorted, vec![rec(1, 4.0), rec(3, 2.0), rec(5, 1.0), rec(5, 3.0)]);
    }

    #[test]
    fn test_empty_has_no_pages() {
        let pages = RecordPages::new(Vec::new());
        assert_eq!(pages.total_pages(), 0);
        assert_eq!(pages.clamp_page(0), None);
        assert!(pages.page(3).is_empty());
        assert!(pages.rows(0).is_empty());
        assert_eq!(TableState::of(&pages), TableState::Empty);
    }

    #[test]
    fn test_page_count_and_partial_last_page() {
        let pages = RecordPages::new(many(250));
        assert_eq!(pages.total_pages(), 3);
        assert_eq!(pages.page(0).len(), 100);
        assert_eq!(pages.page(2).len(), 50);
        assert_eq!(TableState::of(&pages), TableState::Ready);
    }

    #[test]
    fn test_page_index_is_clamped() {
        let pages = RecordPages::new(many(150));
        assert_eq!(pages.clamp_page(99), Some(1));
        assert_eq!(pages.page(99), pages.page(1));
    }

    #[test]
    fn test_rows_are_numbered_across_pages() {
        let pages = RecordPages::new(many(120));
        let rows = pages.rows(1);
        assert_eq!(rows.len(), 20);
        assert_eq!(rows[0].serial, 101);
        assert_eq!(rows[19].serial, 120);
    }

    #[test]
    fn test_row_formatting() {
        let pages = RecordPages::new(vec![rec(1_704_067_200, 21.04)]);
        let row = &pages.rows(0)[0];
        assert_eq!(row.date, "01-01-2024 00:00:00");
        assert_eq!(row.temperature_label, "21.0°C");
    }
}
