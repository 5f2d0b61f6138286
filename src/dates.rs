use chrono::{Duration, NaiveDate};

/// Inclusive date range covered by one export job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

/// Splits `range` into consecutive sub-ranges of at most `chunk_days` days.
///
/// Bounding per-request result size this way keeps individual API calls
/// small enough to finish inside the request timeout.
pub fn chunk_ranges(range: DateRange, chunk_days: u32) -> Vec<DateRange> {
    let mut chunks = Vec::new();
    let mut current = range.start;

    while current <= range.end {
        let chunk_end = (current + Duration::days(chunk_days as i64 - 1)).min(range.end);
        chunks.push(DateRange::new(current, chunk_end));
        current = chunk_end + Duration::days(1);
    }

    chunks
}

/// Serializes a chunk as the IST day bounds the API filter expects.
pub fn day_bounds(range: DateRange) -> (String, String) {
    (
        format!("{}T00:00:00.000+05:30", range.start.format("%Y-%m-%d")),
        format!("{}T23:59:59.000+05:30", range.end.format("%Y-%m-%d")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_chunks_cover_range_without_overlap() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 17));
        let chunks = chunk_ranges(range, 7);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], DateRange::new(date(2024, 1, 1), date(2024, 1, 7)));
        assert_eq!(chunks[1], DateRange::new(date(2024, 1, 8), date(2024, 1, 14)));
        assert_eq!(chunks[2], DateRange::new(date(2024, 1, 15), date(2024, 1, 17)));
    }

    #[test]
    fn test_single_day_range_yields_one_chunk() {
        let range = DateRange::new(date(2024, 3, 5), date(2024, 3, 5));
        let chunks = chunk_ranges(range, 3);

        assert_eq!(chunks, vec![range]);
    }

    #[test]
    fn test_day_bounds_use_ist_offsets() {
        let range = DateRange::new(date(2022, 4, 1), date(2022, 4, 3));
        let (start, end) = day_bounds(range);

        assert_eq!(start, "2022-04-01T00:00:00.000+05:30");
        assert_eq!(end, "2022-04-03T23:59:59.000+05:30");
    }
}
