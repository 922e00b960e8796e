//! Host-side decoding of the report stream a supervisor node emits over
//! its serial link.

pub use open_bist_common::report::{
    Outcome, REPORT_LEN, REPORT_MARKER, Report, ReportError, StatusWord,
};

/// Reassembles report frames out of an arbitrarily chunked byte stream.
///
/// Serial captures start at whatever byte the port happened to deliver
/// first, so the scanner hunts for the marker and resynchronizes one byte
/// at a time whenever a candidate frame does not parse. Partial tails are
/// buffered until the next `push`.
#[derive(Default)]
pub struct FrameScanner {
    pending: Vec<u8>,
}

impl FrameScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<Report> {
        self.pending.extend_from_slice(bytes);

        let mut reports = Vec::new();
        let mut start = 0;
        while self.pending.len() - start >= REPORT_LEN {
            match Report::parse(&self.pending[start..start + REPORT_LEN]) {
                Ok(report) => {
                    reports.push(report);
                    start += REPORT_LEN;
                }
                Err(_) => start += 1,
            }
        }
        self.pending.drain(..start);
        reports
    }
}

/// Wrapping distance between the counters of two consecutive reports.
///
/// 1 is nominal, 0 means a stalled or duplicated frame, anything larger is
/// the number of reports the capture missed.
pub fn counter_gap(prev: u32, next: u32) -> u32 {
    next.wrapping_sub(prev)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(counter: u32, status_raw: u8) -> [u8; REPORT_LEN] {
        Report {
            counter,
            status: StatusWord::from_raw(status_raw).unwrap(),
        }
        .encode()
    }

    #[test]
    fn scanner_skips_leading_garbage_and_resynchronizes() {
        let mut scanner = FrameScanner::new();
        let mut stream = vec![0x00, 0xff, 0x7f];
        stream.extend_from_slice(&frame(7, 0x01));
        let reports = scanner.push(&stream);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].counter, 7);
        assert_eq!(reports[0].status.can(), Outcome::Error);
    }

    #[test]
    fn scanner_buffers_a_frame_split_across_pushes() {
        let mut scanner = FrameScanner::new();
        let bytes = frame(42, 0x00);
        assert!(scanner.push(&bytes[..4]).is_empty());
        let reports = scanner.push(&bytes[4..]);
        assert_eq!(reports, vec![Report::parse(&bytes).unwrap()]);
    }

    #[test]
    fn scanner_drops_frames_with_reserved_status_bits() {
        let mut scanner = FrameScanner::new();
        let mut bad = frame(1, 0x00);
        bad[5] = 0x80;
        let mut stream = bad.to_vec();
        stream.extend_from_slice(&frame(2, 0x08));
        let reports = scanner.push(&stream);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].counter, 2);
        assert_eq!(reports[0].status.watchdog(), Outcome::Error);
    }

    #[test]
    fn counter_gap_wraps_with_the_counter() {
        assert_eq!(counter_gap(4, 5), 1);
        assert_eq!(counter_gap(5, 5), 0);
        assert_eq!(counter_gap(u32::MAX, 0), 1);
        assert_eq!(counter_gap(u32::MAX - 1, 2), 4);
    }
}
