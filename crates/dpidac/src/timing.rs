// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Video timing records and the timings-document parser
//!
//! A timings document is plain text, one mode per line, in the 13-field
//! format used by the Raspberry Pi firmware `dpi_timings` setting:
//!
//! ```text
//! # hactive hsync_pol hfront hsync hback vactive vsync_pol vfront vsync vback ...
//! 320 1 4 30 46 240 1 4 5 14 0 0 0 60 0 6400000 1
//! ```
//!
//! The four tokens between the vertical back porch and the interlace flag
//! (`v_sync_offset_a`, `v_sync_offset_b`, `pixel_rep`, `frame_rate` in the
//! firmware format) are skipped without validation; the refresh rate is
//! always derived from the pixel clock and the totals.
//!
//! Limits mirror the fixed buffers of the bridge driver: only the first
//! [`READ_SIZE_MAX`] bytes of a document are considered, and lines are cut at
//! [`LINE_SIZE_MAX`] bytes.

use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::Error;

/// Maximum number of bytes read from a timings document
pub const READ_SIZE_MAX: usize = 2048;

/// Maximum length of a single timings line in bytes
pub const LINE_SIZE_MAX: usize = 256;

/// Lines shorter than this (after trimming) never hold a complete record
pub const LINE_SIZE_MIN: usize = 32;

/// Lines starting with this character are comments
pub const COMMENT_PREFIX: char = '#';

/// Largest accepted active, porch or sync value, the range of a DRM mode
/// field
pub const TIMING_FIELD_MAX: u32 = u16::MAX as u32;

/// Number of numeric fields consumed from a timings line
pub const TIMING_FIELD_COUNT: usize = 13;

// Token positions of the numeric fields; tokens 10..14 are skipped.
const NUMERIC_TOKENS: [usize; TIMING_FIELD_COUNT] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 14, 15, 16];

/// Sync pulse polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncPolarity {
    /// Active low (negative) sync pulse
    Low,
    /// Active high (positive) sync pulse
    #[default]
    High,
}

impl SyncPolarity {
    /// Polarity from a timings-document flag: nonzero means active low.
    pub fn from_flag(flag: i64) -> Self {
        if flag != 0 {
            SyncPolarity::Low
        } else {
            SyncPolarity::High
        }
    }

    /// Modeline-style sign, `'+'` for high and `'-'` for low.
    pub fn sign(&self) -> char {
        match self {
            SyncPolarity::Low => '-',
            SyncPolarity::High => '+',
        }
    }
}

/// Normalized display timing
///
/// Horizontal values are in pixels, vertical values in lines. For interlaced
/// timings the vertical values describe the full frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VideoTiming {
    pub pixel_clock_hz: u64,
    pub h_active: u32,
    pub h_front_porch: u32,
    pub h_sync_len: u32,
    pub h_back_porch: u32,
    pub v_active: u32,
    pub v_front_porch: u32,
    pub v_sync_len: u32,
    pub v_back_porch: u32,
    pub interlaced: bool,
    pub h_sync_polarity: SyncPolarity,
    pub v_sync_polarity: SyncPolarity,
}

impl VideoTiming {
    /// Total pixels per line, blanking included
    pub fn h_total(&self) -> u32 {
        self.h_active
            .saturating_add(self.h_front_porch)
            .saturating_add(self.h_sync_len)
            .saturating_add(self.h_back_porch)
    }

    /// Total lines per frame, blanking included
    pub fn v_total(&self) -> u32 {
        self.v_active
            .saturating_add(self.v_front_porch)
            .saturating_add(self.v_sync_len)
            .saturating_add(self.v_back_porch)
    }

    /// Vertical refresh rate in Hz.
    ///
    /// Interlaced timings refresh one field per half frame, so their rate is
    /// twice the frame rate.
    pub fn refresh_hz(&self) -> f64 {
        let total = self.h_total() as u64 * self.v_total() as u64;
        if total == 0 {
            return 0.0;
        }
        let rate = self.pixel_clock_hz as f64 / total as f64;
        if self.interlaced {
            rate * 2.0
        } else {
            rate
        }
    }

    /// Refresh rate rounded to the nearest Hz
    pub fn refresh_rounded(&self) -> u32 {
        self.refresh_hz().round() as u32
    }

    /// Horizontal scan rate in Hz
    pub fn h_freq_hz(&self) -> f64 {
        match self.h_total() {
            0 => 0.0,
            total => self.pixel_clock_hz as f64 / total as f64,
        }
    }

    /// Mode name in the DRM convention, e.g. `"1920x1080"` or `"640x480i"`.
    pub fn name(&self) -> String {
        format!(
            "{}x{}{}",
            self.h_active,
            self.v_active,
            if self.interlaced { "i" } else { "" }
        )
    }

    /// Check that every active, porch and sync field is nonzero and at most
    /// [`TIMING_FIELD_MAX`], and that the pixel clock is set.
    pub fn validate(&self) -> Result<(), Error> {
        let fields = [
            ("hactive", self.h_active),
            ("hfront", self.h_front_porch),
            ("hsync", self.h_sync_len),
            ("hback", self.h_back_porch),
            ("vactive", self.v_active),
            ("vfront", self.v_front_porch),
            ("vsync", self.v_sync_len),
            ("vback", self.v_back_porch),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| *value == 0) {
            return Err(Error::MalformedLine(format!("{} must be nonzero", name)));
        }
        if let Some((name, value)) = fields.iter().find(|(_, value)| *value > TIMING_FIELD_MAX) {
            return Err(Error::MalformedLine(format!(
                "{} out of range ({} > {})",
                name, value, TIMING_FIELD_MAX
            )));
        }
        if self.pixel_clock_hz == 0 {
            return Err(Error::MalformedLine("pixel clock must be nonzero".into()));
        }
        Ok(())
    }
}

/// Formats the timing as an X11 modeline body.
impl fmt::Display for VideoTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hss = self.h_active.saturating_add(self.h_front_porch);
        let hse = hss.saturating_add(self.h_sync_len);
        let vss = self.v_active.saturating_add(self.v_front_porch);
        let vse = vss.saturating_add(self.v_sync_len);
        write!(
            f,
            "\"{}\" {:.2} {} {} {} {} {} {} {} {} {}hsync {}vsync{}",
            self.name(),
            self.pixel_clock_hz as f64 / 1_000_000.0,
            self.h_active,
            hss,
            hse,
            self.h_total(),
            self.v_active,
            vss,
            vse,
            self.v_total(),
            self.h_sync_polarity.sign(),
            self.v_sync_polarity.sign(),
            if self.interlaced { " Interlace" } else { "" }
        )
    }
}

/// Parse one 13-field timings line.
///
/// The line is trimmed first. Comment lines and lines shorter than
/// [`LINE_SIZE_MIN`] are rejected; callers iterating a document should skip
/// them before calling this (see [`RawLine::is_candidate`]).
///
/// # Errors
///
/// Returns [`Error::MalformedLine`] when fewer than 13 numeric fields parse
/// or a geometry field is zero or out of range.
///
/// # Example
///
/// ```
/// use dpidac::timing::{parse_timing_line, SyncPolarity};
///
/// let t = parse_timing_line("640 1 24 96 48 480 1 11 2 32 0 0 0 60 0 25452000 1")?;
/// assert_eq!((t.h_active, t.v_active), (640, 480));
/// assert_eq!(t.h_sync_polarity, SyncPolarity::Low);
/// assert_eq!(t.refresh_rounded(), 60);
/// # Ok::<(), dpidac::Error>(())
/// ```
pub fn parse_timing_line(line: &str) -> Result<VideoTiming, Error> {
    let line = line.trim();
    if line.starts_with(COMMENT_PREFIX) {
        return Err(Error::MalformedLine(format!("comment line: {}", line)));
    }
    if line.len() < LINE_SIZE_MIN {
        return Err(Error::MalformedLine(format!("line too short: {}", line)));
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut fields = [0i64; TIMING_FIELD_COUNT];
    let mut parsed = 0;
    for (slot, &index) in fields.iter_mut().zip(NUMERIC_TOKENS.iter()) {
        match tokens.get(index).and_then(|token| token.parse::<i64>().ok()) {
            Some(value) => *slot = value,
            None => break,
        }
        parsed += 1;
    }
    if parsed != TIMING_FIELD_COUNT {
        return Err(Error::MalformedLine(format!(
            "expected {} numeric fields, parsed {}: {}",
            TIMING_FIELD_COUNT, parsed, line
        )));
    }

    let [hactive, hsync_pol, hfront, hsync, hback, vactive, vsync_pol, vfront, vsync, vback, interlace, pixelclock, _ratio] =
        fields;

    let field = |name: &str, value: i64| -> Result<u32, Error> {
        u32::try_from(value)
            .map_err(|_| Error::MalformedLine(format!("{} out of range ({}): {}", name, value, line)))
    };

    let timing = VideoTiming {
        pixel_clock_hz: u64::try_from(pixelclock).map_err(|_| {
            Error::MalformedLine(format!("negative pixel clock ({}): {}", pixelclock, line))
        })?,
        h_active: field("hactive", hactive)?,
        h_front_porch: field("hfront", hfront)?,
        h_sync_len: field("hsync", hsync)?,
        h_back_porch: field("hback", hback)?,
        v_active: field("vactive", vactive)?,
        v_front_porch: field("vfront", vfront)?,
        v_sync_len: field("vsync", vsync)?,
        v_back_porch: field("vback", vback)?,
        interlaced: interlace != 0,
        h_sync_polarity: SyncPolarity::from_flag(hsync_pol),
        v_sync_polarity: SyncPolarity::from_flag(vsync_pol),
    };
    timing
        .validate()
        .map_err(|e| Error::MalformedLine(format!("{}: {}", e, line)))?;

    Ok(timing)
}

/// One line of a timings document as cut by [`TimingLines`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine<'a> {
    /// 1-based line number
    pub number: usize,
    /// Line text without its terminator
    pub text: Cow<'a, str>,
}

impl RawLine<'_> {
    /// Whether the line is a `#` comment
    pub fn is_comment(&self) -> bool {
        self.text.trim_start().starts_with(COMMENT_PREFIX)
    }

    /// Whether the line is too short to hold a record (blank lines included)
    pub fn is_too_short(&self) -> bool {
        self.text.trim().len() < LINE_SIZE_MIN
    }

    /// Whether the line should be handed to [`parse_timing_line`]
    pub fn is_candidate(&self) -> bool {
        !self.is_comment() && !self.is_too_short()
    }
}

/// Streaming line splitter over an in-memory timings document.
///
/// Lines end at `\n` or NUL. A line that reaches [`LINE_SIZE_MAX`] bytes
/// without a terminator is cut there: its last byte is dropped, leaving
/// `LINE_SIZE_MAX - 1` bytes, and the remaining bytes start the next line. Bytes past
/// [`READ_SIZE_MAX`] are ignored. A final line without a terminator is still
/// yielded.
#[derive(Debug, Clone)]
pub struct TimingLines<'a> {
    buf: &'a [u8],
    pos: usize,
    number: usize,
}

impl<'a> TimingLines<'a> {
    pub fn new(document: &'a [u8]) -> Self {
        let len = document.len().min(READ_SIZE_MAX);
        TimingLines {
            buf: &document[..len],
            pos: 0,
            number: 0,
        }
    }
}

impl<'a> Iterator for TimingLines<'a> {
    type Item = RawLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buf.len() {
            return None;
        }

        let rest = &self.buf[self.pos..];
        let window = &rest[..rest.len().min(LINE_SIZE_MAX)];
        let (line, consumed) = match window.iter().position(|&b| b == b'\n' || b == 0) {
            Some(end) => (&window[..end], end + 1),
            None if window.len() == LINE_SIZE_MAX => {
                (&window[..LINE_SIZE_MAX - 1], LINE_SIZE_MAX)
            }
            None => (window, window.len()),
        };

        self.pos += consumed;
        self.number += 1;
        Some(RawLine {
            number: self.number,
            text: String::from_utf8_lossy(line),
        })
    }
}

/// Read a timings document, keeping at most [`READ_SIZE_MAX`] bytes.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be opened or read.
pub fn try_read_timings_document(path: &Path) -> Result<Vec<u8>, Error> {
    let file = File::open(path)?;
    let mut buf = Vec::with_capacity(READ_SIZE_MAX);
    file.take(READ_SIZE_MAX as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Read a timings document, treating a missing or unreadable file as an
/// empty source.
pub fn read_timings_document(path: &Path) -> Vec<u8> {
    match try_read_timings_document(path) {
        Ok(buf) if buf.is_empty() => {
            log::warn!(
                "empty timings file {}, skipping custom modes",
                path.display()
            );
            buf
        }
        Ok(buf) => {
            log::debug!("read {} bytes of timings from {}", buf.len(), path.display());
            buf
        }
        Err(e) => {
            log::warn!(
                "timings file {} not readable ({}), skipping custom modes",
                path.display(),
                e
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE_240P: &str = "320 1 4 30 46 240 1 4 5 14 0 0 0 60 0 6400000 1";
    const LINE_480I: &str = "640 1 24 64 104 480 1 3 6 34 0 0 0 60 1 13054080 1";

    #[test]
    fn test_parse_geometry_fields() {
        let t = parse_timing_line(LINE_240P).unwrap();
        assert_eq!(t.pixel_clock_hz, 6_400_000);
        assert_eq!(
            (t.h_active, t.h_front_porch, t.h_sync_len, t.h_back_porch),
            (320, 4, 30, 46)
        );
        assert_eq!(
            (t.v_active, t.v_front_porch, t.v_sync_len, t.v_back_porch),
            (240, 4, 5, 14)
        );
        assert!(!t.interlaced);
        assert_eq!(t.h_sync_polarity, SyncPolarity::Low);
        assert_eq!(t.v_sync_polarity, SyncPolarity::Low);
    }

    #[test]
    fn test_parse_polarity_and_interlace() {
        let t = parse_timing_line("1920 0 88 44 148 1080 1 4 5 36 0 0 0 60 1 148500000 1").unwrap();
        assert_eq!(t.h_sync_polarity, SyncPolarity::High);
        assert_eq!(t.v_sync_polarity, SyncPolarity::Low);
        assert!(t.interlaced);
    }

    #[test]
    fn test_parse_ignored_tokens_not_validated() {
        let t = parse_timing_line("320 1 4 30 46 240 1 4 5 14 a b c d 0 6400000 1").unwrap();
        assert_eq!(t.h_active, 320);
    }

    #[test]
    fn test_parse_trims_and_accepts_trailing_tokens() {
        let line = format!("  {} extra tokens\r", LINE_240P);
        assert!(parse_timing_line(&line).is_ok());
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let err = parse_timing_line("320 1 4 30 46 240 1 4 5 14 0 0 0 60 0 6400000").unwrap_err();
        assert!(matches!(err, Error::MalformedLine(_)));
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let err = parse_timing_line("320 1 4 30 46 abc 1 4 5 14 0 0 0 60 0 6400000 1").unwrap_err();
        assert!(matches!(err, Error::MalformedLine(_)));
    }

    #[test]
    fn test_parse_rejects_short_and_comment() {
        assert!(parse_timing_line("320 1 4 30 46 240").is_err());
        assert!(parse_timing_line(&format!("# {}", LINE_240P)).is_err());
        assert!(parse_timing_line("").is_err());
    }

    #[test]
    fn test_parse_rejects_zero_porch() {
        let err = parse_timing_line("320 1 0 30 46 240 1 4 5 14 0 0 0 60 0 6400000 1").unwrap_err();
        assert!(format!("{}", err).contains("hfront"));
    }

    #[test]
    fn test_parse_rejects_negative_values() {
        assert!(parse_timing_line("320 1 4 30 46 240 1 4 5 14 0 0 0 60 0 -6400000 1").is_err());
        assert!(parse_timing_line("-320 1 4 30 46 240 1 4 5 14 0 0 0 60 0 6400000 1").is_err());
    }

    #[test]
    fn test_parse_rejects_fields_past_u16() {
        let err = parse_timing_line("4294967295 1 4 30 46 240 1 4 5 14 0 0 0 60 0 6400000 1")
            .unwrap_err();
        assert!(matches!(err, Error::MalformedLine(_)));
        assert!(format!("{}", err).contains("hactive out of range"));

        assert!(parse_timing_line("320 1 4 30 46 240 1 4 5 65536 0 0 0 60 0 6400000 1").is_err());
        assert!(parse_timing_line("65535 1 4 30 46 240 1 4 5 14 0 0 0 60 0 6400000 1").is_ok());
    }

    #[test]
    fn test_totals_saturate() {
        let t = VideoTiming {
            h_active: u32::MAX,
            v_active: u32::MAX,
            ..parse_timing_line(LINE_240P).unwrap()
        };
        assert_eq!(t.h_total(), u32::MAX);
        assert_eq!(t.v_total(), u32::MAX);
        assert!(t.validate().is_err());
        assert_eq!(t.refresh_rounded(), 0);
    }

    #[test]
    fn test_refresh_interlaced_counts_fields() {
        let t = parse_timing_line(LINE_480I).unwrap();
        assert_eq!(t.h_total(), 832);
        assert_eq!(t.v_total(), 523);
        assert_eq!(t.refresh_rounded(), 60);
        assert_eq!(t.name(), "640x480i");
    }

    #[test]
    fn test_display_modeline() {
        let t = parse_timing_line("640 1 24 96 48 480 1 11 2 32 0 0 0 60 0 25452000 1").unwrap();
        assert_eq!(
            t.to_string(),
            "\"640x480\" 25.45 640 664 760 808 480 491 493 525 -hsync -vsync"
        );
    }

    #[test]
    fn test_lines_split_on_newline_and_nul() {
        let doc = b"one\ntwo\0three";
        let lines: Vec<_> = TimingLines::new(doc).map(|l| l.text.into_owned()).collect();
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_lines_numbered_from_one() {
        let doc = b"# header\n\nbody\n";
        let numbers: Vec<_> = TimingLines::new(doc).map(|l| l.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_lines_cut_at_line_size_max() {
        let mut doc = vec![b'7'; LINE_SIZE_MAX + 10];
        doc.push(b'\n');
        let lines: Vec<_> = TimingLines::new(&doc).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text.len(), LINE_SIZE_MAX - 1);
        assert_eq!(lines[1].text.len(), 10);
    }

    #[test]
    fn test_lines_cut_drops_last_byte() {
        let mut doc = vec![b'a'; LINE_SIZE_MAX - 1];
        doc.extend_from_slice(b"Xtail\n");
        let lines: Vec<_> = TimingLines::new(&doc).map(|l| l.text.into_owned()).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].bytes().all(|b| b == b'a'));
        assert_eq!(lines[1], "tail");

        // A terminator in the last slot ends the line normally
        let mut doc = vec![b'b'; LINE_SIZE_MAX - 1];
        doc.extend_from_slice(b"\nnext\n");
        let lines: Vec<_> = TimingLines::new(&doc).map(|l| l.text.into_owned()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), LINE_SIZE_MAX - 1);
        assert_eq!(lines[1], "next");
    }

    #[test]
    fn test_lines_ignore_bytes_past_read_size_max() {
        let mut doc = Vec::new();
        while doc.len() < READ_SIZE_MAX {
            doc.extend_from_slice(b"# padding comment\n");
        }
        doc.truncate(READ_SIZE_MAX);
        doc.extend_from_slice(LINE_240P.as_bytes());
        let found = TimingLines::new(&doc)
            .filter(RawLine::is_candidate)
            .any(|l| parse_timing_line(&l.text).is_ok());
        assert!(!found);
    }

    #[test]
    fn test_raw_line_classification() {
        let doc = format!("# comment\n   \nshort line\n{}\n", LINE_240P);
        let lines: Vec<_> = TimingLines::new(doc.as_bytes()).collect();
        assert!(lines[0].is_comment());
        assert!(lines[1].is_too_short());
        assert!(lines[2].is_too_short());
        assert!(lines[3].is_candidate());
    }

    #[test]
    fn test_read_missing_document_is_empty() {
        let path = Path::new("/nonexistent/dpidac/timings.txt");
        assert!(read_timings_document(path).is_empty());
        assert!(matches!(
            try_read_timings_document(path),
            Err(Error::Io(_))
        ));
    }
}
