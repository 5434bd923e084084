// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Mode descriptor grammars
//!
//! Two grammars name a mode without giving its full timing:
//!
//! - The convenience grammar ([`DesiredModeSpec`]) used for the preferred
//!   mode: `WIDTHxHEIGHT@REFRESH`, `WIDTHxHEIGHT`, or the CEA shorthand
//!   `480p60`, `576p50`, `720p60`, `1080p50`...
//! - The command-line grammar ([`ModeDescriptor`]) used for a forced mode, in
//!   the style of the kernel `video=` option:
//!   `WIDTHxHEIGHT[M][R][-BPP][@REFRESH][i][m][e|D|d]`.
//!
//! A forced mode may also be given as a complete 13-field timings line, see
//! [`ForcedMode`].

use std::fmt;
use std::str::FromStr;

use crate::timing::{parse_timing_line, VideoTiming, TIMING_FIELD_COUNT};
use crate::Error;

/// Refresh rates within this many Hz of each other are the same mode
pub const REFRESH_TOLERANCE_HZ: u32 = 1;

/// Whether two rounded refresh rates are within [`REFRESH_TOLERANCE_HZ`].
pub fn refresh_matches(a: u32, b: u32) -> bool {
    a.abs_diff(b) <= REFRESH_TOLERANCE_HZ
}

/// Resolution implied by a CEA shorthand height (`1080p60` -> 1920x1080).
pub fn cea_shorthand_size(height: u32) -> Option<(u32, u32)> {
    match height {
        480 => Some((720, 480)),
        576 => Some((720, 576)),
        720 => Some((1280, 720)),
        1080 => Some((1920, 1080)),
        _ => None,
    }
}

fn malformed(descriptor: &str, reason: &str) -> Error {
    Error::MalformedLine(format!("{} ({})", descriptor, reason))
}

fn parse_dimension(descriptor: &str, value: &str, what: &str) -> Result<u32, Error> {
    match value.parse::<u32>() {
        Ok(0) => Err(malformed(descriptor, &format!("{} must be positive", what))),
        Ok(v) => Ok(v),
        Err(_) => Err(malformed(descriptor, &format!("invalid {}", what))),
    }
}

/// A wanted resolution with an optional refresh constraint
///
/// # Example
///
/// ```
/// use dpidac::mode::DesiredModeSpec;
///
/// let spec: DesiredModeSpec = "1080p60".parse()?;
/// assert_eq!((spec.width, spec.height, spec.refresh), (1920, 1080, Some(60)));
///
/// let spec: DesiredModeSpec = "720x480".parse()?;
/// assert_eq!(spec.refresh, None);
/// # Ok::<(), dpidac::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DesiredModeSpec {
    pub width: u32,
    pub height: u32,
    /// `None` leaves the refresh rate unconstrained
    pub refresh: Option<u32>,
}

impl DesiredModeSpec {
    pub fn new(width: u32, height: u32, refresh: Option<u32>) -> Self {
        DesiredModeSpec {
            width,
            height,
            refresh,
        }
    }

    /// Parse the convenience grammar.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedLine`] for anything outside the grammar,
    /// including CEA shorthand heights other than 480, 576, 720 and 1080.
    pub fn parse(descriptor: &str) -> Result<Self, Error> {
        let s = descriptor.trim();

        if let Some((width, rest)) = s.split_once('x') {
            let width = parse_dimension(descriptor, width, "width")?;
            let (height, refresh) = match rest.split_once('@') {
                Some((height, refresh)) => (
                    height,
                    Some(parse_dimension(descriptor, refresh, "refresh")?),
                ),
                None => (rest, None),
            };
            let height = parse_dimension(descriptor, height, "height")?;
            return Ok(DesiredModeSpec::new(width, height, refresh));
        }

        if let Some((height, refresh)) = s.split_once('p') {
            let height = parse_dimension(descriptor, height, "height")?;
            let refresh = parse_dimension(descriptor, refresh, "refresh")?;
            let (width, height) = cea_shorthand_size(height)
                .ok_or_else(|| malformed(descriptor, "unsupported shorthand height"))?;
            return Ok(DesiredModeSpec::new(width, height, Some(refresh)));
        }

        Err(malformed(
            descriptor,
            "expected WIDTHxHEIGHT[@REFRESH] or HEIGHTpREFRESH",
        ))
    }

    /// Whether a timing satisfies this spec: same active size, and refresh
    /// within [`REFRESH_TOLERANCE_HZ`] when constrained.
    pub fn matches(&self, timing: &VideoTiming) -> bool {
        timing.h_active == self.width
            && timing.v_active == self.height
            && self
                .refresh
                .map_or(true, |refresh| refresh_matches(refresh, timing.refresh_rounded()))
    }
}

impl FromStr for DesiredModeSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DesiredModeSpec::parse(s)
    }
}

impl fmt::Display for DesiredModeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.refresh {
            Some(refresh) => write!(f, "{}x{}@{}", self.width, self.height, refresh),
            None => write!(f, "{}x{}", self.width, self.height),
        }
    }
}

/// Connector state override carried by a command-line descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForceFlag {
    /// `e`: force the output on
    Enable,
    /// `D`: force on with a digital signal
    EnableDigital,
    /// `d`: force the output off
    Disable,
}

/// Command-line mode descriptor
///
/// Mirrors the kernel `video=` mode grammar. The bridge only drives analog
/// outputs, so `bpp`, `margins` and `force` are recorded for reporting and
/// otherwise ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModeDescriptor {
    pub width: u32,
    pub height: u32,
    pub refresh: Option<u32>,
    pub interlaced: bool,
    /// `M`: compute the timing with CVT
    pub cvt: bool,
    /// `R`: CVT with reduced blanking
    pub reduced_blanking: bool,
    pub bpp: Option<u32>,
    pub margins: bool,
    pub force: Option<ForceFlag>,
}

impl ModeDescriptor {
    /// Parse the command-line grammar, falling back to the convenience
    /// grammar for CEA shorthand.
    ///
    /// # Example
    ///
    /// ```
    /// use dpidac::mode::ModeDescriptor;
    ///
    /// let mode: ModeDescriptor = "1366x768MR-24@60".parse()?;
    /// assert_eq!((mode.width, mode.height, mode.refresh), (1366, 768, Some(60)));
    /// assert!(mode.cvt && mode.reduced_blanking);
    /// assert_eq!(mode.bpp, Some(24));
    ///
    /// let mode: ModeDescriptor = "640x480@60i".parse()?;
    /// assert!(mode.interlaced);
    /// # Ok::<(), dpidac::Error>(())
    /// ```
    pub fn parse(descriptor: &str) -> Result<Self, Error> {
        let s = descriptor.trim();
        if !s.contains('x') {
            return DesiredModeSpec::parse(s).map(ModeDescriptor::from);
        }

        let mut cursor = Cursor::new(s);
        let width = cursor
            .number()
            .ok_or_else(|| malformed(descriptor, "invalid width"))?;
        if !cursor.eat('x') {
            return Err(malformed(descriptor, "expected 'x' after width"));
        }
        let height = cursor
            .number()
            .ok_or_else(|| malformed(descriptor, "invalid height"))?;
        if width == 0 || height == 0 {
            return Err(malformed(descriptor, "dimensions must be positive"));
        }

        let mut mode = ModeDescriptor {
            width,
            height,
            ..Default::default()
        };

        loop {
            if cursor.eat('M') {
                mode.cvt = true;
            } else if cursor.eat('R') {
                mode.reduced_blanking = true;
            } else {
                break;
            }
        }

        if cursor.eat('-') {
            mode.bpp = Some(
                cursor
                    .number()
                    .ok_or_else(|| malformed(descriptor, "invalid bpp"))?,
            );
        }

        if cursor.eat('@') {
            match cursor.number() {
                Some(0) | None => return Err(malformed(descriptor, "invalid refresh")),
                refresh => mode.refresh = refresh,
            }
        }

        while let Some(c) = cursor.bump() {
            match c {
                'i' if !mode.interlaced => mode.interlaced = true,
                'm' if !mode.margins => mode.margins = true,
                'e' if mode.force.is_none() => mode.force = Some(ForceFlag::Enable),
                'D' if mode.force.is_none() => mode.force = Some(ForceFlag::EnableDigital),
                'd' if mode.force.is_none() => mode.force = Some(ForceFlag::Disable),
                _ => {
                    return Err(malformed(
                        descriptor,
                        &format!("unexpected '{}' in mode flags", c),
                    ))
                }
            }
        }

        Ok(mode)
    }

    /// The resolution/refresh part of the descriptor
    pub fn spec(&self) -> DesiredModeSpec {
        DesiredModeSpec::new(self.width, self.height, self.refresh)
    }
}

impl From<DesiredModeSpec> for ModeDescriptor {
    fn from(spec: DesiredModeSpec) -> Self {
        ModeDescriptor {
            width: spec.width,
            height: spec.height,
            refresh: spec.refresh,
            ..Default::default()
        }
    }
}

impl FromStr for ModeDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModeDescriptor::parse(s)
    }
}

impl fmt::Display for ModeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)?;
        if self.cvt {
            f.write_str("M")?;
        }
        if self.reduced_blanking {
            f.write_str("R")?;
        }
        if let Some(bpp) = self.bpp {
            write!(f, "-{}", bpp)?;
        }
        if let Some(refresh) = self.refresh {
            write!(f, "@{}", refresh)?;
        }
        if self.interlaced {
            f.write_str("i")?;
        }
        if self.margins {
            f.write_str("m")?;
        }
        match self.force {
            Some(ForceFlag::Enable) => f.write_str("e"),
            Some(ForceFlag::EnableDigital) => f.write_str("D"),
            Some(ForceFlag::Disable) => f.write_str("d"),
            None => Ok(()),
        }
    }
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Cursor { rest: s }
    }

    fn eat(&mut self, c: char) -> bool {
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn number(&mut self) -> Option<u32> {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        let (digits, rest) = self.rest.split_at(end);
        let value = digits.parse().ok()?;
        self.rest = rest;
        Some(value)
    }

    fn bump(&mut self) -> Option<char> {
        let mut chars = self.rest.chars();
        let c = chars.next()?;
        self.rest = chars.as_str();
        Some(c)
    }
}

/// A forced-mode string in any of the accepted forms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedMode {
    /// A complete 13-field timings line
    Timing(VideoTiming),
    /// A mode named by resolution, resolved against known timings or CVT
    Descriptor(ModeDescriptor),
}

impl ForcedMode {
    /// Parse a forced-mode string. Strings with at least as many tokens as a
    /// timings line are parsed as one; anything else uses the command-line
    /// grammar.
    pub fn parse(descriptor: &str) -> Result<Self, Error> {
        if descriptor.split_whitespace().count() >= TIMING_FIELD_COUNT {
            parse_timing_line(descriptor).map(ForcedMode::Timing)
        } else {
            ModeDescriptor::parse(descriptor).map(ForcedMode::Descriptor)
        }
    }
}

impl FromStr for ForcedMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ForcedMode::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::SyncPolarity;

    fn timing(width: u32, height: u32, clock: u64) -> VideoTiming {
        // 1000 x 1000 totals so the refresh is clock / 1e6
        VideoTiming {
            pixel_clock_hz: clock,
            h_active: width,
            h_front_porch: 10,
            h_sync_len: 10,
            h_back_porch: 1000 - width - 20,
            v_active: height,
            v_front_porch: 10,
            v_sync_len: 10,
            v_back_porch: 1000 - height - 20,
            interlaced: false,
            h_sync_polarity: SyncPolarity::High,
            v_sync_polarity: SyncPolarity::High,
        }
    }

    #[test]
    fn test_desired_cea_shorthand() {
        let spec = DesiredModeSpec::parse("1080p60").unwrap();
        assert_eq!((spec.width, spec.height, spec.refresh), (1920, 1080, Some(60)));

        let spec = DesiredModeSpec::parse("576p50").unwrap();
        assert_eq!((spec.width, spec.height, spec.refresh), (720, 576, Some(50)));

        let spec = DesiredModeSpec::parse("480p60").unwrap();
        assert_eq!((spec.width, spec.height), (720, 480));
    }

    #[test]
    fn test_desired_width_height() {
        let spec = DesiredModeSpec::parse("720x480").unwrap();
        assert_eq!((spec.width, spec.height, spec.refresh), (720, 480, None));

        let spec = DesiredModeSpec::parse("1920x1080@50").unwrap();
        assert_eq!((spec.width, spec.height, spec.refresh), (1920, 1080, Some(50)));
    }

    #[test]
    fn test_desired_rejects_unsupported_shorthand() {
        assert!(matches!(
            DesiredModeSpec::parse("2160p60"),
            Err(Error::MalformedLine(_))
        ));
    }

    #[test]
    fn test_desired_rejects_garbage() {
        for bad in ["", "auto", "1920x", "x1080", "1920x1080@", "0x480", "1080p", "1920x1080@0"] {
            assert!(DesiredModeSpec::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_desired_display_roundtrip() {
        assert_eq!(DesiredModeSpec::parse("720p50").unwrap().to_string(), "1280x720@50");
        assert_eq!(DesiredModeSpec::parse("800x600").unwrap().to_string(), "800x600");
    }

    #[test]
    fn test_desired_matches_with_tolerance() {
        let spec = DesiredModeSpec::new(640, 480, Some(60));
        assert!(spec.matches(&timing(640, 480, 60_000_000)));
        assert!(spec.matches(&timing(640, 480, 59_000_000)));
        assert!(spec.matches(&timing(640, 480, 61_000_000)));
        assert!(!spec.matches(&timing(640, 480, 62_000_000)));
        assert!(!spec.matches(&timing(640, 400, 60_000_000)));
    }

    #[test]
    fn test_desired_unconstrained_refresh_matches_any() {
        let spec = DesiredModeSpec::new(640, 480, None);
        assert!(spec.matches(&timing(640, 480, 75_000_000)));
        assert!(spec.matches(&timing(640, 480, 24_000_000)));
    }

    #[test]
    fn test_descriptor_flags() {
        let mode = ModeDescriptor::parse("1024x768R@75me").unwrap();
        assert!(mode.reduced_blanking);
        assert!(!mode.cvt);
        assert_eq!(mode.refresh, Some(75));
        assert!(mode.margins);
        assert_eq!(mode.force, Some(ForceFlag::Enable));
        assert_eq!(mode.to_string(), "1024x768R@75me");
    }

    #[test]
    fn test_descriptor_plain_and_shorthand() {
        let mode = ModeDescriptor::parse("800x600").unwrap();
        assert_eq!(mode.spec(), DesiredModeSpec::new(800, 600, None));

        let mode = ModeDescriptor::parse("720p50").unwrap();
        assert_eq!(mode.spec(), DesiredModeSpec::new(1280, 720, Some(50)));
    }

    #[test]
    fn test_descriptor_rejects_bad_flags() {
        assert!(ModeDescriptor::parse("800x600@60q").is_err());
        assert!(ModeDescriptor::parse("800x600@60ii").is_err());
        assert!(ModeDescriptor::parse("800x600-").is_err());
        assert!(ModeDescriptor::parse("800y600").is_err());
    }

    #[test]
    fn test_forced_mode_forms() {
        let forced = ForcedMode::parse("320 1 4 30 46 240 1 4 5 14 0 0 0 60 0 6400000 1").unwrap();
        assert!(matches!(forced, ForcedMode::Timing(t) if t.h_active == 320));

        let forced = ForcedMode::parse("1280x720@50").unwrap();
        assert!(matches!(forced, ForcedMode::Descriptor(d) if d.refresh == Some(50)));

        assert!(ForcedMode::parse("320 1 4 30 46 240 1 4 5 14 0 0 0 60 0 x 1").is_err());
    }
}
