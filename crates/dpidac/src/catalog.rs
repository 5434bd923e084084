// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Mode catalog assembly and preferred-mode selection
//!
//! A [`ModeCatalog`] is built once per resolution pass from prioritized
//! sources:
//!
//! | Priority | Source | Used when |
//! |----------|--------|-----------|
//! | 1 | Forced mode string | set and resolvable; replaces everything else |
//! | 2 | Timings document | always, line by line |
//! | 3 | [`BUILTIN_DEFAULTS`] | the document yields no mode |
//! | 4 | [`CEA_BASELINE`] | always, unless already present |
//!
//! Entries are kept in insertion order. A later entry with the same active
//! size, scan type and a refresh rate within
//! [`REFRESH_TOLERANCE_HZ`](crate::mode::REFRESH_TOLERANCE_HZ) of an earlier
//! one is dropped. After assembly only the preferred/native flags change,
//! through [`select_preferred`].

use std::fmt;

use crate::cvt::cvt_timing;
use crate::mode::{refresh_matches, DesiredModeSpec, ForcedMode, ModeDescriptor};
use crate::timing::{parse_timing_line, RawLine, SyncPolarity, TimingLines, VideoTiming};
use crate::Error;

/// Refresh rate assumed when a forced mode leaves it unconstrained
pub const DEFAULT_REFRESH_HZ: u32 = 60;

/// Where a catalog entry came from, in descending priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Origin {
    /// Forced mode string
    Forced,
    /// Timings document
    CustomFile,
    /// Built-in fallback modes
    BuiltinDefault,
    /// Required CEA baseline modes
    SynthesizedBaseline,
}

impl Origin {
    pub fn name(&self) -> &'static str {
        match self {
            Origin::Forced => "forced",
            Origin::CustomFile => "custom-file",
            Origin::BuiltinDefault => "built-in-default",
            Origin::SynthesizedBaseline => "synthesized-baseline",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A CEA-861 reference mode with its Video Identification Code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CeaMode {
    pub label: &'static str,
    pub vic: u8,
    pub timing: VideoTiming,
}

const fn cea_timing(
    pixel_clock_hz: u64,
    h: [u32; 4],
    v: [u32; 4],
    polarity: SyncPolarity,
) -> VideoTiming {
    VideoTiming {
        pixel_clock_hz,
        h_active: h[0],
        h_front_porch: h[1],
        h_sync_len: h[2],
        h_back_porch: h[3],
        v_active: v[0],
        v_front_porch: v[1],
        v_sync_len: v[2],
        v_back_porch: v[3],
        interlaced: false,
        h_sync_polarity: polarity,
        v_sync_polarity: polarity,
    }
}

/// CEA modes always present in the catalog, in EDID Video Data Block order
pub const CEA_BASELINE: [CeaMode; 4] = [
    CeaMode {
        label: "1080p60",
        vic: 16,
        timing: cea_timing(148_500_000, [1920, 88, 44, 148], [1080, 4, 5, 36], SyncPolarity::High),
    },
    CeaMode {
        label: "1080p50",
        vic: 31,
        timing: cea_timing(148_500_000, [1920, 528, 44, 148], [1080, 4, 5, 36], SyncPolarity::High),
    },
    CeaMode {
        label: "720p60",
        vic: 4,
        timing: cea_timing(74_250_000, [1280, 110, 40, 220], [720, 5, 5, 20], SyncPolarity::High),
    },
    CeaMode {
        label: "720p50",
        vic: 19,
        timing: cea_timing(74_250_000, [1280, 440, 40, 220], [720, 5, 5, 20], SyncPolarity::High),
    },
];

// Standard-definition CEA modes, only used to resolve forced `480p60`/`576p50`.
const CEA_STANDARD_DEFINITION: [CeaMode; 2] = [
    CeaMode {
        label: "480p60",
        vic: 2,
        timing: cea_timing(27_000_000, [720, 16, 62, 60], [480, 9, 6, 30], SyncPolarity::Low),
    },
    CeaMode {
        label: "576p50",
        vic: 17,
        timing: cea_timing(27_000_000, [720, 12, 64, 68], [576, 5, 5, 39], SyncPolarity::Low),
    },
];

/// Fallback modes used when the timings document yields nothing: 240p for
/// low-resolution CRTs, 1920x240 super-resolution, and 480i/480p.
pub const BUILTIN_DEFAULTS: [VideoTiming; 4] = [
    VideoTiming {
        pixel_clock_hz: 6_400_000,
        h_active: 320,
        h_front_porch: 4,
        h_sync_len: 30,
        h_back_porch: 46,
        v_active: 240,
        v_front_porch: 4,
        v_sync_len: 5,
        v_back_porch: 14,
        interlaced: false,
        h_sync_polarity: SyncPolarity::Low,
        v_sync_polarity: SyncPolarity::Low,
    },
    VideoTiming {
        pixel_clock_hz: 38_937_600,
        h_active: 1920,
        h_front_porch: 80,
        h_sync_len: 184,
        h_back_porch: 312,
        v_active: 240,
        v_front_porch: 1,
        v_sync_len: 3,
        v_back_porch: 16,
        interlaced: false,
        h_sync_polarity: SyncPolarity::Low,
        v_sync_polarity: SyncPolarity::Low,
    },
    VideoTiming {
        pixel_clock_hz: 13_054_080,
        h_active: 640,
        h_front_porch: 24,
        h_sync_len: 64,
        h_back_porch: 104,
        v_active: 480,
        v_front_porch: 3,
        v_sync_len: 6,
        v_back_porch: 34,
        interlaced: true,
        h_sync_polarity: SyncPolarity::Low,
        v_sync_polarity: SyncPolarity::Low,
    },
    VideoTiming {
        pixel_clock_hz: 25_452_000,
        h_active: 640,
        h_front_porch: 24,
        h_sync_len: 96,
        h_back_porch: 48,
        v_active: 480,
        v_front_porch: 11,
        v_sync_len: 2,
        v_back_porch: 32,
        interlaced: false,
        h_sync_polarity: SyncPolarity::Low,
        v_sync_polarity: SyncPolarity::Low,
    },
];

/// Whether two timings describe the same mode for deduplication purposes.
fn same_mode(a: &VideoTiming, b: &VideoTiming) -> bool {
    a.h_active == b.h_active
        && a.v_active == b.v_active
        && a.interlaced == b.interlaced
        && refresh_matches(a.refresh_rounded(), b.refresh_rounded())
}

/// The CEA baseline label (`"1080p60"`, ...) of a timing, if it is one.
pub fn cea_label(timing: &VideoTiming) -> Option<&'static str> {
    CEA_BASELINE
        .iter()
        .find(|cea| same_mode(&cea.timing, timing))
        .map(|cea| cea.label)
}

/// Look up a known timing (built-in defaults or CEA reference modes).
///
/// An unconstrained refresh takes the first known mode of that size.
pub fn known_timing(spec: &DesiredModeSpec, interlaced: bool) -> Option<VideoTiming> {
    BUILTIN_DEFAULTS
        .iter()
        .chain(CEA_BASELINE.iter().map(|cea| &cea.timing))
        .chain(CEA_STANDARD_DEFINITION.iter().map(|cea| &cea.timing))
        .find(|t| t.interlaced == interlaced && spec.matches(t))
        .copied()
}

/// Resolve a forced-mode string to a concrete timing.
///
/// Timings lines are taken as-is. Named modes use a known timing unless CVT
/// was requested explicitly (`M`/`R`) or none exists, in which case the
/// timing is generated with CVT at the given refresh, or
/// [`DEFAULT_REFRESH_HZ`].
pub fn resolve_forced_mode(descriptor: &str) -> Result<VideoTiming, Error> {
    match ForcedMode::parse(descriptor)? {
        ForcedMode::Timing(timing) => Ok(timing),
        ForcedMode::Descriptor(mode) => resolve_descriptor(&mode),
    }
}

fn resolve_descriptor(mode: &ModeDescriptor) -> Result<VideoTiming, Error> {
    if !mode.cvt && !mode.reduced_blanking {
        if let Some(timing) = known_timing(&mode.spec(), mode.interlaced) {
            return Ok(timing);
        }
    }
    cvt_timing(
        mode.width,
        mode.height,
        mode.refresh.unwrap_or(DEFAULT_REFRESH_HZ),
        mode.reduced_blanking,
        mode.interlaced,
    )
}

/// A catalog entry: a timing plus provenance and selection flags
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMode {
    timing: VideoTiming,
    origin: Origin,
    is_preferred: bool,
    is_native: bool,
    display_name: String,
}

impl CandidateMode {
    pub fn new(timing: VideoTiming, origin: Origin) -> Self {
        let display_name = format!("{}@{}", timing.name(), timing.refresh_rounded());
        CandidateMode {
            timing,
            origin,
            is_preferred: false,
            is_native: false,
            display_name,
        }
    }

    pub fn timing(&self) -> &VideoTiming {
        &self.timing
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_preferred(&self) -> bool {
        self.is_preferred
    }

    /// Whether the EDID advertises this mode as the native one
    pub fn is_native(&self) -> bool {
        self.is_native
    }

    /// Name such as `"1920x1080@60"` or `"640x480i@60"`
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The CEA baseline label of this mode, if it is one
    pub fn cea_label(&self) -> Option<&'static str> {
        cea_label(&self.timing)
    }
}

impl fmt::Display for CandidateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.timing, self.origin)?;
        if self.is_preferred {
            f.write_str(" preferred")?;
        }
        Ok(())
    }
}

/// A source entry that was skipped while building the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub origin: Origin,
    /// Line number within the timings document, when applicable
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} line {}: {}", self.origin, line, self.message),
            None => write!(f, "{}: {}", self.origin, self.message),
        }
    }
}

/// Ordered, deduplicated list of candidate modes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModeCatalog {
    modes: Vec<CandidateMode>,
    diagnostics: Vec<Diagnostic>,
}

impl ModeCatalog {
    pub fn modes(&self) -> &[CandidateMode] {
        &self.modes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CandidateMode> {
        self.modes.iter()
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// The preferred entry, if one has been selected
    pub fn preferred(&self) -> Option<&CandidateMode> {
        self.modes.iter().find(|m| m.is_preferred)
    }

    /// Source entries skipped during assembly
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Number of entries from the given origin
    pub fn count_origin(&self, origin: Origin) -> usize {
        self.modes.iter().filter(|m| m.origin == origin).count()
    }

    fn contains(&self, timing: &VideoTiming) -> bool {
        self.modes.iter().any(|m| same_mode(&m.timing, timing))
    }

    /// Append a timing unless an equivalent entry already exists.
    fn insert(&mut self, timing: VideoTiming, origin: Origin) -> bool {
        if let Some(existing) = self.modes.iter().find(|m| same_mode(&m.timing, &timing)) {
            log::debug!(
                "dropping {} {}@{}: duplicate of {} from {}",
                origin,
                timing.name(),
                timing.refresh_rounded(),
                existing.display_name,
                existing.origin
            );
            return false;
        }
        let mode = CandidateMode::new(timing, origin);
        log::debug!("\t{}", mode);
        self.modes.push(mode);
        true
    }

    fn report(&mut self, origin: Origin, line: Option<usize>, error: &Error) {
        let diagnostic = Diagnostic {
            origin,
            line,
            message: error.to_string(),
        };
        log::warn!("{}, skipping", diagnostic);
        self.diagnostics.push(diagnostic);
    }
}

impl<'a> IntoIterator for &'a ModeCatalog {
    type Item = &'a CandidateMode;
    type IntoIter = std::slice::Iter<'a, CandidateMode>;

    fn into_iter(self) -> Self::IntoIter {
        self.modes.iter()
    }
}

/// Mode sources in descending priority
///
/// Empty strings and empty documents are the same as unset sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedSources {
    pub forced_mode: Option<String>,
    pub timings_document: Option<Vec<u8>>,
}

impl OrderedSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_forced_mode(mut self, descriptor: impl Into<String>) -> Self {
        self.forced_mode = Some(descriptor.into());
        self
    }

    pub fn with_timings_document(mut self, document: impl Into<Vec<u8>>) -> Self {
        self.timings_document = Some(document.into());
        self
    }
}

/// Parse every candidate line of a timings document into the catalog and
/// return how many lines produced a mode.
fn load_timings_document(catalog: &mut ModeCatalog, document: &[u8]) -> usize {
    let mut loaded = 0;
    for line in TimingLines::new(document).filter(RawLine::is_candidate) {
        match parse_timing_line(&line.text) {
            Ok(timing) => {
                catalog.insert(timing, Origin::CustomFile);
                loaded += 1;
            }
            Err(e) => catalog.report(Origin::CustomFile, Some(line.number), &e),
        }
    }
    loaded
}

/// Assemble the catalog from prioritized sources.
///
/// Never fails: unparseable descriptors are logged, recorded in
/// [`ModeCatalog::diagnostics`] and skipped. No entry is flagged preferred
/// except the forced mode; call [`select_preferred`] afterwards.
///
/// # Example
///
/// ```
/// use dpidac::catalog::{build_catalog, Origin, OrderedSources};
///
/// let catalog = build_catalog(&OrderedSources::new());
/// assert_eq!(catalog.len(), 8);
/// assert_eq!(catalog.count_origin(Origin::BuiltinDefault), 4);
///
/// let forced = build_catalog(&OrderedSources::new().with_forced_mode("720p50"));
/// assert_eq!(forced.len(), 1);
/// assert!(forced.modes()[0].is_preferred());
/// ```
pub fn build_catalog(sources: &OrderedSources) -> ModeCatalog {
    let mut catalog = ModeCatalog::default();

    if let Some(forced) = sources
        .forced_mode
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        match resolve_forced_mode(forced) {
            Ok(timing) => {
                catalog.insert(timing, Origin::Forced);
                let mode = &mut catalog.modes[0];
                mode.is_preferred = true;
                mode.is_native = true;
                log::info!("forced mode {} ({})", mode.display_name, forced);
                return catalog;
            }
            Err(e) => catalog.report(Origin::Forced, None, &e),
        }
    }

    let custom = match sources.timings_document.as_deref() {
        Some(document) if !document.is_empty() => {
            log::info!("loading timings from document...");
            let loaded = load_timings_document(&mut catalog, document);
            log::info!("{} custom modes loaded", loaded);
            loaded
        }
        _ => 0,
    };

    if custom == 0 {
        log::info!("loading built-in default modes...");
        let loaded = BUILTIN_DEFAULTS
            .iter()
            .filter(|&&timing| catalog.insert(timing, Origin::BuiltinDefault))
            .count();
        log::info!("{} default modes loaded", loaded);
    }

    for cea in CEA_BASELINE.iter() {
        if !catalog.contains(&cea.timing) {
            catalog.insert(cea.timing, Origin::SynthesizedBaseline);
        }
    }

    catalog
}

/// Flag exactly one catalog entry as preferred (and native).
///
/// The last entry matching `want` wins. Without a spec, or when nothing
/// matches, the first entry is used. An empty catalog stays without a
/// preferred mode.
pub fn select_preferred(catalog: &mut ModeCatalog, want: Option<&DesiredModeSpec>) {
    let matched = want.and_then(|spec| catalog.modes.iter().rposition(|m| spec.matches(&m.timing)));
    let chosen = match (matched, want) {
        (Some(index), _) => Some(index),
        (None, Some(spec)) if !catalog.is_empty() => {
            log::info!("preferred mode {} not in catalog, using first mode", spec);
            Some(0)
        }
        (None, _) if !catalog.is_empty() => Some(0),
        (None, _) => None,
    };

    for (index, mode) in catalog.modes.iter_mut().enumerate() {
        let selected = Some(index) == chosen;
        mode.is_preferred = selected;
        mode.is_native = selected;
    }

    match catalog.preferred() {
        Some(mode) => log::info!("preferred mode {}", mode.display_name),
        None => log::info!("no modes to expose"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE_800X600: &str = "800 0 40 128 88 600 0 1 4 23 0 0 0 60 0 40000000 1";

    fn names(catalog: &ModeCatalog) -> Vec<&str> {
        catalog.iter().map(|m| m.display_name()).collect()
    }

    fn preferred_count(catalog: &ModeCatalog) -> usize {
        catalog.iter().filter(|m| m.is_preferred()).count()
    }

    #[test]
    fn test_builtin_names() {
        let names: Vec<String> = BUILTIN_DEFAULTS
            .iter()
            .map(|t| format!("{}@{}", t.name(), t.refresh_rounded()))
            .collect();
        assert_eq!(
            names,
            vec!["320x240@61", "1920x240@60", "640x480i@60", "640x480@60"]
        );
    }

    #[test]
    fn test_cea_baseline_refresh() {
        let rates: Vec<u32> = CEA_BASELINE.iter().map(|c| c.timing.refresh_rounded()).collect();
        assert_eq!(rates, vec![60, 50, 60, 50]);
        for cea in CEA_STANDARD_DEFINITION.iter() {
            assert!(cea.timing.validate().is_ok());
        }
    }

    #[test]
    fn test_empty_sources_use_defaults_and_baseline() {
        let catalog = build_catalog(&OrderedSources::new());
        assert_eq!(
            names(&catalog),
            vec![
                "320x240@61",
                "1920x240@60",
                "640x480i@60",
                "640x480@60",
                "1920x1080@60",
                "1920x1080@50",
                "1280x720@60",
                "1280x720@50"
            ]
        );
        assert_eq!(preferred_count(&catalog), 0);
        assert!(catalog.diagnostics().is_empty());
    }

    #[test]
    fn test_document_replaces_defaults() {
        let doc = format!("# custom modes\n{}\n", LINE_800X600);
        let catalog = build_catalog(&OrderedSources::new().with_timings_document(doc));
        assert_eq!(catalog.count_origin(Origin::CustomFile), 1);
        assert_eq!(catalog.count_origin(Origin::BuiltinDefault), 0);
        assert_eq!(catalog.count_origin(Origin::SynthesizedBaseline), 4);
        assert_eq!(catalog.modes()[0].display_name(), "800x600@60");
    }

    #[test]
    fn test_bad_lines_skipped_not_fatal() {
        let doc = format!(
            "this line is long enough but not numeric at all\n{}\n1 2 3 4 5 6 7 8 9 10 11 12 13 14\n",
            LINE_800X600
        );
        let catalog = build_catalog(&OrderedSources::new().with_timings_document(doc));
        assert_eq!(catalog.count_origin(Origin::CustomFile), 1);
        let lines: Vec<_> = catalog.diagnostics().iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![Some(1), Some(3)]);
    }

    #[test]
    fn test_out_of_range_line_skipped() {
        let doc = format!(
            "4294967295 1 4 30 46 240 1 4 5 14 0 0 0 60 0 6400000 1\n{}\n",
            LINE_800X600
        );
        let catalog = build_catalog(&OrderedSources::new().with_timings_document(doc));
        assert_eq!(catalog.count_origin(Origin::CustomFile), 1);
        assert_eq!(catalog.count_origin(Origin::BuiltinDefault), 0);
        let lines: Vec<_> = catalog.diagnostics().iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![Some(1)]);
        assert_eq!(catalog.modes()[0].display_name(), "800x600@60");
    }

    #[test]
    fn test_all_bad_lines_fall_back_to_defaults() {
        let doc = "this line is long enough but not numeric at all\n";
        let catalog = build_catalog(&OrderedSources::new().with_timings_document(doc));
        assert_eq!(catalog.count_origin(Origin::BuiltinDefault), 4);
        assert_eq!(catalog.diagnostics().len(), 1);
    }

    #[test]
    fn test_document_duplicate_of_baseline_keeps_document_entry() {
        // 1280x720 at 59.94 Hz collides with CEA 720p60
        let doc = "1280 0 110 40 220 720 0 5 5 20 0 0 0 60 0 74175824 1\n";
        let catalog = build_catalog(&OrderedSources::new().with_timings_document(doc));
        let hd: Vec<_> = catalog
            .iter()
            .filter(|m| m.timing().h_active == 1280 && m.timing().refresh_rounded() == 60)
            .collect();
        assert_eq!(hd.len(), 1);
        assert_eq!(hd[0].origin(), Origin::CustomFile);
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn test_document_internal_duplicates_dropped() {
        let doc = format!("{}\n{}\n", LINE_800X600, LINE_800X600.replace("40000000", "40500000"));
        let catalog = build_catalog(&OrderedSources::new().with_timings_document(doc));
        assert_eq!(catalog.count_origin(Origin::CustomFile), 1);
        assert_eq!(catalog.modes()[0].timing().pixel_clock_hz, 40_000_000);
    }

    #[test]
    fn test_interlaced_not_duplicate_of_progressive() {
        let p = BUILTIN_DEFAULTS[3];
        let i = BUILTIN_DEFAULTS[2];
        assert!(!same_mode(&p, &i));
    }

    #[test]
    fn test_forced_short_circuits() {
        let sources = OrderedSources::new()
            .with_forced_mode("1280x720@50")
            .with_timings_document(LINE_800X600);
        let catalog = build_catalog(&sources);
        assert_eq!(catalog.len(), 1);
        let mode = &catalog.modes()[0];
        assert_eq!(mode.origin(), Origin::Forced);
        assert_eq!(mode.timing(), &CEA_BASELINE[3].timing);
        assert!(mode.is_preferred() && mode.is_native());
    }

    #[test]
    fn test_forced_timing_line() {
        let catalog = build_catalog(&OrderedSources::new().with_forced_mode(LINE_800X600));
        assert_eq!(names(&catalog), vec!["800x600@60"]);
    }

    #[test]
    fn test_forced_unknown_mode_uses_cvt() {
        let catalog = build_catalog(&OrderedSources::new().with_forced_mode("1024x768"));
        assert_eq!(names(&catalog), vec!["1024x768@60"]);
        assert_eq!(catalog.modes()[0].timing().pixel_clock_hz, 63_500_000);
    }

    #[test]
    fn test_forced_failure_falls_through() {
        for forced in ["2160p60", "4000000000x3000000000", "640x480@100000"] {
            let catalog = build_catalog(&OrderedSources::new().with_forced_mode(forced));
            assert_eq!(catalog.len(), 8, "forced {}", forced);
            assert_eq!(catalog.diagnostics().len(), 1, "forced {}", forced);
            assert_eq!(catalog.diagnostics()[0].origin, Origin::Forced);
            assert_eq!(catalog.diagnostics()[0].line, None);
        }
    }

    #[test]
    fn test_forced_blank_is_unset() {
        let catalog = build_catalog(&OrderedSources::new().with_forced_mode("   "));
        assert_eq!(catalog.len(), 8);
        assert!(catalog.diagnostics().is_empty());
    }

    #[test]
    fn test_resolve_forced_known_modes() {
        assert_eq!(resolve_forced_mode("1080p50").unwrap(), CEA_BASELINE[1].timing);
        assert_eq!(resolve_forced_mode("1920x1080").unwrap(), CEA_BASELINE[0].timing);
        assert_eq!(resolve_forced_mode("640x480i").unwrap(), BUILTIN_DEFAULTS[2]);
        assert_eq!(resolve_forced_mode("640x480").unwrap(), BUILTIN_DEFAULTS[3]);
        assert_eq!(resolve_forced_mode("480p60").unwrap().pixel_clock_hz, 27_000_000);
    }

    #[test]
    fn test_resolve_forced_explicit_cvt() {
        let t = resolve_forced_mode("1920x1080M@60").unwrap();
        assert_ne!(t, CEA_BASELINE[0].timing);
        assert_eq!(t.h_sync_polarity, SyncPolarity::Low);
    }

    #[test]
    fn test_select_last_match_wins() {
        let doc = format!(
            "{}\n{}\n",
            LINE_800X600,
            "800 0 40 128 88 600 0 1 4 23 0 0 0 60 0 48000000 1"
        );
        let mut catalog = build_catalog(&OrderedSources::new().with_timings_document(doc));
        select_preferred(&mut catalog, Some(&DesiredModeSpec::new(800, 600, None)));
        assert_eq!(preferred_count(&catalog), 1);
        assert_eq!(catalog.preferred().unwrap().display_name(), "800x600@72");
    }

    #[test]
    fn test_select_fallback_to_first() {
        let mut catalog = build_catalog(&OrderedSources::new());
        select_preferred(&mut catalog, Some(&DesiredModeSpec::new(1024, 768, Some(60))));
        assert_eq!(catalog.preferred().unwrap().display_name(), "320x240@61");

        select_preferred(&mut catalog, None);
        assert_eq!(preferred_count(&catalog), 1);
        assert!(catalog.modes()[0].is_preferred());
    }

    #[test]
    fn test_select_clears_previous() {
        let mut catalog = build_catalog(&OrderedSources::new());
        select_preferred(&mut catalog, DesiredModeSpec::parse("1080p50").ok().as_ref());
        select_preferred(&mut catalog, DesiredModeSpec::parse("720p60").ok().as_ref());
        assert_eq!(preferred_count(&catalog), 1);
        let preferred = catalog.preferred().unwrap();
        assert_eq!(preferred.cea_label(), Some("720p60"));
        assert!(preferred.is_native());
        assert_eq!(catalog.iter().filter(|m| m.is_native()).count(), 1);
    }

    #[test]
    fn test_select_empty_catalog() {
        let mut catalog = ModeCatalog::default();
        select_preferred(&mut catalog, None);
        assert!(catalog.preferred().is_none());
    }

    #[test]
    fn test_cea_label() {
        assert_eq!(cea_label(&CEA_BASELINE[2].timing), Some("720p60"));
        assert_eq!(cea_label(&BUILTIN_DEFAULTS[0]), None);
    }
}
