// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! End-to-end mode resolution: sources in, catalog plus EDID out.

use dpidac::bridge::{Bridge, BridgeConfig};
use dpidac::catalog::{build_catalog, select_preferred, Origin, OrderedSources};
use dpidac::edid::{synthesize_edid, DisplayIdentity};
use dpidac::mode::DesiredModeSpec;
use serial_test::serial;
use std::fs;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn names(sources: &OrderedSources, want: Option<&str>) -> Vec<String> {
    let mut catalog = build_catalog(sources);
    let spec = want.and_then(|w| DesiredModeSpec::parse(w).ok());
    select_preferred(&mut catalog, spec.as_ref());
    catalog
        .iter()
        .map(|mode| mode.display_name().to_string())
        .collect()
}

#[test]
fn test_no_sources_default_pipeline() {
    init_logging();
    let mut catalog = build_catalog(&OrderedSources::new());
    select_preferred(&mut catalog, DesiredModeSpec::parse("720p60").ok().as_ref());

    assert_eq!(catalog.len(), 8);
    assert_eq!(catalog.count_origin(Origin::BuiltinDefault), 4);
    assert_eq!(catalog.count_origin(Origin::SynthesizedBaseline), 4);

    let preferred: Vec<_> = catalog.iter().filter(|m| m.is_preferred()).collect();
    assert_eq!(preferred.len(), 1);
    assert_eq!(preferred[0].display_name(), "1280x720@60");
    assert_eq!(preferred[0].cea_label(), Some("720p60"));

    let edid = synthesize_edid(&DisplayIdentity::default(), "720p60").unwrap();
    assert!(edid.is_valid());
    assert_eq!(edid.native_vic(), Some(4));
}

#[test]
fn test_resolution_is_idempotent() {
    let doc = b"# one custom mode\n800 0 40 128 88 600 0 1 4 23 0 0 0 60 0 40000000 1\n";
    let sources = OrderedSources::new().with_timings_document(&doc[..]);
    let first = names(&sources, Some("800x600"));
    let second = names(&sources, Some("800x600"));
    assert_eq!(first, second);
    assert_eq!(first[0], "800x600@60");

    let a = synthesize_edid(&DisplayIdentity::default(), "1080p50").unwrap();
    let b = synthesize_edid(&DisplayIdentity::default(), "1080p50").unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());
}

#[test]
fn test_forced_mode_wins_over_everything() {
    let doc = b"800 0 40 128 88 600 0 1 4 23 0 0 0 60 0 40000000 1\n";
    let sources = OrderedSources::new()
        .with_forced_mode("720p50")
        .with_timings_document(&doc[..]);
    let mut catalog = build_catalog(&sources);
    select_preferred(&mut catalog, DesiredModeSpec::parse("800x600").ok().as_ref());

    assert_eq!(catalog.len(), 1);
    let only = &catalog.modes()[0];
    assert_eq!(only.origin(), Origin::Forced);
    assert!(only.is_preferred());
    assert!(only.is_native());
    assert_eq!(only.display_name(), "1280x720@50");
}

#[test]
fn test_unusable_forced_mode_falls_through() {
    let sources = OrderedSources::new().with_forced_mode("not a mode");
    let catalog = build_catalog(&sources);
    assert_eq!(catalog.len(), 8);
    assert_eq!(catalog.diagnostics().len(), 1);
    assert_eq!(catalog.diagnostics()[0].origin, Origin::Forced);
}

#[test]
fn test_malformed_lines_are_skipped() {
    init_logging();
    let doc = b"\
this line is long enough but it is not a timing\n\
# a comment that would otherwise be long enough to parse\n\
1024 0 24 136 160 768 0 3 6 29 0 0 0 60 0 65000000 1\n\
1024 0 24 136 160 768 0 3 6 0 0 0 0 60 0 65000000 1\n";
    let catalog = build_catalog(&OrderedSources::new().with_timings_document(&doc[..]));

    assert_eq!(catalog.count_origin(Origin::CustomFile), 1);
    assert_eq!(catalog.count_origin(Origin::BuiltinDefault), 0);
    let lines: Vec<_> = catalog.diagnostics().iter().map(|d| d.line).collect();
    assert_eq!(lines, [Some(1), Some(4)]);
}

#[test]
fn test_entries_are_unique() {
    let mut catalog = build_catalog(&OrderedSources::new());
    select_preferred(&mut catalog, None);
    let mut keys: Vec<_> = catalog
        .iter()
        .map(|m| {
            let t = m.timing();
            (t.h_active, t.v_active, t.interlaced, t.refresh_rounded())
        })
        .collect();
    let total = keys.len();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), total);
}

#[test]
#[serial]
fn test_bridge_reads_timings_file() {
    init_logging();
    let path = std::env::temp_dir().join("dpidac-it-timings.txt");
    fs::write(
        &path,
        "1024 0 24 136 160 768 0 3 6 29 0 0 0 60 0 65000000 1\n",
    )
    .unwrap();

    let config = BridgeConfig::default()
        .with_timings_path(&path)
        .with_preferred_mode("1024x768@60");
    let mut bridge = Bridge::create(config);
    let published = bridge.attach().unwrap();
    assert_eq!(published.catalog.len(), 5);
    assert_eq!(
        published.catalog.preferred().unwrap().display_name(),
        "1024x768@60"
    );
    // Not a CEA mode, so the configured preferred label decides the VIC
    assert_eq!(published.edid.native_vic(), Some(16));

    fs::remove_file(&path).ok();
    bridge.destroy();
}
