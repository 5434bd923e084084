// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! VESA Coordinated Video Timings (CVT 1.1)
//!
//! Used when a forced mode names a resolution the bridge has no timing for.
//! Both the standard CRT blanking formula and the reduced-blanking (RB v1)
//! variant are implemented, without margins. Vertical values are computed per
//! field and then expanded to the full frame for interlaced modes.

use crate::timing::{SyncPolarity, VideoTiming, TIMING_FIELD_MAX};
use crate::Error;

const H_GRANULARITY: u32 = 8;
const CLOCK_STEP_HZ: f64 = 250_000.0;

// Standard blanking
const MIN_VSYNC_BP_US: f64 = 550.0;
const MIN_V_PORCH: u32 = 3;
const MIN_V_BPORCH: u32 = 6;
const C_PRIME: f64 = 30.0;
const M_PRIME: f64 = 300.0;
const HSYNC_PERCENT: f64 = 8.0;
const MIN_DUTY_CYCLE: f64 = 20.0;

// Reduced blanking
const RB_MIN_VBLANK_US: f64 = 460.0;
const RB_H_BLANK: u32 = 160;
const RB_H_SYNC: u32 = 32;
const RB_H_FPORCH: u32 = 48;
const RB_V_FPORCH: u32 = 3;

/// Vertical sync width, which CVT uses to encode the aspect ratio.
fn vsync_lines(width: u32, height: u32) -> u32 {
    let (width, height) = (u64::from(width), u64::from(height));
    if height % 3 == 0 && height * 4 / 3 == width {
        4
    } else if height % 9 == 0 && height * 16 / 9 == width {
        5
    } else if height % 10 == 0 && height * 16 / 10 == width {
        6
    } else if (height % 4 == 0 && height * 5 / 4 == width)
        || (height % 9 == 0 && height * 15 / 9 == width)
    {
        7
    } else {
        10
    }
}

/// Blanking line count `floor(us / h_period) + 1`, or `None` when it does not
/// fit a timing field.
fn blanking_lines(us: f64, h_period: f64) -> Option<u32> {
    let lines = (us / h_period).floor() + 1.0;
    (lines.is_finite() && lines <= TIMING_FIELD_MAX as f64).then_some(lines as u32)
}

/// Generate a CVT timing.
///
/// `refresh` is the field rate in Hz, so an interlaced result reports
/// `refresh` from [`VideoTiming::refresh_hz`] as well.
///
/// # Errors
///
/// Returns [`Error::MalformedLine`] for zero dimensions or refresh, for
/// dimensions above [`TIMING_FIELD_MAX`], or when the formula cannot produce
/// a valid timing (refresh rates too high for the minimum blanking time).
///
/// # Example
///
/// ```
/// use dpidac::cvt::cvt_timing;
///
/// let t = cvt_timing(1024, 768, 60, false, false)?;
/// assert_eq!(t.h_total(), 1328);
/// assert_eq!(t.refresh_rounded(), 60);
/// # Ok::<(), dpidac::Error>(())
/// ```
pub fn cvt_timing(
    width: u32,
    height: u32,
    refresh: u32,
    reduced: bool,
    interlaced: bool,
) -> Result<VideoTiming, Error> {
    if width == 0 || height == 0 || refresh == 0 {
        return Err(Error::MalformedLine(format!(
            "{}x{}@{} (CVT needs nonzero size and refresh)",
            width, height, refresh
        )));
    }
    if width > TIMING_FIELD_MAX || height > TIMING_FIELD_MAX {
        return Err(Error::MalformedLine(format!(
            "{}x{}@{} (CVT size limit is {})",
            width, height, refresh, TIMING_FIELD_MAX
        )));
    }
    let too_fast = || {
        Error::MalformedLine(format!(
            "{}x{}@{} (refresh too high for CVT blanking)",
            width, height, refresh
        ))
    };

    let h_active = width / H_GRANULARITY * H_GRANULARITY;
    let field_active = if interlaced { height / 2 } else { height };
    let half_line = if interlaced { 0.5 } else { 0.0 };
    let field_rate = refresh as f64;
    let vsync = vsync_lines(width, height);

    let (pixel_clock_hz, h_front, h_sync, h_back, v_front, v_back) = if reduced {
        let h_period_est =
            (1_000_000.0 / field_rate - RB_MIN_VBLANK_US) / field_active as f64;
        if !h_period_est.is_finite() || h_period_est <= 0.0 {
            return Err(too_fast());
        }
        let vbi_lines = blanking_lines(RB_MIN_VBLANK_US, h_period_est).ok_or_else(too_fast)?;
        let vbi_lines = vbi_lines.max(RB_V_FPORCH + vsync + MIN_V_BPORCH);
        let total_lines = (vbi_lines + field_active) as f64 + half_line;
        let total_pixels = h_active + RB_H_BLANK;
        let clock = field_rate * total_lines * total_pixels as f64;

        (
            clock,
            RB_H_FPORCH,
            RB_H_SYNC,
            RB_H_BLANK - RB_H_FPORCH - RB_H_SYNC,
            RB_V_FPORCH,
            vbi_lines - RB_V_FPORCH - vsync,
        )
    } else {
        let h_period_est = (1_000_000.0 / field_rate - MIN_VSYNC_BP_US)
            / (field_active as f64 + MIN_V_PORCH as f64 + half_line);
        if !h_period_est.is_finite() || h_period_est <= 0.0 {
            return Err(too_fast());
        }
        let vsync_bp = blanking_lines(MIN_VSYNC_BP_US, h_period_est)
            .ok_or_else(too_fast)?
            .max(vsync + MIN_V_BPORCH);
        let duty = (C_PRIME - M_PRIME * h_period_est / 1000.0).max(MIN_DUTY_CYCLE);
        let cell = (2 * H_GRANULARITY) as f64;
        let h_blank =
            ((h_active as f64 * duty / (100.0 - duty) / cell).floor() * cell) as u32;
        let total_pixels = h_active + h_blank;
        let h_sync = ((total_pixels as f64 * HSYNC_PERCENT / 100.0 / H_GRANULARITY as f64)
            .floor()
            * H_GRANULARITY as f64) as u32;
        let h_back = h_blank / 2;
        let clock = total_pixels as f64 / h_period_est * 1_000_000.0;

        (
            clock,
            h_blank.saturating_sub(h_sync + h_back),
            h_sync,
            h_back,
            MIN_V_PORCH,
            vsync_bp - vsync,
        )
    };

    let pixel_clock_hz = ((pixel_clock_hz / CLOCK_STEP_HZ).floor() * CLOCK_STEP_HZ) as u64;

    // Frame values: each field carries its own blanking, and the two half
    // lines add up to one extra front-porch line.
    let (v_front, v_sync, v_back) = if interlaced {
        (v_front * 2 + 1, vsync * 2, v_back * 2)
    } else {
        (v_front, vsync, v_back)
    };

    let (h_sync_polarity, v_sync_polarity) = if reduced {
        (SyncPolarity::High, SyncPolarity::Low)
    } else {
        (SyncPolarity::Low, SyncPolarity::High)
    };

    let timing = VideoTiming {
        pixel_clock_hz,
        h_active,
        h_front_porch: h_front,
        h_sync_len: h_sync,
        h_back_porch: h_back,
        v_active: field_active * if interlaced { 2 } else { 1 },
        v_front_porch: v_front,
        v_sync_len: v_sync,
        v_back_porch: v_back,
        interlaced,
        h_sync_polarity,
        v_sync_polarity,
    };
    timing.validate().map_err(|e| {
        Error::MalformedLine(format!(
            "{}x{}@{} (CVT produced an invalid timing: {})",
            width, height, refresh, e
        ))
    })?;

    Ok(timing)
}
