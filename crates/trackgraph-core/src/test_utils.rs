//! Shared track fixtures for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so the fixtures
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use std::fmt::Write;

// ===========================================================================
// Small fixed layouts
// ===========================================================================

/// Two sensors facing each other on a closed loop. Exactly three lines, no
/// trailing newline, so appended records start at line 4.
pub const TWO_SENSOR_LOOP: &str = "# two sensors facing each other
sensor S1 : 0 -> S2 @ S2 : 1 -> S1
dist S1 S2 500mm";

/// Three sensors in a triangle with a calibration loop closed explicitly.
pub const CALIB_TRIANGLE: &str = "\
sensor A : 0 -> B @ A_R : 1 -> C_R
sensor B : 2 -> C @ B_R : 3 -> A_R
sensor C : 4 -> A @ C_R : 5 -> B_R
dist A B 100mm
dist B C 200mm
dist C A 300mm
calib A
calib B
calib C
calib A
";

/// Open line between two entry points with a separator in the middle.
///
/// ```text
/// EN1 -> S1 -> SP1 -> S3 -> EX2
/// EX1 <- S2 <- SP2 <- S4 <- EN2
/// ```
///
/// Sensor addresses 0, 1, 4, 5, so slots 2 and 3 are dummies.
pub fn line_track() -> String {
    "\
enter EN1 -> S1 @ EX1
sensor S1 : 0 -> SP1 @ S2 : 1 -> EX1
sep SP1 -> S3 @ SP2 -> S2
sensor S3 : 4 -> EX2 @ S4 : 5 -> SP2
enter EN2 -> S4 @ EX2
dist EN1 S1 50mm
dist S1 SP1 120mm
dist SP1 S3 80mm
dist S3 EX2 60mm
"
    .to_string()
}

/// Loop with one passing siding: BR1 splits onto P1 (straight) or Q1
/// (curved), and MR2 joins them again.
///
/// ```text
///            P1
///   A1 -> BR1    MR2 -> A3 -> A5 -> A1
///            Q1
/// ```
///
/// The A-even sensors run the other way round. Ends with a newline.
pub fn passing_loop_track() -> String {
    "\
sensor A1 : 0 -> BR1 @ A2 : 1 -> A6
sensor P1 : 2 -> MR2 @ P2 : 3 -> MR1
sensor Q1 : 4 -> MR2 @ Q2 : 5 -> MR1
sensor A3 : 6 -> A5 @ A4 : 7 -> BR2
sensor A5 : 8 -> A1 @ A6 : 9 -> A4
switch BR1 : 1 -> P1/(Q1) @ MR1 -> A2
switch BR2 : 2 -> P2/(Q2) @ MR2 -> A3
dist A1 BR1 100mm
dist BR1 P1 200mm
dist BR1 Q1 250mm
dist P1 MR2 200mm
dist Q1 MR2 250mm
dist MR2 A3 100mm
dist A3 A5 300mm
dist A5 A1 400mm
"
    .to_string()
}

// ===========================================================================
// Generated rings
// ===========================================================================

/// One segment of a generated ring, between junction sensors `F{i}` and
/// `F{i+1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingSegment {
    /// Forward length of the plain route, at least 4mm.
    pub length_mm: u32,
    /// Split the segment into a straight and a curved siding.
    pub siding: bool,
    /// Calibration loop takes the curved siding.
    pub take_curved: bool,
}

impl RingSegment {
    pub fn plain(length_mm: u32) -> Self {
        Self {
            length_mm,
            siding: false,
            take_curved: false,
        }
    }

    pub fn siding(length_mm: u32, take_curved: bool) -> Self {
        Self {
            length_mm,
            siding: true,
            take_curved,
        }
    }
}

/// A ring of `segments.len()` (at least 2) junction sensor pairs.
///
/// Forward sensors are `F{i}`, their reverses `R{i}`. A siding segment
/// `i` adds branch `BA{i}` / merge `MA{i}`, siding sensors `P{i}` (straight)
/// and `Q{i}` (curved) with reverses `PR{i}` / `QR{i}`, and the joining
/// switch `BB{i}` / `MB{i}`. Every forward edge gets a distance. When
/// `address_gap` is non-zero, that many addresses are skipped after every
/// sensor pair. The calibration loop runs once around the forward ring.
pub fn ring_track(segments: &[RingSegment], address_gap: u32) -> String {
    let n = segments.len();
    let mut out = String::new();
    let mut address = 0u32;
    let mut switch_number = 1u32;
    let mut next_address = || {
        let a = address;
        address += 2 + address_gap;
        a
    };

    for (i, seg) in segments.iter().enumerate() {
        let next = (i + 1) % n;
        let prev = (i + n - 1) % n;
        let forward_ahead = if seg.siding {
            format!("BA{i}")
        } else {
            format!("F{next}")
        };
        let backward_ahead = if segments[prev].siding {
            format!("BB{prev}")
        } else {
            format!("R{prev}")
        };
        let a = next_address();
        let _ = writeln!(
            out,
            "sensor F{i} : {a} -> {forward_ahead} @ R{i} : {} -> {backward_ahead}",
            a + 1
        );
    }

    for (i, seg) in segments.iter().enumerate() {
        let next = (i + 1) % n;
        if !seg.siding {
            let _ = writeln!(out, "dist F{i} F{next} {}mm", seg.length_mm.max(1));
            continue;
        }
        let (sw_a, sw_b) = (switch_number, switch_number + 1);
        switch_number += 2;
        let (p, q) = (next_address(), next_address());
        let _ = writeln!(out, "switch BA{i} : {sw_a} -> P{i}/(Q{i}) @ MA{i} -> R{i}");
        let _ = writeln!(out, "switch BB{i} : {sw_b} -> PR{i}/(QR{i}) @ MB{i} -> F{next}");
        let _ = writeln!(out, "sensor P{i} : {p} -> MB{i} @ PR{i} : {} -> MA{i}", p + 1);
        let _ = writeln!(out, "sensor Q{i} : {q} -> MB{i} @ QR{i} : {} -> MA{i}", q + 1);

        let quarter = (seg.length_mm / 4).max(1);
        let _ = writeln!(out, "dist F{i} BA{i} {quarter}mm");
        let _ = writeln!(out, "dist BA{i} P{i} {quarter}mm");
        let _ = writeln!(out, "dist BA{i} Q{i} {}mm", quarter + 10);
        let _ = writeln!(out, "dist P{i} MB{i} {quarter}mm");
        let _ = writeln!(out, "dist Q{i} MB{i} {}mm", quarter + 10);
        let _ = writeln!(out, "dist MB{i} F{next} {quarter}mm");
    }

    for (i, seg) in segments.iter().enumerate() {
        let _ = writeln!(out, "calib F{i}");
        if seg.siding {
            let via = if seg.take_curved { 'Q' } else { 'P' };
            let _ = writeln!(out, "calib BA{i}");
            let _ = writeln!(out, "calib {via}{i}");
            let _ = writeln!(out, "calib MB{i}");
        }
    }
    out
}

/// `mutex` lines seeding one group per siding from its straight branch edge.
pub fn ring_mutexes(segments: &[RingSegment]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        if seg.siding {
            let _ = writeln!(out, "mutex BA{i} P{i}");
        }
    }
    out
}

/// A large ring alternating plain and siding segments, for benchmarks.
pub fn large_ring(pairs: usize) -> String {
    let segments: Vec<RingSegment> = (0..pairs.max(2))
        .map(|i| {
            if i % 2 == 0 {
                RingSegment::plain(500 + i as u32)
            } else {
                RingSegment::siding(800, i % 3 == 0)
            }
        })
        .collect();
    ring_track(&segments, 0) + &ring_mutexes(&segments)
}
