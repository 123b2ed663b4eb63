//! Line-oriented record parser for track descriptions.
//!
//! Each non-blank line that does not start with `#` is exactly one record:
//!
//! ```text
//! sensor A1 : 0 -> C13 @ A2 : 1 -> E7
//! sep    S1 -> A3 @ S2 -> A4
//! switch BR1 : 1 -> A5/(A6) @ MR1 -> A2
//! enter  EN1 -> A1 @ EX1
//! dist   A1 C13 480mm
//! mutex  BR1 A5 : BR2 A7
//! calib  A1
//! ```
//!
//! Lines that match none of these shapes fail with [`CompileError::Parse`].

use crate::error::CompileError;
use regex::Regex;
use std::sync::LazyLock;

/// One half of a sensor pair declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorDecl {
    pub name: String,
    pub address: u32,
    pub ahead: String,
}

/// One half of a separator pair declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatorDecl {
    pub name: String,
    pub ahead: String,
}

/// A single typed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Two sensors that are each other's reverse.
    SensorPair {
        forward: SensorDecl,
        backward: SensorDecl,
    },
    /// Two separators that are each other's reverse.
    SeparatorPair {
        forward: SeparatorDecl,
        backward: SeparatorDecl,
    },
    /// A branch and the merge that is its reverse.
    SwitchPair {
        branch: String,
        number: u32,
        straight: String,
        curved: String,
        merge: String,
        merge_ahead: String,
    },
    /// An entry point and the exit that is its reverse.
    EnterPair {
        enter: String,
        ahead: String,
        exit: String,
    },
    /// Distance of the edge `src -> dest` (and of its reverse).
    Distance {
        src: String,
        dest: String,
        millimeters: u32,
    },
    /// Seed edges of one mutex group, as `(src, dest)` name pairs.
    Mutex { edges: Vec<(String, String)> },
    /// One node of the calibration cycle.
    CalibrationStep { node: String },
}

/// A record together with the line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    /// 1-based line number.
    pub line: usize,
    pub record: Record,
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

const NAME: &str = r"[A-Za-z0-9_]+";
const NUM: &str = r"[0-9]+";

fn pattern(body: &str) -> Regex {
    let full = format!("^{}$", body.replace("NAME", NAME).replace("NUM", NUM));
    Regex::new(&full).expect("record patterns are valid regular expressions")
}

static SENSOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"sensor\s+(?P<name>NAME)\s*:\s*(?P<num>NUM)\s*->\s*(?P<ahead>NAME)\s*@\s*(?P<rev_name>NAME)\s*:\s*(?P<rev_num>NUM)\s*->\s*(?P<rev_ahead>NAME)",
    )
});

static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"sep\s+(?P<name>NAME)\s*->\s*(?P<ahead>NAME)\s*@\s*(?P<rev_name>NAME)\s*->\s*(?P<rev_ahead>NAME)",
    )
});

static SWITCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"switch\s+(?P<name>NAME)\s*:\s*(?P<num>NUM)\s*->\s*(?P<straight>NAME)\s*/\s*\(\s*(?P<curved>NAME)\s*\)\s*@\s*(?P<merge>NAME)\s*->\s*(?P<merge_ahead>NAME)",
    )
});

static ENTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"enter\s+(?P<name>NAME)\s*->\s*(?P<ahead>NAME)\s*@\s*(?P<exit>NAME)")
});

static DIST_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"dist\s+(?P<src>NAME)\s+(?P<dest>NAME)\s+(?P<mm>NUM)\s*mm"));

static MUTEX_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"mutex\s+(?P<body>.+)"));

static MUTEX_PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?P<src>NAME)\s+(?P<dest>NAME)"));

static CALIB_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"calib\s+(?P<node>NAME)"));

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a whole track description into records, in input order.
pub fn parse_records(input: &str) -> Result<Vec<ParsedRecord>, CompileError> {
    let mut records = Vec::new();
    for (index, raw) in input.lines().enumerate() {
        if let Some(record) = parse_line(raw, index + 1)? {
            records.push(ParsedRecord {
                line: index + 1,
                record,
            });
        }
    }
    Ok(records)
}

/// Parse a single line. Returns `Ok(None)` for blank and comment lines.
pub fn parse_line(raw: &str, line: usize) -> Result<Option<Record>, CompileError> {
    let text = raw.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }

    let fail = |reason: &'static str| CompileError::Parse {
        line,
        content: text.to_string(),
        reason,
    };
    let number = |digits: &str| digits.parse::<u32>().map_err(|_| fail("number out of range"));

    if let Some(c) = SENSOR_RE.captures(text) {
        return Ok(Some(Record::SensorPair {
            forward: SensorDecl {
                name: c["name"].to_string(),
                address: number(&c["num"])?,
                ahead: c["ahead"].to_string(),
            },
            backward: SensorDecl {
                name: c["rev_name"].to_string(),
                address: number(&c["rev_num"])?,
                ahead: c["rev_ahead"].to_string(),
            },
        }));
    }

    if let Some(c) = SEPARATOR_RE.captures(text) {
        return Ok(Some(Record::SeparatorPair {
            forward: SeparatorDecl {
                name: c["name"].to_string(),
                ahead: c["ahead"].to_string(),
            },
            backward: SeparatorDecl {
                name: c["rev_name"].to_string(),
                ahead: c["rev_ahead"].to_string(),
            },
        }));
    }

    if let Some(c) = SWITCH_RE.captures(text) {
        return Ok(Some(Record::SwitchPair {
            branch: c["name"].to_string(),
            number: number(&c["num"])?,
            straight: c["straight"].to_string(),
            curved: c["curved"].to_string(),
            merge: c["merge"].to_string(),
            merge_ahead: c["merge_ahead"].to_string(),
        }));
    }

    if let Some(c) = ENTER_RE.captures(text) {
        return Ok(Some(Record::EnterPair {
            enter: c["name"].to_string(),
            ahead: c["ahead"].to_string(),
            exit: c["exit"].to_string(),
        }));
    }

    if let Some(c) = DIST_RE.captures(text) {
        let millimeters = number(&c["mm"])?;
        if millimeters == 0 {
            return Err(fail("distance must be positive"));
        }
        return Ok(Some(Record::Distance {
            src: c["src"].to_string(),
            dest: c["dest"].to_string(),
            millimeters,
        }));
    }

    if let Some(c) = MUTEX_RE.captures(text) {
        let mut edges = Vec::new();
        for part in c["body"].split(':') {
            let pair = MUTEX_PAIR_RE
                .captures(part.trim())
                .ok_or_else(|| fail("mutex entries must be `src dest` pairs"))?;
            edges.push((pair["src"].to_string(), pair["dest"].to_string()));
        }
        return Ok(Some(Record::Mutex { edges }));
    }

    if let Some(c) = CALIB_RE.captures(text) {
        return Ok(Some(Record::CalibrationStep {
            node: c["node"].to_string(),
        }));
    }

    Err(fail("unrecognized record"))
}
