use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::gateway::StudentRecord;

/// Total parser for marks. Accepts JSON numbers and digit-bearing strings;
/// everything else (null, empty, text, non-finite) is `None`. Downstream
/// comparisons must check parse success first so NaN never reaches them.
pub fn parse_marks(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                return None;
            }
            t.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// Identifies the record holding an extremum: enough for the chrome to
/// name the top/bottom scorer without a second lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scorer {
    pub id: String,
    pub name: String,
    pub student_class: String,
    pub marks: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStats {
    pub student_class: String,
    pub count: usize,
    pub average: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest: Option<Scorer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lowest: Option<Scorer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramBin {
    pub label: &'static str,
    pub min: i64,
    pub max: i64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSummary {
    pub total: usize,
    pub average: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest: Option<Scorer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lowest: Option<Scorer>,
    pub classes: Vec<ClassStats>,
    pub histogram: Vec<HistogramBin>,
}

/// Display bounds per bucket. Ranges are half-open except the last,
/// which is closed so a mark of exactly 100 lands in it.
const HISTOGRAM_BINS: [(&str, i64, i64); 5] = [
    ("0-19", 0, 19),
    ("20-39", 20, 39),
    ("40-59", 40, 59),
    ("60-79", 60, 79),
    ("80-100", 80, 100),
];

fn bucket_index(marks: f64) -> usize {
    if marks >= 80.0 {
        4
    } else if marks >= 60.0 {
        3
    } else if marks >= 40.0 {
        2
    } else if marks >= 20.0 {
        1
    } else {
        0
    }
}

fn scorer(record: &StudentRecord, marks: f64) -> Scorer {
    Scorer {
        id: record.id.clone(),
        name: record.name.clone(),
        student_class: record.student_class.clone(),
        marks,
    }
}

#[derive(Default)]
struct GroupAcc {
    count: usize,
    sum: f64,
    parsed: usize,
    highest: Option<Scorer>,
    lowest: Option<Scorer>,
}

/// Single pass over the roster. Records with unparseable marks count
/// toward totals but never enter the average, the extrema, or the
/// histogram. Ties keep the first record encountered in input order.
pub fn compute_roster_summary(records: &[StudentRecord]) -> RosterSummary {
    let mut sum = 0.0_f64;
    let mut parsed_count = 0_usize;
    let mut highest: Option<Scorer> = None;
    let mut lowest: Option<Scorer> = None;
    let mut bins = [0_usize; 5];
    // Keyed by the exact class label: grouping is case-sensitive and
    // unnormalized. BTreeMap gives a deterministic output order.
    let mut groups: BTreeMap<String, GroupAcc> = BTreeMap::new();

    for record in records {
        let parsed = parse_marks(&record.marks);

        if let Some(marks) = parsed {
            sum += marks;
            parsed_count += 1;
            bins[bucket_index(marks)] += 1;
            // Strict comparisons keep the first-encountered record on ties.
            if highest.as_ref().map(|h| marks > h.marks).unwrap_or(true) {
                highest = Some(scorer(record, marks));
            }
            if lowest.as_ref().map(|l| marks < l.marks).unwrap_or(true) {
                lowest = Some(scorer(record, marks));
            }
        }

        if record.student_class.trim().is_empty() {
            // Still counted in `total`, just not groupable.
            continue;
        }
        let group = groups.entry(record.student_class.clone()).or_default();
        group.count += 1;
        if let Some(marks) = parsed {
            group.sum += marks;
            group.parsed += 1;
            if group
                .highest
                .as_ref()
                .map(|h| marks > h.marks)
                .unwrap_or(true)
            {
                group.highest = Some(scorer(record, marks));
            }
            if group
                .lowest
                .as_ref()
                .map(|l| marks < l.marks)
                .unwrap_or(true)
            {
                group.lowest = Some(scorer(record, marks));
            }
        }
    }

    let average = if parsed_count > 0 {
        sum / parsed_count as f64
    } else {
        0.0
    };

    let classes = groups
        .into_iter()
        .map(|(student_class, acc)| ClassStats {
            student_class,
            count: acc.count,
            average: if acc.parsed > 0 {
                acc.sum / acc.parsed as f64
            } else {
                0.0
            },
            highest: acc.highest,
            lowest: acc.lowest,
        })
        .collect();

    let histogram = HISTOGRAM_BINS
        .iter()
        .zip(bins.iter())
        .map(|(&(label, min, max), &count)| HistogramBin {
            label,
            min,
            max,
            count,
        })
        .collect();

    RosterSummary {
        total: records.len(),
        average,
        highest,
        lowest,
        classes,
        histogram,
    }
}
