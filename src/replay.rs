use crate::calendar::BUCKETS;
use crate::insights::Pulse;
use crate::workbook::{self, BucketRecord};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fmt::Write;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct ReplayBucket {
    pub bucket: usize,
    pub records: Vec<BucketRecord>,
    pub pulse: Pulse,
}

/// Every bucket sheet of a saved workbook, in bucket order.
#[derive(Clone, Debug)]
pub struct Replay {
    pub path: PathBuf,
    pub date: Option<NaiveDate>,
    pub buckets: Vec<ReplayBucket>,
}

pub fn load(path: &Path) -> Result<Replay> {
    let mut buckets = Vec::new();
    for (index, bucket) in BUCKETS.iter().enumerate() {
        let records = workbook::read_bucket_rows(path, bucket.label)
            .with_context(|| format!("read {} from {}", bucket.label, path.display()))?;
        if records.is_empty() {
            continue;
        }
        let pcts: Vec<(String, Option<f64>)> = records
            .iter()
            .map(|r| (r.ticker.clone(), r.pct))
            .collect();
        buckets.push(ReplayBucket {
            bucket: index,
            pulse: Pulse::for_bucket(index, &pcts),
            records,
        });
    }

    let date = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(workbook::parse_workbook_date);
    Ok(Replay {
        path: path.to_path_buf(),
        date,
        buckets,
    })
}

fn fmt_num(value: Option<f64>, pct: bool) -> String {
    match (value, pct) {
        (Some(v), true) => format!("{:+.2}%", v),
        (Some(v), false) => format!("{:.2}", v),
        (None, _) => "--".to_string(),
    }
}

/// Plain-text rendering for `--replay`.
pub fn render_text(replay: &Replay) -> String {
    let mut out = String::new();
    let title = match replay.date {
        Some(date) => format!(
            "Replay of {} ({})",
            replay.path.display(),
            date.format("%a %b %d, %Y")
        ),
        None => format!("Replay of {}", replay.path.display()),
    };
    let _ = writeln!(out, "{}", title);
    if replay.buckets.is_empty() {
        let _ = writeln!(out, "No bucket sheets found.");
        return out;
    }

    for bucket in &replay.buckets {
        let _ = writeln!(out);
        let _ = writeln!(out, "== {} ==", bucket.pulse.headline());
        for record in &bucket.records {
            let _ = writeln!(
                out,
                "{:<6} {:>10} {:>9}",
                record.ticker,
                fmt_num(record.price, false),
                fmt_num(record.pct, true)
            );
        }
    }
    out
}
