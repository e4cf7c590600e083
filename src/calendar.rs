use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Exchange timezone every bucket threshold is expressed in.
pub const MARKET_TZ: Tz = chrono_tz::America::New_York;

pub const MARKET_OPEN: (u32, u32) = (9, 31);
pub const MARKET_CLOSE: (u32, u32) = (16, 0);

/// A fixed daily capture checkpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bucket {
    pub label: &'static str,
    pub hour: u32,
    pub minute: u32,
}

pub const BUCKET_COUNT: usize = 8;

pub const BUCKETS: [Bucket; BUCKET_COUNT] = [
    Bucket { label: "9:31 AM", hour: 9, minute: 31 },
    Bucket { label: "10:00 AM", hour: 10, minute: 0 },
    Bucket { label: "11:00 AM", hour: 11, minute: 0 },
    Bucket { label: "12 NOON", hour: 12, minute: 0 },
    Bucket { label: "1:00 PM", hour: 13, minute: 0 },
    Bucket { label: "2:00 PM", hour: 14, minute: 0 },
    Bucket { label: "3:00 PM", hour: 15, minute: 0 },
    Bucket { label: "4:00 PM", hour: 16, minute: 0 },
];

/// The close-of-day bucket a new session compares its first capture against.
pub const CLOSING_BUCKET: usize = BUCKET_COUNT - 1;

impl Bucket {
    pub fn threshold(&self) -> (u32, u32) {
        (self.hour, self.minute)
    }

    pub fn sheet_name(&self) -> String {
        safe_sheet_name(self.label)
    }

    /// Threshold instant of this bucket on `day` in the exchange timezone.
    pub fn at(&self, day: NaiveDate) -> Option<DateTime<Tz>> {
        let naive = day.and_hms_opt(self.hour, self.minute, 0)?;
        MARKET_TZ.from_local_datetime(&naive).earliest()
    }
}

/// Highest bucket whose threshold is at or before `hour:minute`.
pub fn bucket_index_at(hour: u32, minute: u32) -> Option<usize> {
    BUCKETS
        .iter()
        .rposition(|bucket| (hour, minute) >= bucket.threshold())
}

pub fn is_market_hours(hour: u32, minute: u32) -> bool {
    MARKET_OPEN <= (hour, minute) && (hour, minute) <= MARKET_CLOSE
}

pub fn now_eastern() -> DateTime<Tz> {
    Utc::now().with_timezone(&MARKET_TZ)
}

/// `9:31 AM ET` style rendering.
pub fn format_et(dt: &DateTime<Tz>) -> String {
    format!("{} ET", dt.format("%-I:%M %p"))
}

/// Sheet-safe version of a bucket label: no `:\/?*[]`, at most 31 characters.
pub fn safe_sheet_name(label: &str) -> String {
    let replaced: String = label
        .chars()
        .map(|c| match c {
            ':' => ' ',
            '\\' | '/' | '?' | '*' => '_',
            '[' => '(',
            ']' => ')',
            other => other,
        })
        .collect();
    let trimmed = replaced.trim();
    let name = if trimmed.is_empty() { "Capture" } else { trimmed };
    name.chars().take(31).collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NextBucket {
    Pending { index: usize, minutes: i64 },
    SessionComplete,
}

/// The next bucket strictly after the current minute.
pub fn next_bucket(now: &DateTime<Tz>) -> NextBucket {
    let hm = (now.hour(), now.minute());
    for (index, bucket) in BUCKETS.iter().enumerate() {
        if hm < bucket.threshold() {
            let minutes = bucket
                .at(now.date_naive())
                .map(|at| (at - *now).num_minutes())
                .unwrap_or(0);
            return NextBucket::Pending { index, minutes };
        }
    }
    NextBucket::SessionComplete
}

pub fn describe_next_bucket(now: &DateTime<Tz>) -> String {
    match next_bucket(now) {
        NextBucket::Pending { index, minutes } => {
            let status = match minutes {
                m if m <= 0 => "ready now".to_string(),
                1 => "in 1 minute".to_string(),
                m => format!("in {} minutes", m),
            };
            format!("{} ({})", BUCKETS[index].label, status)
        }
        NextBucket::SessionComplete => "Session complete".to_string(),
    }
}
