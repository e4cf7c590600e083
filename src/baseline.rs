use crate::calendar::BUCKET_COUNT;

/// One step of the baseline fallback chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fallback {
    /// Nearest earlier bucket of the current session with a captured price.
    EarlierBuckets,
    /// The previous session's close-of-day capture.
    PriorSession,
    LastClose,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BaselineSource {
    EarlierBucket(usize),
    PriorSession,
    LastClose,
}

impl BaselineSource {
    pub fn describe(&self) -> String {
        match self {
            BaselineSource::EarlierBucket(index) => {
                format!("{} capture", crate::calendar::BUCKETS[*index].label)
            }
            BaselineSource::PriorSession => "prior session close".to_string(),
            BaselineSource::LastClose => "last close".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Baseline {
    pub price: f64,
    pub source: BaselineSource,
}

/// Everything the resolver may look at for one ticker.
#[derive(Clone, Copy, Debug)]
pub struct BaselineInputs<'a> {
    pub row: &'a [Option<f64>; BUCKET_COUNT],
    pub prior_session: Option<f64>,
    pub last_close: Option<f64>,
}

/// Ordered fallback chains for the first bucket and for every later one.
#[derive(Clone, Debug, PartialEq)]
pub struct BaselinePolicy {
    first: Vec<Fallback>,
    later: Vec<Fallback>,
}

impl Default for BaselinePolicy {
    fn default() -> Self {
        Self {
            first: vec![Fallback::PriorSession, Fallback::LastClose],
            later: vec![Fallback::EarlierBuckets, Fallback::LastClose],
        }
    }
}

fn numeric(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

impl BaselinePolicy {
    pub fn chain(&self, bucket: usize) -> &[Fallback] {
        if bucket == 0 { &self.first } else { &self.later }
    }

    /// First strategy in the chain that yields a finite price.
    pub fn resolve(&self, bucket: usize, inputs: BaselineInputs<'_>) -> Option<Baseline> {
        self.chain(bucket)
            .iter()
            .find_map(|step| Self::apply(*step, bucket, &inputs))
    }

    fn apply(step: Fallback, bucket: usize, inputs: &BaselineInputs<'_>) -> Option<Baseline> {
        match step {
            Fallback::EarlierBuckets => {
                let upper = bucket.min(BUCKET_COUNT);
                (0..upper).rev().find_map(|index| {
                    numeric(inputs.row[index]).map(|price| Baseline {
                        price,
                        source: BaselineSource::EarlierBucket(index),
                    })
                })
            }
            Fallback::PriorSession => numeric(inputs.prior_session).map(|price| Baseline {
                price,
                source: BaselineSource::PriorSession,
            }),
            Fallback::LastClose => numeric(inputs.last_close).map(|price| Baseline {
                price,
                source: BaselineSource::LastClose,
            }),
        }
    }
}

/// `(price / baseline - 1) * 100`, absent for a missing or zero baseline.
pub fn pct_change(price: Option<f64>, baseline: Option<f64>) -> Option<f64> {
    let price = numeric(price)?;
    let baseline = numeric(baseline)?;
    if baseline == 0.0 {
        return None;
    }
    let pct = (price / baseline - 1.0) * 100.0;
    pct.is_finite().then_some(pct)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(
        row: &[Option<f64>; BUCKET_COUNT],
        prior: Option<f64>,
        close: Option<f64>,
    ) -> BaselineInputs<'_> {
        BaselineInputs {
            row,
            prior_session: prior,
            last_close: close,
        }
    }

    #[test]
    fn test_first_bucket_prefers_prior_session() {
        let policy = BaselinePolicy::default();
        let row = [None; BUCKET_COUNT];

        let b = policy.resolve(0, inputs(&row, Some(101.0), Some(99.0))).unwrap();
        assert_eq!(b.price, 101.0);
        assert_eq!(b.source, BaselineSource::PriorSession);

        let b = policy.resolve(0, inputs(&row, Some(f64::NAN), Some(99.0))).unwrap();
        assert_eq!(b.price, 99.0);
        assert_eq!(b.source, BaselineSource::LastClose);

        assert!(policy.resolve(0, inputs(&row, None, None)).is_none());
    }

    #[test]
    fn test_first_bucket_ignores_its_own_capture() {
        let policy = BaselinePolicy::default();
        let mut row = [None; BUCKET_COUNT];
        row[0] = Some(150.0);
        let b = policy.resolve(0, inputs(&row, None, Some(99.0))).unwrap();
        assert_eq!(b.price, 99.0);
    }

    #[test]
    fn test_later_bucket_scans_backwards_skipping_gaps() {
        let policy = BaselinePolicy::default();
        let mut row = [None; BUCKET_COUNT];
        row[0] = Some(10.0);
        row[1] = Some(11.0);
        row[3] = Some(13.0);

        let b = policy.resolve(5, inputs(&row, Some(9.0), Some(8.0))).unwrap();
        assert_eq!(b.price, 13.0);
        assert_eq!(b.source, BaselineSource::EarlierBucket(3));

        // Gap at bucket 2 is skipped, not interpolated.
        let b = policy.resolve(3, inputs(&row, Some(9.0), Some(8.0))).unwrap();
        assert_eq!(b.source, BaselineSource::EarlierBucket(1));

        // The prior session never applies after the first bucket.
        let empty = [None; BUCKET_COUNT];
        let b = policy.resolve(4, inputs(&empty, Some(9.0), Some(8.0))).unwrap();
        assert_eq!(b.source, BaselineSource::LastClose);
    }

    #[test]
    fn test_custom_chain() {
        let policy = BaselinePolicy {
            first: vec![Fallback::LastClose],
            later: vec![Fallback::PriorSession],
        };
        let row = [Some(1.0); BUCKET_COUNT];
        let b = policy.resolve(2, inputs(&row, Some(7.0), Some(3.0))).unwrap();
        assert_eq!(b.source, BaselineSource::PriorSession);
        assert_eq!(policy.chain(0), &[Fallback::LastClose]);
    }

    #[test]
    fn test_pct_change() {
        let pct = pct_change(Some(105.0), Some(100.0)).unwrap();
        assert!((pct - 5.0).abs() < 1e-9);
        assert_eq!(format!("{:+.2}", pct), "+5.00");
        assert_eq!(pct_change(Some(105.0), Some(0.0)), None);
        assert_eq!(pct_change(Some(105.0), None), None);
        assert_eq!(pct_change(None, Some(100.0)), None);
        assert_eq!(pct_change(Some(f64::INFINITY), Some(100.0)), None);
    }
}
