use crate::sink::UserSink;
use serde::Serialize;
use tracing::warn;

/// Fixed age ranges, lower bound inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgeBucket {
    #[serde(rename = "<20")]
    Under20,
    #[serde(rename = "20-40")]
    From20To40,
    #[serde(rename = "40-60")]
    From40To60,
    #[serde(rename = ">=60")]
    From60,
}

impl AgeBucket {
    pub const ALL: [AgeBucket; 4] = [
        AgeBucket::Under20,
        AgeBucket::From20To40,
        AgeBucket::From40To60,
        AgeBucket::From60,
    ];

    pub fn of(age: f64) -> AgeBucket {
        if age < 20.0 {
            AgeBucket::Under20
        } else if age < 40.0 {
            AgeBucket::From20To40
        } else if age < 60.0 {
            AgeBucket::From40To60
        } else {
            AgeBucket::From60
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketShare {
    pub bucket: AgeBucket,
    pub count: u64,
    /// Rounded independently, so the four shares need not add up to 100.
    pub percent: u32,
}

/// Age distribution over all stored users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgeDistribution {
    pub total: u64,
    /// One entry per bucket; empty when the store could not be queried.
    pub buckets: Vec<BucketShare>,
}

impl AgeDistribution {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Buckets every finite age; nulls and non-finite values are ignored.
    pub fn from_ages<I>(ages: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut counts = [0u64; 4];
        for age in ages.into_iter().flatten().filter(|a| a.is_finite()) {
            counts[AgeBucket::of(age).index()] += 1;
        }
        let total: u64 = counts.iter().sum();

        let buckets = AgeBucket::ALL
            .iter()
            .map(|&bucket| {
                let count = counts[bucket.index()];
                BucketShare {
                    bucket,
                    count,
                    percent: rounded_percent(count, total),
                }
            })
            .collect();

        Self { total, buckets }
    }

    /// Queries every stored age from `sink`.
    ///
    /// The report is advisory: a failed query is logged and yields
    /// [`AgeDistribution::empty`].
    pub async fn compute<S: UserSink + ?Sized>(sink: &mut S) -> Self {
        match sink.query_all_ages().await {
            Ok(ages) => Self::from_ages(ages),
            Err(err) => {
                warn!("age distribution query failed: {err}");
                Self::empty()
            }
        }
    }

    pub fn share(&self, bucket: AgeBucket) -> Option<&BucketShare> {
        self.buckets.iter().find(|s| s.bucket == bucket)
    }
}

/// `count / total` as a percentage, halves rounded up.
fn rounded_percent(count: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((count * 200 + total) / (total * 2)) as u32
}
