use super::{UsageRecord, round_cost};
use serde::Serialize;
use std::collections::HashMap;

/// Running totals for one value of a grouping dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct CostBucket {
    pub key: String,
    pub cost: f64,
    pub tokens: u64,
    pub count: u64,
}

impl CostBucket {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            cost: 0.0,
            tokens: 0,
            count: 0,
        }
    }

    fn add(&mut self, record: &UsageRecord) {
        self.cost += record.cost;
        self.tokens = self.tokens.saturating_add(record.total_tokens());
        self.count += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelCost {
    pub model: String,
    pub cost: f64,
    pub tokens: u64,
    pub count: u64,
}

impl From<CostBucket> for ModelCost {
    fn from(bucket: CostBucket) -> Self {
        Self {
            model: bucket.key,
            cost: bucket.cost,
            tokens: bucket.tokens,
            count: bucket.count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagCost {
    pub tag: String,
    pub cost: f64,
    pub tokens: u64,
    pub count: u64,
}

impl From<CostBucket> for TagCost {
    fn from(bucket: CostBucket) -> Self {
        Self {
            tag: bucket.key,
            cost: bucket.cost,
            tokens: bucket.tokens,
            count: bucket.count,
        }
    }
}

/// Groups records by `key_fn` and returns buckets by descending cost.
///
/// Costs are summed unrounded and only rounded to 4 decimals once per bucket.
/// Buckets with equal cost keep the order in which their key was first seen.
pub fn aggregate_by<'a, I, F>(records: I, key_fn: F) -> Vec<CostBucket>
where
    I: IntoIterator<Item = &'a UsageRecord>,
    F: Fn(&UsageRecord) -> &str,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<CostBucket> = Vec::new();

    for record in records {
        let key = key_fn(record);
        let slot = match index.get(key) {
            Some(&slot) => slot,
            None => {
                index.insert(key.to_string(), buckets.len());
                buckets.push(CostBucket::new(key));
                buckets.len() - 1
            }
        };
        buckets[slot].add(record);
    }

    for bucket in &mut buckets {
        bucket.cost = round_cost(bucket.cost);
    }
    buckets.sort_by(|a, b| b.cost.total_cmp(&a.cost));
    buckets
}

pub fn cost_by_model(records: &[UsageRecord]) -> Vec<ModelCost> {
    aggregate_by(records, |record| record.model.as_str())
        .into_iter()
        .map(ModelCost::from)
        .collect()
}

pub fn cost_by_tag(records: &[UsageRecord]) -> Vec<TagCost> {
    aggregate_by(records, UsageRecord::tag_or_untagged)
        .into_iter()
        .map(TagCost::from)
        .collect()
}
