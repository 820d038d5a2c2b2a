//! Batch planning: carve an ordered record set into write batches.

/// One planned batch, numbered from zero in input order.
#[derive(Debug)]
pub struct Batch<R> {
    pub index: usize,
    pub records: Vec<R>,
}

/// Split `records` into batches of at most `batch_size`, preserving
/// input order across and within batches. The final batch holds the
/// remainder; an empty input plans no batches.
pub fn plan_batches<R>(records: Vec<R>, batch_size: usize) -> Vec<Batch<R>> {
    let size = batch_size.max(1);
    let mut batches = Vec::with_capacity(records.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(records.len()));
    for record in records {
        current.push(record);
        if current.len() == size {
            batches.push(Batch {
                index: batches.len(),
                records: std::mem::replace(&mut current, Vec::with_capacity(size)),
            });
        }
    }
    if !current.is_empty() {
        batches.push(Batch {
            index: batches.len(),
            records: current,
        });
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_split() {
        let batches = plan_batches((0..30).collect::<Vec<_>>(), 10);
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.records.len() == 10));
        assert_eq!(batches[2].index, 2);
    }

    #[test]
    fn remainder_goes_in_final_batch() {
        let batches = plan_batches((0..25).collect::<Vec<_>>(), 10);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].records.len(), 5);
    }

    #[test]
    fn order_is_preserved() {
        let batches = plan_batches((0..25).collect::<Vec<_>>(), 7);
        let flat: Vec<i32> = batches.into_iter().flat_map(|b| b.records).collect();
        assert_eq!(flat, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn empty_input_plans_nothing() {
        let batches = plan_batches(Vec::<i32>::new(), 10);
        assert!(batches.is_empty());
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let batches = plan_batches(vec![1, 2, 3], 0);
        assert_eq!(batches.len(), 3);
    }
}
