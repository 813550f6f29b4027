use std::sync::Arc;

use super::{Channel, ChannelId, Value};

/// Pending writes collected during one decision cycle.
///
/// Holds at most one value per channel; adding to a channel that already has
/// a pending value replaces it in place, so commit order stays the order in
/// which channels were first touched.
#[derive(Default)]
pub struct WriteBatch {
    entries: Vec<(Arc<dyn Channel>, Value)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, channel: &Arc<dyn Channel>, value: Value) {
        match self
            .entries
            .iter_mut()
            .find(|(pending, _)| pending.id() == channel.id())
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((Arc::clone(channel), value)),
        }
    }

    pub fn get(&self, channel: &ChannelId) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(pending, _)| pending.id() == channel)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write every pending value in insertion order and clear the batch.
    ///
    /// Returns the number of writes issued.
    pub fn commit(&mut self) -> usize {
        let count = self.entries.len();
        for (channel, value) in self.entries.drain(..) {
            channel.write(value);
        }
        count
    }
}

impl std::fmt::Debug for WriteBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(c, v)| (c.id().clone(), v)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockChannel;
    use chrono::{TimeZone, Utc};
    use mockall::Sequence;

    fn value(v: f64) -> Value {
        Value::number(v, Utc.timestamp_millis_opt(1_000).unwrap())
    }

    fn mock(id: &str) -> MockChannel {
        let mut channel = MockChannel::new();
        channel.expect_id().return_const(ChannelId::new(id).unwrap());
        channel
    }

    #[test]
    fn test_later_write_overwrites_pending_value() {
        let mut setpoint = mock("inv_setpoint");
        setpoint
            .expect_write()
            .withf(|v| v.as_f64() == 2500.0)
            .times(1)
            .return_const(());
        let setpoint: Arc<dyn Channel> = Arc::new(setpoint);

        let mut batch = WriteBatch::new();
        batch.add(&setpoint, value(1000.0));
        batch.add(&setpoint, value(2500.0));

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.get(setpoint.id()).unwrap().as_f64(), 2500.0);
        assert_eq!(batch.commit(), 1);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_commit_preserves_insertion_order() {
        let mut seq = Sequence::new();
        let mut first = mock("relay_a");
        let mut second = mock("relay_b");
        first
            .expect_write()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        second
            .expect_write()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        let first: Arc<dyn Channel> = Arc::new(first);
        let second: Arc<dyn Channel> = Arc::new(second);

        let mut batch = WriteBatch::new();
        batch.add(&first, value(1.0));
        batch.add(&second, value(2.0));
        batch.add(&first, value(3.0));

        assert_eq!(batch.commit(), 2);
    }

    #[test]
    fn test_empty_batch_commits_nothing() {
        let mut batch = WriteBatch::new();
        assert_eq!(batch.commit(), 0);
    }
}
