use crate::channel::Value;

/// Which of the two correlated streams a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Minuend, e.g. the outlet temperature
    Lhs,
    /// Subtrahend, e.g. the inlet temperature
    Rhs,
}

/// Last-seen values of two streams, paired by exact timestamp.
///
/// A difference is produced only when both slots hold samples with equal
/// timestamps. Samples that are merely close in time produce nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelatedPair {
    lhs: Option<Value>,
    rhs: Option<Value>,
}

impl CorrelatedPair {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lhs(&self) -> Option<&Value> {
        self.lhs.as_ref()
    }

    pub fn rhs(&self) -> Option<&Value> {
        self.rhs.as_ref()
    }

    /// Store the sample and return `lhs - rhs` stamped with the shared
    /// timestamp if the two slots are now coincident.
    pub fn update(&mut self, side: Side, value: Value) -> Option<Value> {
        match side {
            Side::Lhs => self.lhs = Some(value),
            Side::Rhs => self.rhs = Some(value),
        }
        let (lhs, rhs) = (self.lhs.as_ref()?, self.rhs.as_ref()?);
        if !lhs.is_coincident(rhs) {
            return None;
        }
        Some(Value::number(lhs.as_f64() - rhs.as_f64(), lhs.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_coincident_samples_produce_delta() {
        let mut pair = CorrelatedPair::new();
        assert_eq!(pair.update(Side::Lhs, Value::number(10.0, at(100))), None);

        let delta = pair.update(Side::Rhs, Value::number(4.0, at(100))).unwrap();
        assert_eq!(delta.as_f64(), 6.0);
        assert_eq!(delta.timestamp, at(100));
    }

    #[test]
    fn test_close_timestamps_produce_nothing() {
        let mut pair = CorrelatedPair::new();
        pair.update(Side::Lhs, Value::number(10.0, at(100)));
        assert_eq!(pair.update(Side::Rhs, Value::number(4.0, at(101))), None);
    }

    #[test]
    fn test_arrival_order_does_not_matter() {
        let mut pair = CorrelatedPair::new();
        pair.update(Side::Rhs, Value::number(30.0, at(200)));
        let delta = pair.update(Side::Lhs, Value::number(37.5, at(200))).unwrap();
        assert_eq!(delta.as_f64(), 7.5);
    }

    #[test]
    fn test_late_sample_replaces_slot() {
        let mut pair = CorrelatedPair::new();
        pair.update(Side::Lhs, Value::number(10.0, at(100)));
        pair.update(Side::Rhs, Value::number(4.0, at(101)));

        let delta = pair.update(Side::Lhs, Value::number(9.0, at(101))).unwrap();
        assert_eq!(delta.as_f64(), 5.0);
        assert_eq!(pair.lhs().unwrap().timestamp, at(101));
    }

    #[test]
    fn test_repeated_sample_emits_again() {
        let mut pair = CorrelatedPair::new();
        pair.update(Side::Lhs, Value::number(10.0, at(100)));
        pair.update(Side::Rhs, Value::number(4.0, at(100)));

        let again = pair.update(Side::Rhs, Value::number(3.0, at(100))).unwrap();
        assert_eq!(again.as_f64(), 7.0);
    }
}
