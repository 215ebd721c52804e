// Price oracles.
//
// The engine never fetches prices itself; the keeper samples an oracle and
// passes settlement prices into upkeep. These are in-memory stand-ins for
// whatever feed a deployment would bind (mocked, like the token ledger).

use crate::types::{Price, Timestamp};
use rust_decimal::Decimal;
use std::collections::VecDeque;

pub trait PriceOracle {
    /// Latest observed price, if the feed has one.
    fn get_price(&self) -> Option<Price>;

    /// Price as of `timestamp`: the latest observation at or before it. Lets
    /// the keeper settle a specific interval boundary after the fact.
    fn price_at(&self, timestamp: Timestamp) -> Option<Price>;
}

/// Settable spot feed keeping its full sample history, so interval boundaries
/// can be priced retroactively.
#[derive(Debug, Clone, Default)]
pub struct SpotOracle {
    // ascending by timestamp
    samples: Vec<(Timestamp, Price)>,
}

impl SpotOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(timestamp: Timestamp, price: Price) -> Self {
        Self {
            samples: vec![(timestamp, price)],
        }
    }

    pub fn set_price(&mut self, timestamp: Timestamp, price: Price) {
        debug_assert!(
            self.samples.last().map_or(true, |(t, _)| *t <= timestamp),
            "samples must be appended in time order"
        );
        self.samples.push((timestamp, price));
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl PriceOracle for SpotOracle {
    fn get_price(&self) -> Option<Price> {
        self.samples.last().map(|(_, p)| *p)
    }

    fn price_at(&self, timestamp: Timestamp) -> Option<Price> {
        self.samples
            .iter()
            .rev()
            .find(|(t, _)| *t <= timestamp)
            .map(|(_, p)| *p)
    }
}

/// Simple moving average over a fixed-capacity ring of spot samples, taken at
/// a fixed polling cadence. The mean ramps up from a single sample until the
/// window is full, then the oldest sample is evicted per poll.
#[derive(Debug, Clone)]
pub struct SmaOracle {
    periods: usize,
    poll_interval_ms: i64,
    samples: VecDeque<(Timestamp, Price)>,
    last_poll: Option<Timestamp>,
}

impl SmaOracle {
    pub fn new(periods: usize, poll_interval_ms: i64) -> Self {
        debug_assert!(periods > 0);
        debug_assert!(poll_interval_ms > 0);
        Self {
            periods,
            poll_interval_ms,
            samples: VecDeque::with_capacity(periods),
            last_poll: None,
        }
    }

    /// Record a spot sample if a full polling interval has elapsed since the
    /// last one. Returns whether the sample was taken.
    pub fn poll(&mut self, now: Timestamp, spot: Price) -> bool {
        if let Some(last) = self.last_poll {
            if now.millis_since(last) < self.poll_interval_ms {
                return false;
            }
        }
        self.samples.push_back((now, spot));
        while self.samples.len() > self.periods {
            self.samples.pop_front();
        }
        self.last_poll = Some(now);
        true
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    fn mean_of<'a>(prices: impl Iterator<Item = &'a (Timestamp, Price)>) -> Option<Price> {
        let mut sum = Decimal::ZERO;
        let mut count = 0u32;
        for (_, p) in prices {
            sum += p.value();
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Price::new(sum / Decimal::from(count))
    }
}

impl PriceOracle for SmaOracle {
    fn get_price(&self) -> Option<Price> {
        Self::mean_of(self.samples.iter())
    }

    // mean over retained samples at or before the timestamp. samples older
    // than the window have been evicted, so a very old timestamp gives None.
    fn price_at(&self, timestamp: Timestamp) -> Option<Price> {
        Self::mean_of(self.samples.iter().filter(|(t, _)| *t <= timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn price(value: Decimal) -> Price {
        Price::new_unchecked(value)
    }

    #[test]
    fn spot_oracle_latest_wins() {
        let mut oracle = SpotOracle::new();
        assert!(oracle.get_price().is_none());

        oracle.set_price(Timestamp::from_millis(0), price(dec!(2000)));
        oracle.set_price(Timestamp::from_millis(1000), price(dec!(2100)));

        assert_eq!(oracle.get_price().unwrap().value(), dec!(2100));
    }

    #[test]
    fn spot_oracle_price_at_boundary() {
        let mut oracle = SpotOracle::new();
        oracle.set_price(Timestamp::from_millis(0), price(dec!(2000)));
        oracle.set_price(Timestamp::from_millis(5_000), price(dec!(2050)));
        oracle.set_price(Timestamp::from_millis(10_000), price(dec!(2100)));

        // boundary between samples takes the latest at-or-before
        let at = oracle.price_at(Timestamp::from_millis(7_000)).unwrap();
        assert_eq!(at.value(), dec!(2050));

        let at = oracle.price_at(Timestamp::from_millis(10_000)).unwrap();
        assert_eq!(at.value(), dec!(2100));

        assert!(oracle.price_at(Timestamp::from_millis(-1)).is_none());
    }

    #[test]
    fn sma_ramps_from_single_sample() {
        let mut sma = SmaOracle::new(4, 1_000);

        sma.poll(Timestamp::from_millis(0), price(dec!(100)));
        assert_eq!(sma.get_price().unwrap().value(), dec!(100));

        sma.poll(Timestamp::from_millis(1_000), price(dec!(104)));
        assert_eq!(sma.get_price().unwrap().value(), dec!(102));

        sma.poll(Timestamp::from_millis(2_000), price(dec!(108)));
        assert_eq!(sma.get_price().unwrap().value(), dec!(104));
    }

    #[test]
    fn sma_evicts_beyond_capacity() {
        let mut sma = SmaOracle::new(3, 1_000);
        for (i, value) in [100, 110, 120, 130].iter().enumerate() {
            sma.poll(
                Timestamp::from_millis(i as i64 * 1_000),
                price(Decimal::from(*value)),
            );
        }

        // the 100 sample fell out; mean of 110, 120, 130
        assert_eq!(sma.sample_count(), 3);
        assert_eq!(sma.get_price().unwrap().value(), dec!(120));
    }

    #[test]
    fn sma_poll_respects_cadence() {
        let mut sma = SmaOracle::new(4, 1_000);

        assert!(sma.poll(Timestamp::from_millis(0), price(dec!(100))));
        assert!(!sma.poll(Timestamp::from_millis(500), price(dec!(999))));
        assert!(sma.poll(Timestamp::from_millis(1_000), price(dec!(200))));

        assert_eq!(sma.sample_count(), 2);
        assert_eq!(sma.get_price().unwrap().value(), dec!(150));
    }

    #[test]
    fn sma_price_at_uses_samples_up_to_time() {
        let mut sma = SmaOracle::new(4, 1_000);
        sma.poll(Timestamp::from_millis(0), price(dec!(100)));
        sma.poll(Timestamp::from_millis(1_000), price(dec!(200)));
        sma.poll(Timestamp::from_millis(2_000), price(dec!(300)));

        let at = sma.price_at(Timestamp::from_millis(1_500)).unwrap();
        assert_eq!(at.value(), dec!(150));

        assert!(sma.price_at(Timestamp::from_millis(-1)).is_none());
    }
}
