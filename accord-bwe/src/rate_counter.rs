//! Rate counter storing contributions in one-millisecond buckets.

/// One bucket: number of contributions and their accumulated value.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBucket {
    pub count: u64,
    pub value: u64,
}

/// Sliding-window rate measurement over a circular bucket buffer.
///
/// `rate()` scales the windowed total by `scale / active_window_ms`; with the
/// default scale of 8000 a byte count becomes bits per second.
#[derive(Debug, Clone)]
pub struct RateCounter {
    scale: u64,
    window_size: usize,
    buckets: Vec<RateBucket>,
    origin_index: usize,
    origin_ms: Option<i64>,
    total: RateBucket,
}

impl RateCounter {
    pub fn new(window_size: usize, scale: u64) -> Self {
        Self {
            scale,
            window_size,
            buckets: vec![RateBucket::default(); window_size],
            origin_index: 0,
            origin_ms: None,
            total: RateBucket::default(),
        }
    }

    /// Records `value` at `now_ms`.
    pub fn add(&mut self, value: u64, now_ms: i64) {
        match self.origin_ms {
            None => self.origin_ms = Some(now_ms),
            Some(_) => self.erase_old(now_ms),
        }

        let origin_ms = self.origin_ms.unwrap();
        let index = (self.origin_index as i64 + now_ms - origin_ms)
            .rem_euclid(self.window_size as i64) as usize;
        self.buckets[index].count += 1;
        self.buckets[index].value += value;
        self.total.count += 1;
        self.total.value += value;
    }

    /// Scaled rate over the active window, or `None` before any sample or
    /// while the window spans at most one millisecond.
    pub fn rate(&mut self, now_ms: i64) -> Option<u64> {
        self.origin_ms?;
        self.erase_old(now_ms);
        let active_window_size = now_ms - self.origin_ms.unwrap() + 1;
        if self.total.count > 0 && active_window_size > 1 {
            let rate =
                self.scale as f64 * self.total.value as f64 / active_window_size as f64;
            Some(rate.round() as u64)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.buckets = vec![RateBucket::default(); self.window_size];
        self.origin_index = 0;
        self.origin_ms = None;
        self.total = RateBucket::default();
    }

    /// Advances the origin, subtracting expired buckets from the total.
    fn erase_old(&mut self, now_ms: i64) {
        let Some(origin_ms) = self.origin_ms.as_mut() else {
            return;
        };
        let new_origin_ms = now_ms - self.window_size as i64 + 1;
        while *origin_ms < new_origin_ms {
            let bucket = &mut self.buckets[self.origin_index];
            self.total.count -= bucket.count;
            self.total.value -= bucket.value;
            bucket.count = 0;
            bucket.value = 0;

            self.origin_index = (self.origin_index + 1) % self.window_size;
            *origin_ms += 1;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn bucket(count: u64, value: u64) -> RateBucket {
        RateBucket { count, value }
    }

    #[test]
    fn test_constructor() {
        let mut counter = RateCounter::new(10, 8000);
        assert_eq!(counter.buckets, vec![RateBucket::default(); 10]);
        assert_eq!(counter.origin_index, 0);
        assert_eq!(counter.origin_ms, None);
        assert_eq!(counter.total, RateBucket::default());
        assert_eq!(counter.rate(0), None);
    }

    #[test]
    fn test_add() {
        let mut counter = RateCounter::new(10, 8000);

        counter.add(500, 123);
        assert_eq!(counter.buckets[0], bucket(1, 500));
        assert_eq!(counter.origin_index, 0);
        assert_eq!(counter.origin_ms, Some(123));
        assert_eq!(counter.total, bucket(1, 500));
        assert_eq!(counter.rate(123), None);

        counter.add(501, 123);
        assert_eq!(counter.buckets[0], bucket(2, 1001));
        assert_eq!(counter.total, bucket(2, 1001));
        assert_eq!(counter.rate(123), None);

        counter.add(502, 125);
        assert_eq!(counter.buckets[0], bucket(2, 1001));
        assert_eq!(counter.buckets[2], bucket(1, 502));
        assert_eq!(counter.total, bucket(3, 1503));
        assert_eq!(counter.rate(125), Some(4_008_000));

        counter.add(503, 128);
        assert_eq!(counter.buckets[5], bucket(1, 503));
        assert_eq!(counter.total, bucket(4, 2006));
        assert_eq!(counter.rate(128), Some(2_674_667));

        counter.add(504, 132);
        assert_eq!(counter.buckets[9], bucket(1, 504));
        assert_eq!(counter.origin_index, 0);
        assert_eq!(counter.origin_ms, Some(123));
        assert_eq!(counter.total, bucket(5, 2510));
        assert_eq!(counter.rate(132), Some(2_008_000));

        // the window overflows: the origin advances and old buckets drop out
        counter.add(505, 134);
        assert_eq!(counter.buckets[0], RateBucket::default());
        assert_eq!(counter.buckets[1], bucket(1, 505));
        assert_eq!(counter.origin_index, 2);
        assert_eq!(counter.origin_ms, Some(125));
        assert_eq!(counter.total, bucket(4, 2014));
        assert_eq!(counter.rate(134), Some(1_611_200));

        counter.add(506, 135);
        assert_eq!(counter.buckets[2], bucket(1, 506));
        assert_eq!(counter.origin_index, 3);
        assert_eq!(counter.origin_ms, Some(126));
        assert_eq!(counter.total, bucket(4, 2018));
        assert_eq!(counter.rate(135), Some(1_614_400));
    }

    #[test]
    fn test_reset() {
        let mut counter = RateCounter::new(10, 8000);
        counter.add(500, 1);
        counter.add(500, 3);
        assert!(counter.rate(3).is_some());

        counter.reset();
        assert_eq!(counter.origin_ms, None);
        assert_eq!(counter.total, RateBucket::default());
        assert_eq!(counter.rate(3), None);
    }
}
