//! Validity intervals over the tick domain.
//!
//! Every snapshot and transform handed out by a source comes with the
//! closed range of ticks over which it stays unchanged.

use std::fmt;

use crate::util::Tick;

/// Closed tick interval `[start, end]` with `start <= end`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidityInterval {
    start: Tick,
    end: Tick,
}

impl ValidityInterval {
    /// Interval covering the whole time domain.
    pub const FOREVER: Self = Self {
        start: Tick::MIN,
        end: Tick::MAX,
    };

    /// Create an interval. The bounds are swapped if given in reverse.
    pub fn new(start: Tick, end: Tick) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// Single-instant interval `[t, t]`.
    #[inline]
    pub const fn instant(t: Tick) -> Self {
        Self { start: t, end: t }
    }

    #[inline]
    pub fn start(&self) -> Tick {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Tick {
        self.end
    }

    /// Check if the tick lies inside the interval (bounds included).
    #[inline]
    pub fn contains(&self, t: Tick) -> bool {
        self.start <= t && t <= self.end
    }

    /// Check if this interval covers a single tick.
    #[inline]
    pub fn is_instant(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn is_forever(&self) -> bool {
        *self == Self::FOREVER
    }

    /// Intersection of two intervals.
    ///
    /// Disjoint intervals have no common ticks; the result then collapses
    /// to the instant at `self.start`, the only value this interval can
    /// still vouch for.
    pub fn intersect(&self, other: &Self) -> Self {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start <= end {
            Self { start, end }
        } else {
            Self::instant(self.start)
        }
    }

    /// Number of ticks spanned, saturating for open-ended intervals.
    pub fn duration(&self) -> Tick {
        self.end.saturating_sub(self.start)
    }
}

impl Default for ValidityInterval {
    fn default() -> Self {
        Self::FOREVER
    }
}

impl fmt::Debug for ValidityInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidityInterval({})", self)
    }
}

impl fmt::Display for ValidityInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |t: Tick| match t {
            Tick::MIN => "-inf".to_string(),
            Tick::MAX => "+inf".to_string(),
            t => t.to_string(),
        };
        write!(f, "[{}, {}]", bound(self.start), bound(self.end))
    }
}
