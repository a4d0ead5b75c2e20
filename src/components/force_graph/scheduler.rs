//! Rate limiting between simulation steps and redraws.
//!
//! Notifications mark the scheduler dirty; [`RefreshScheduler::poll`] turns
//! the dirty flag into at most one refresh per interval. The first
//! notification after a quiet period fires on the next poll and the last one
//! of a burst fires once the interval has elapsed, so a burst is never lost.

use std::time::Duration;

use log::trace;
use web_time::Instant;

/// One granted refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshTicket {
	/// Strictly increasing, starting at 1.
	pub seq: u64,
	/// Notifications folded into this refresh.
	pub coalesced: u32,
}

/// Leading and trailing edge throttle over refresh requests.
#[derive(Clone, Debug)]
pub struct RefreshScheduler {
	interval: Duration,
	last_fired: Option<Instant>,
	pending: u32,
	seq: u64,
}

impl RefreshScheduler {
	/// At most one refresh per `interval`.
	pub fn new(interval: Duration) -> Self {
		Self {
			interval,
			last_fired: None,
			pending: 0,
			seq: 0,
		}
	}

	/// Something changed and needs drawing.
	pub fn notify(&mut self) {
		self.pending = self.pending.saturating_add(1);
	}

	/// Notifications not yet folded into a refresh.
	pub fn has_pending(&self) -> bool {
		self.pending > 0
	}

	/// Grant a refresh if something is pending and the interval has passed.
	pub fn poll(&mut self, now: Instant) -> Option<RefreshTicket> {
		if self.pending == 0 {
			return None;
		}
		if let Some(last) = self.last_fired {
			let since = now.checked_duration_since(last).unwrap_or(Duration::ZERO);
			if since < self.interval {
				return None;
			}
		}
		Some(self.fire(now))
	}

	/// Grant a refresh for whatever is pending regardless of the interval.
	pub fn flush(&mut self, now: Instant) -> Option<RefreshTicket> {
		(self.pending > 0).then(|| self.fire(now))
	}

	fn fire(&mut self, now: Instant) -> RefreshTicket {
		self.seq += 1;
		let ticket = RefreshTicket {
			seq: self.seq,
			coalesced: self.pending,
		};
		trace!("refresh {} after {} notification(s)", ticket.seq, ticket.coalesced);
		self.pending = 0;
		self.last_fired = Some(now);
		ticket
	}

	/// Refreshes granted so far.
	pub fn refreshes(&self) -> u64 {
		self.seq
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	const INTERVAL: Duration = Duration::from_millis(50);

	fn ms(start: Instant, ms: u64) -> Instant {
		start + Duration::from_millis(ms)
	}

	#[test]
	fn first_notification_fires_immediately() {
		let start = Instant::now();
		let mut scheduler = RefreshScheduler::new(INTERVAL);
		scheduler.notify();
		assert_eq!(
			scheduler.poll(start),
			Some(RefreshTicket {
				seq: 1,
				coalesced: 1
			})
		);
	}

	#[test]
	fn burst_is_coalesced_and_trailing_refresh_fires() {
		let start = Instant::now();
		let mut scheduler = RefreshScheduler::new(INTERVAL);
		scheduler.notify();
		assert!(scheduler.poll(start).is_some());

		// A 60 Hz stream of steps within one interval.
		let mut granted = Vec::new();
		for frame in 1..=3 {
			scheduler.notify();
			granted.extend(scheduler.poll(ms(start, frame * 16)));
		}
		assert!(granted.is_empty());
		assert!(scheduler.has_pending());

		let trailing = scheduler.poll(ms(start, 60)).unwrap();
		assert_eq!(trailing.seq, 2);
		assert_eq!(trailing.coalesced, 3);
		assert!(!scheduler.has_pending());
	}

	#[test]
	fn idle_poll_is_a_no_op() {
		let start = Instant::now();
		let mut scheduler = RefreshScheduler::new(INTERVAL);
		assert_eq!(scheduler.poll(start), None);
		assert_eq!(scheduler.flush(start), None);
		assert_eq!(scheduler.refreshes(), 0);
	}

	#[test]
	fn sequence_numbers_never_go_backwards() {
		let start = Instant::now();
		let mut scheduler = RefreshScheduler::new(INTERVAL);
		let mut seqs = Vec::new();
		for step in 0..40 {
			scheduler.notify();
			if let Some(ticket) = scheduler.poll(ms(start, step * 10)) {
				seqs.push(ticket.seq);
			}
		}
		seqs.extend(scheduler.flush(ms(start, 400)).map(|t| t.seq));
		assert!(seqs.windows(2).all(|w| w[0] < w[1]));
		// Eight capped refreshes over 400ms, then the trailing flush.
		assert_eq!(seqs.len(), 9);
	}

	#[test]
	fn flush_ignores_the_interval() {
		let start = Instant::now();
		let mut scheduler = RefreshScheduler::new(INTERVAL);
		scheduler.notify();
		scheduler.poll(start);
		scheduler.notify();
		assert_eq!(scheduler.poll(ms(start, 1)), None);
		assert_eq!(scheduler.flush(ms(start, 1)).map(|t| t.seq), Some(2));
	}
}
