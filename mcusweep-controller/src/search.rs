//! Resumable brute-force sweep over the send-command value space

use std::time::Instant;

use mcusweep_proto::Frame;

use crate::config::SweepConfig;
use crate::error::{hex, SweepError};
use crate::link::{round_trip, Connection};
use crate::store::ProgressStore;

/// Position of the sweep and the reference it compares against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchState {
    pub current_value: u32,
    pub baseline: Vec<u8>,
}

/// How a sweep ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The response to `value` differed from the baseline
    Halted { value: u32, baseline: Vec<u8>, response: Vec<u8>, attempts: u64 },
    /// Every value up to the bound was tried without a change
    Exhausted { upper_bound: u32, attempts: u64 },
}

enum Step {
    Continue,
    Halt(Vec<u8>),
}

/// Drives the sweep one write/read round-trip at a time
///
/// The value about to be sent is persisted before it goes out, so after a
/// crash the process resumes at the in-flight value instead of skipping it.
pub struct SearchController<'a, S: ProgressStore> {
    config: &'a SweepConfig,
    store: &'a mut S,
    state: SearchState,
    attempts: u64,
}

impl<'a, S: ProgressStore> SearchController<'a, S> {
    /// Start at the configured value, or further along if progress was persisted
    pub fn resume(
        config: &'a SweepConfig,
        store: &'a mut S,
        baseline: Vec<u8>,
    ) -> Result<Self, SweepError> {
        config.validate()?;
        let mut current_value = config.start_value;
        if let Some(stored) = store.load_search_value()? {
            tracing::info!(stored, "found persisted search value");
            if stored > current_value {
                current_value = stored;
            }
        }

        Ok(Self {
            config,
            store,
            state: SearchState { current_value, baseline },
            attempts: 0,
        })
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Round-trips performed so far
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub async fn run<C: Connection>(&mut self, conn: &mut C) -> Result<SearchOutcome, SweepError> {
        let upper_bound = self.config.search_upper_bound;
        if self.state.current_value > upper_bound {
            tracing::info!(
                value = self.state.current_value,
                upper_bound,
                "persisted value is past the upper bound, nothing left to try"
            );
            return Ok(SearchOutcome::Exhausted { upper_bound, attempts: 0 });
        }

        tracing::info!(
            from = self.state.current_value,
            to = upper_bound,
            delay_ms = self.config.attempt_delay.as_millis() as u64,
            "starting sweep"
        );
        let started = Instant::now();

        loop {
            let value = self.state.current_value;
            match self.step(conn).await? {
                Step::Halt(response) => {
                    tracing::info!(
                        value,
                        baseline = %hex(&self.state.baseline),
                        response = %hex(&response),
                        "device state changed, halting sweep"
                    );
                    return Ok(SearchOutcome::Halted {
                        value,
                        baseline: self.state.baseline.clone(),
                        response,
                        attempts: self.attempts,
                    });
                }
                Step::Continue if value >= upper_bound => {
                    tracing::info!(upper_bound, attempts = self.attempts, "sweep exhausted without a state change");
                    return Ok(SearchOutcome::Exhausted { upper_bound, attempts: self.attempts });
                }
                Step::Continue => {}
            }

            self.report_progress(started);
            self.state.current_value = value + 1;
            if !self.config.attempt_delay.is_zero() {
                tokio::time::sleep(self.config.attempt_delay).await;
            }
        }
    }

    async fn step<C: Connection>(&mut self, conn: &mut C) -> Result<Step, SweepError> {
        let value = self.state.current_value;
        let frame = Frame::send_value(value).to_bytes().map_err(SweepError::Encode)?;
        if frame.len() > self.config.mtu_limit {
            return Err(SweepError::FrameTooLarge { len: frame.len(), mtu: self.config.mtu_limit });
        }

        self.store.save_search_value(value)?;

        let response = round_trip(conn, &frame).await?;
        self.attempts += 1;
        tracing::debug!(
            value,
            upper_bound = self.config.search_upper_bound,
            input = %hex(&frame),
            read = %hex(&response),
            "attempt"
        );

        if response == self.state.baseline {
            Ok(Step::Continue)
        } else {
            Ok(Step::Halt(response))
        }
    }

    fn report_progress(&self, started: Instant) {
        let every = u64::from(self.config.progress_every.max(1));
        if self.attempts % every != 0 {
            return;
        }
        let elapsed = started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 { self.attempts as f64 / elapsed } else { 0.0 };
        tracing::info!(
            value = self.state.current_value,
            upper_bound = self.config.search_upper_bound,
            attempts = self.attempts,
            rate = %format!("{rate:.1}/s"),
            "sweep progress"
        );
    }
}
