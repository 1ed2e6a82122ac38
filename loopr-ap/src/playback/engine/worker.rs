//! Playback worker thread
//!
//! One worker runs per play/resume cycle. It repeatedly plans a section
//! (`[A, B)` when both loop points are set, otherwise the whole track),
//! submits it to the sink and tracks position from a monotonic clock until
//! the sink drains or a signal arrives.
//!
//! A worker belongs to one cancellation epoch. Once the session epoch moves
//! on, the worker exits at its next wake-up without touching session state.
//! Retirement is keyed on the worker's own id, so a thread still finishing
//! up never clears the marker of a successor started in the same epoch.

use super::core::Shared;
use crate::audio::types::SinkBuffer;
use crate::error::Error;
use crate::playback::clock::PlaybackClock;
use crate::playback::state::{LiveWorker, PlaybackState, Session};
use loopr_common::events::StatusEvent;
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How a section (or a pause inside it) ended
#[derive(Debug)]
enum SectionOutcome {
    /// Loop section drained; play it again
    Looped,
    /// Whole-track section drained; playback is over
    Finished,
    /// Pause released or tempo changed; re-plan from the current position
    Replan,
    /// Epoch advanced by stop/load
    Cancelled,
    /// Nobody resumed within the pause-wait timeout
    PauseTimedOut,
    Failed(Error),
}

/// What to submit for one section
struct SectionPlan {
    buffer: SinkBuffer,
    /// Start offset on the original timeline
    origin: f64,
    /// End offset on the original timeline
    end: f64,
    /// Stretched length / original length
    ratio: f64,
    looping: bool,
    generation: u64,
}

impl SectionPlan {
    /// Plan the next section from the session, moving `position` to its
    /// start unless it already lies strictly inside.
    fn from_session(s: &mut Session) -> Option<Self> {
        let track = s.track.as_ref()?;
        let duration = track.duration_seconds();
        let (start, end, looping) = match s.region.both() {
            Some((a, b)) => (a.min(duration), b.min(duration), true),
            None => (0.0, duration, false),
        };

        let origin = if s.position > start && s.position < end {
            s.position
        } else {
            start
        };

        let (samples, ratio) = match s.active_stretch() {
            Some(stretch) => {
                let ratio = stretch.samples.len() as f64 / track.samples().len().max(1) as f64;
                (Arc::clone(&stretch.samples), ratio)
            }
            None => (Arc::clone(track.samples()), 1.0),
        };

        let channels = track.channels();
        let sample_rate = track.sample_rate();
        let total_frames = samples.len() / channels as usize;
        let to_frame =
            |t: f64| ((t * ratio * sample_rate as f64).floor() as usize).min(total_frames);

        let plan = SectionPlan {
            buffer: SinkBuffer {
                start_frame: to_frame(origin),
                end_frame: to_frame(end),
                samples,
                sample_rate,
                channels,
            },
            origin,
            end,
            ratio,
            looping,
            generation: s.tempo_generation,
        };
        s.set_position(origin);
        Some(plan)
    }
}

/// Clears the live-worker marker however the worker exits.
struct ExitGuard<'a> {
    shared: &'a Shared,
    me: LiveWorker,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        retire(&mut self.shared.session(), self.me);
        self.shared.signal.notify_all();
    }
}

fn retire(s: &mut Session, me: LiveWorker) {
    if s.live_worker == Some(me) {
        s.live_worker = None;
    }
}

/// Worker thread entry point
pub(super) fn run(shared: Arc<Shared>, me: LiveWorker) {
    let _guard = ExitGuard {
        shared: &shared,
        me,
    };
    debug!("Playback worker {} running (epoch {})", me.id, me.epoch);

    loop {
        match play_section(&shared, me) {
            SectionOutcome::Looped | SectionOutcome::Replan => continue,
            SectionOutcome::Finished => {
                info!("Playback reached end of track");
                shared.info("Fin");
                shared.info("Detenido");
                break;
            }
            SectionOutcome::Cancelled => {
                debug!("Playback worker {} cancelled", me.id);
                break;
            }
            SectionOutcome::PauseTimedOut => {
                info!(
                    "Playback worker {} exiting after {:?} paused",
                    me.id,
                    shared.config.pause_wait_timeout()
                );
                break;
            }
            SectionOutcome::Failed(e) => {
                error!("Playback failed: {}", e);
                shared.notify(StatusEvent::error(e.to_string()));
                break;
            }
        }
    }
    debug!("Playback worker {} exiting", me.id);
}

fn play_section(shared: &Shared, me: LiveWorker) -> SectionOutcome {
    let plan = {
        let mut sink = shared.sink();
        let mut s = shared.session();
        if s.epoch != me.epoch {
            return SectionOutcome::Cancelled;
        }
        if s.pause_requested {
            drop(s);
            drop(sink);
            return hold_paused(shared, me);
        }
        let Some(plan) = SectionPlan::from_session(&mut s) else {
            return fail(s, me, Error::NoTrackLoaded);
        };
        drop(s);

        debug!(
            "Submitting section {:.3}s..{:.3}s (frames {}..{}, ratio {:.3}, loop={})",
            plan.origin,
            plan.end,
            plan.buffer.start_frame,
            plan.buffer.end_frame,
            plan.ratio,
            plan.looping
        );
        if let Err(e) = sink.start(plan.buffer.clone()) {
            drop(sink);
            return fail(shared.session(), me, e);
        }
        plan
    };

    let clock = PlaybackClock::start(plan.origin, plan.ratio);
    let deadline = plan.buffer.duration() + shared.config.section_safety_margin();
    let poll = shared.config.poll_interval();

    loop {
        let (mut s, _) = shared
            .signal
            .wait_timeout(shared.session(), poll)
            .unwrap_or_else(PoisonError::into_inner);

        if s.epoch != me.epoch {
            return SectionOutcome::Cancelled;
        }
        if s.pause_requested {
            drop(s);
            return hold_paused(shared, me);
        }
        s.set_position(clock.position().min(plan.end));
        if s.tempo_generation != plan.generation {
            debug!("Tempo changed at {:.3}s, re-planning", s.position);
            return SectionOutcome::Replan;
        }
        drop(s);

        let mut drained = {
            let mut sink = shared.sink();
            if sink.has_error() {
                let _ = sink.stop();
                let error = Error::Sink(format!("device '{}' failed during playback", sink.name()));
                drop(sink);
                return fail(shared.session(), me, error);
            }
            !sink.is_active()
        };

        if !drained && clock.elapsed() > deadline {
            warn!("Section did not finish within {:?}, aborting it", deadline);
            let _ = shared.sink().stop();
            drained = true;
        }

        if drained {
            // the sink may have been stopped by a signal not seen yet
            let mut s = shared.session();
            if s.epoch != me.epoch || s.pause_requested || s.tempo_generation != plan.generation {
                continue;
            }
            if plan.looping {
                return SectionOutcome::Looped;
            }
            s.state = PlaybackState::Stopped;
            s.position = 0.0;
            retire(&mut s, me);
            return SectionOutcome::Finished;
        }
    }
}

/// Stop the sink and wait for resume, stop or the pause-wait timeout.
fn hold_paused(shared: &Shared, me: LiveWorker) -> SectionOutcome {
    if let Err(e) = shared.sink().stop() {
        warn!("Failed to stop sink on pause: {}", e);
    }

    let timeout: Duration = shared.config.pause_wait_timeout();
    let (mut s, _) = shared
        .signal
        .wait_timeout_while(shared.session(), timeout, |s| {
            s.epoch == me.epoch && s.pause_requested
        })
        .unwrap_or_else(PoisonError::into_inner);

    if s.epoch != me.epoch {
        return SectionOutcome::Cancelled;
    }
    if s.pause_requested {
        // state stays Paused; a later resume starts a new worker
        retire(&mut s, me);
        return SectionOutcome::PauseTimedOut;
    }
    SectionOutcome::Replan
}

/// Move to Stopped after a failure, unless the epoch already moved on.
fn fail(mut s: MutexGuard<'_, Session>, me: LiveWorker, error: Error) -> SectionOutcome {
    if s.epoch != me.epoch {
        return SectionOutcome::Cancelled;
    }
    s.state = PlaybackState::Stopped;
    s.position = 0.0;
    s.pause_requested = false;
    retire(&mut s, me);
    SectionOutcome::Failed(error)
}
