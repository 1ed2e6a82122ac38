//! Loop points and fine-adjust mode for PlaybackEngine

use super::core::PlaybackEngine;
use crate::error::{Error, Result};
use crate::playback::state::{AdjustTarget, PlaybackState};
use loopr_common::human_time::format_seconds;
use tracing::{debug, info};

/// Which loop point a marker command addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Point {
    A,
    B,
}

impl Point {
    fn name(self) -> &'static str {
        match self {
            Point::A => "A",
            Point::B => "B",
        }
    }
}

/// What a marker command changed, reported once the locks are released
#[derive(Debug, Clone, Copy)]
enum MarkerChange {
    Marked { point: Point, at: f64, cleared_other: bool },
    Cleared(Point),
}

impl PlaybackEngine {
    /// Mark A at the current position.
    pub fn set_loop_a(&self) -> Result<()> {
        self.apply_marker(Point::A, |engine, point| engine.mark_locked(point))
    }

    /// Mark B at the current position.
    pub fn set_loop_b(&self) -> Result<()> {
        self.apply_marker(Point::B, |engine, point| engine.mark_locked(point))
    }

    pub fn clear_loop_a(&self) -> Result<()> {
        self.apply_marker(Point::A, |engine, point| engine.unmark_locked(point))
    }

    pub fn clear_loop_b(&self) -> Result<()> {
        self.apply_marker(Point::B, |engine, point| engine.unmark_locked(point))
    }

    /// Mark A if unset, clear it otherwise.
    pub fn toggle_loop_a(&self) -> Result<()> {
        self.apply_marker(Point::A, Self::toggle_locked)
    }

    /// Mark B if unset, clear it otherwise.
    pub fn toggle_loop_b(&self) -> Result<()> {
        self.apply_marker(Point::B, Self::toggle_locked)
    }

    /// Run `change` under the control lock, then log and announce its result.
    fn apply_marker(
        &self,
        point: Point,
        change: impl FnOnce(&Self, Point) -> Result<MarkerChange>,
    ) -> Result<()> {
        let result = {
            let _control = self.control();
            change(self, point)
        };

        match &result {
            Ok(MarkerChange::Marked {
                point,
                at,
                cleared_other,
            }) => {
                info!("Loop point {} set at {:.3}s", point.name(), at);
                if *cleared_other {
                    debug!("Opposite loop point cleared to keep A <= B");
                }
                self.shared
                    .info(format!("Punto {}: {}", point.name(), format_seconds(*at, 1)));
            }
            Ok(MarkerChange::Cleared(point)) => {
                info!("Loop point {} cleared", point.name());
                self.shared.info(format!("Punto {} desmarcado", point.name()));
            }
            Err(_) => {}
        }
        self.report(result).map(|_| ())
    }

    fn toggle_locked(&self, point: Point) -> Result<MarkerChange> {
        let marked = {
            let s = self.shared.session();
            match point {
                Point::A => s.region.a().is_some(),
                Point::B => s.region.b().is_some(),
            }
        };
        if marked {
            self.unmark_locked(point)
        } else {
            self.mark_locked(point)
        }
    }

    fn mark_locked(&self, point: Point) -> Result<MarkerChange> {
        let mut s = self.shared.session();
        Self::require_track(&s)?;
        let at = s.position;
        let cleared_other = match point {
            Point::A => s.region.set_a(at),
            Point::B => s.region.set_b(at),
        };
        Ok(MarkerChange::Marked {
            point,
            at,
            cleared_other,
        })
    }

    fn unmark_locked(&self, point: Point) -> Result<MarkerChange> {
        let mut s = self.shared.session();
        Self::require_track(&s)?;
        match point {
            Point::A => s.region.clear_a(),
            Point::B => s.region.clear_b(),
        }
        Ok(MarkerChange::Cleared(point))
    }

    /// Enter fine-adjust mode for `target`.
    ///
    /// A and B must already be marked; playback is paused while adjusting.
    /// Position can only be adjusted while paused.
    pub fn start_adjust(&self, target: AdjustTarget) -> Result<()> {
        let result = {
            let _control = self.control();
            self.start_adjust_locked(target)
        };
        if result.is_ok() {
            let label = match target {
                AdjustTarget::Position => "Ajustando posición".to_string(),
                point => format!("Ajustando punto {}", point.label()),
            };
            self.shared.info(label);
        }
        self.report(result)
    }

    fn start_adjust_locked(&self, target: AdjustTarget) -> Result<()> {
        let state = {
            let s = self.shared.session();
            Self::require_track(&s)?;
            match target {
                AdjustTarget::A if s.region.a().is_none() => {
                    return Err(Error::InvalidState("Primero marca el punto A".to_string()));
                }
                AdjustTarget::B if s.region.b().is_none() => {
                    return Err(Error::InvalidState("Primero marca el punto B".to_string()));
                }
                AdjustTarget::Position if s.state != PlaybackState::Paused => {
                    return Err(Error::InvalidState(
                        "Position can only be adjusted while paused".to_string(),
                    ));
                }
                _ => {}
            }
            s.state
        };

        if state == PlaybackState::Playing {
            self.pause_locked()?;
        }
        self.shared.session().adjust = Some(target);
        info!("Fine-adjust started for {:?}", target);
        Ok(())
    }

    /// Move the adjust target by `delta` seconds.
    ///
    /// A stays within `[0, min(B, duration)]`, B within `[A, duration]`, the
    /// position within `[0, duration]`.
    pub fn adjust_by(&self, delta: f64) -> Result<()> {
        let result = {
            let _control = self.control();
            let mut s = self.shared.session();
            let target = match (Self::require_track(&s), s.adjust) {
                (Err(e), _) => Err(e),
                (Ok(()), None) => Err(Error::InvalidState("Not in adjust mode".to_string())),
                (Ok(()), Some(target)) => Ok(target),
            };
            target.map(|target| {
                let duration = s.duration();
                let value = match target {
                    AdjustTarget::A => s.region.nudge_a(delta, duration),
                    AdjustTarget::B => s.region.nudge_b(delta, duration),
                    AdjustTarget::Position => {
                        let moved = s.position + delta;
                        s.set_position(moved);
                        Some(s.position)
                    }
                };
                (target, value)
            })
        };

        if let Ok((target, Some(value))) = &result {
            debug!("{:?} adjusted to {:.3}s", target, value);
            let name = match target {
                AdjustTarget::Position => "Posición",
                point => point.label(),
            };
            self.shared
                .info(format!("{}: {}", name, format_seconds(*value, 3)));
        }
        self.report(result).map(|_| ())
    }

    /// Leave fine-adjust mode, resuming playback unless the position was
    /// being adjusted.
    pub fn finish_adjust(&self) -> Result<()> {
        let result = {
            let _control = self.control();
            let target = {
                let mut s = self.shared.session();
                match (Self::require_track(&s), s.adjust.take()) {
                    (Err(e), _) => Err(e),
                    (Ok(()), None) => Err(Error::InvalidState("Not in adjust mode".to_string())),
                    (Ok(()), Some(target)) => Ok(target),
                }
            };
            target.and_then(|target| {
                info!("Fine-adjust finished for {:?}", target);
                self.shared.info("Ajuste finalizado");
                if target == AdjustTarget::Position {
                    Ok(())
                } else {
                    self.resume_locked()
                }
            })
        };
        self.report(result)
    }

    /// Current fine-adjust target, if any
    pub fn adjust_target(&self) -> Option<AdjustTarget> {
        self.shared.session().adjust
    }
}
