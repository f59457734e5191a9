use std::time::{Duration, Instant};

use crate::foundation::error::{MapError, MapResult};
use crate::render::backend::{RenderStatus, RendererEvent};

/// Lifecycle of one section capture.
///
/// `Idle -> Moving -> Settling -> FrameValid -> Capturing -> Done`. Renderer signals advance the
/// two waiting phases; the scheduler drives the rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionPhase {
    Idle,
    /// Camera move issued, waiting for move-end.
    Moving,
    /// Move settled, waiting for a fully loaded idle frame.
    Settling,
    FrameValid,
    Capturing,
    Done,
}

impl SectionPhase {
    /// Name of the signal this phase waits for.
    pub fn awaiting(self) -> &'static str {
        match self {
            Self::Moving => "move-settled",
            Self::Settling => "frame-valid",
            Self::Idle => "move",
            Self::FrameValid => "capture",
            Self::Capturing => "drain",
            Self::Done => "nothing",
        }
    }
}

#[derive(Clone, Debug)]
pub struct SectionMachine {
    section: usize,
    phase: SectionPhase,
}

impl SectionMachine {
    pub fn new(section: usize) -> Self {
        Self {
            section,
            phase: SectionPhase::Idle,
        }
    }

    pub fn section(&self) -> usize {
        self.section
    }

    pub fn phase(&self) -> SectionPhase {
        self.phase
    }

    fn advance(&mut self, from: SectionPhase, to: SectionPhase) -> MapResult<()> {
        if self.phase != from {
            return Err(MapError::renderer(format!(
                "section {}: cannot go from {:?} to {:?}",
                self.section, self.phase, to
            )));
        }
        tracing::debug!(section = self.section, ?from, ?to, "section phase");
        self.phase = to;
        Ok(())
    }

    pub fn begin_move(&mut self) -> MapResult<()> {
        self.advance(SectionPhase::Idle, SectionPhase::Moving)
    }

    /// Feed a renderer signal with the status observed right after it.
    ///
    /// A frame only counts as valid once nothing animates, everything is loaded and no capture
    /// is already under way.
    pub fn on_event(&mut self, event: RendererEvent, status: RenderStatus) -> MapResult<()> {
        match (self.phase, event) {
            (SectionPhase::Moving, RendererEvent::MoveEnd) => {
                self.advance(SectionPhase::Moving, SectionPhase::Settling)
            }
            (SectionPhase::Settling, RendererEvent::Render)
                if !status.animating && status.loaded =>
            {
                self.advance(SectionPhase::Settling, SectionPhase::FrameValid)
            }
            _ => Ok(()),
        }
    }

    pub fn begin_capture(&mut self) -> MapResult<()> {
        self.advance(SectionPhase::FrameValid, SectionPhase::Capturing)
    }

    pub fn finish(&mut self) -> MapResult<()> {
        self.advance(SectionPhase::Capturing, SectionPhase::Done)
    }
}

/// Deadline for one waiting phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseTimer {
    started: Instant,
    budget: Duration,
}

impl PhaseTimer {
    pub fn start(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left, or `None` once the budget is spent.
    pub fn remaining(&self) -> Option<Duration> {
        self.budget
            .checked_sub(self.elapsed())
            .filter(|d| !d.is_zero())
    }
}
