// src/scheduler.rs
// Frame scheduler: one frame per display refresh until teardown or a fatal error
// RELEVANT FILES: src/viewer/mod.rs, src/renderer.rs, src/compositor/mod.rs

use std::time::{Duration, Instant};

use crate::compositor::FrameStatus;
use crate::error::{RenderError, RenderResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// Rendering a frame on every refresh.
    Running,
    /// A fatal error stopped rendering; the last presented frame stays on screen.
    Halted,
    /// The surface was torn down. Terminal.
    Stopped,
}

/// Frames-per-second counter reporting once per second.
pub struct FpsCounter {
    frames: u32,
    last_report: Instant,
    current_fps: f32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            frames: 0,
            last_report: Instant::now(),
            current_fps: 0.0,
        }
    }

    pub fn tick(&mut self) -> Option<f32> {
        self.frames += 1;
        let elapsed = self.last_report.elapsed();
        if elapsed >= Duration::from_secs(1) {
            self.current_fps = self.frames as f32 / elapsed.as_secs_f32();
            self.frames = 0;
            self.last_report = Instant::now();
            Some(self.current_fps)
        } else {
            None
        }
    }

    pub fn fps(&self) -> f32 {
        self.current_fps
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

pub struct FrameScheduler {
    state: SchedulerState,
    halted: Option<RenderError>,
    fps: FpsCounter,
    presented: u64,
    skipped: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Running,
            halted: None,
            fps: FpsCounter::new(),
            presented: 0,
            skipped: 0,
        }
    }

    /// Run one frame through `render`. Returns whether the caller should
    /// request another refresh.
    ///
    /// Does nothing once halted or stopped. A fatal error halts the scheduler
    /// and is kept for [`FrameScheduler::halted_error`]; other errors are
    /// logged and the cadence continues.
    pub fn tick<F>(&mut self, render: F) -> bool
    where
        F: FnOnce() -> RenderResult<FrameStatus>,
    {
        if self.state != SchedulerState::Running {
            return false;
        }
        match render() {
            Ok(FrameStatus::Presented) => {
                self.presented += 1;
                if let Some(fps) = self.fps.tick() {
                    log::debug!("{fps:.1} fps ({} frames, {} skipped)", self.presented, self.skipped);
                }
                true
            }
            Ok(FrameStatus::Skipped) => {
                self.skipped += 1;
                true
            }
            Err(err) if err.is_fatal() => {
                log::error!("[{}] rendering halted: {err}", err.category());
                self.state = SchedulerState::Halted;
                self.halted = Some(err);
                false
            }
            Err(err) => {
                log::warn!("[{}] frame failed: {err}", err.category());
                true
            }
        }
    }

    /// Stop for good. Later ticks never call their closure.
    pub fn teardown(&mut self) {
        if self.state != SchedulerState::Stopped {
            log::info!("frame scheduler stopped after {} frames", self.presented);
        }
        self.state = SchedulerState::Stopped;
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn halted_error(&self) -> Option<&RenderError> {
        self.halted.as_ref()
    }

    pub fn take_halted_error(&mut self) -> Option<RenderError> {
        self.halted.take()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn fps(&self) -> f32 {
        self.fps.fps()
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}
