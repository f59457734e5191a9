use std::time::Duration;

use crate::capture::state::{PhaseTimer, SectionMachine, SectionPhase};
use crate::encode::sink::{EncoderConfig, ImageEncoder};
use crate::foundation::core::PixelSize;
use crate::foundation::error::{MapError, MapResult};
use crate::plan::sections::{Section, SectionPlan};
use crate::render::backend::{MapBackend, RenderTarget, RowOrder};
use crate::stream::PixelSource;
use crate::stream::limit::RowLimiter;

/// Timing and layout knobs for a capture run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptureOpts {
    /// Device pixels per CSS pixel, forwarded to every resize.
    pub pixel_ratio: f64,
    /// Longest wait for move-end after a camera move.
    pub settle_timeout: Duration,
    /// Longest wait for a valid frame after the move settled.
    pub frame_timeout: Duration,
}

impl Default for CaptureOpts {
    fn default() -> Self {
        Self {
            pixel_ratio: 2.0,
            settle_timeout: Duration::from_secs(30),
            frame_timeout: Duration::from_secs(30),
        }
    }
}

struct ActiveSection {
    machine: SectionMachine,
    target: Option<RenderTarget>,
    stream: RowLimiter<Box<dyn PixelSource>>,
    shape: PixelSize,
}

impl ActiveSection {
    /// Fails once the capture has delivered more than the section holds, or ended short of it.
    fn check_len(&self, ended: bool) -> MapResult<()> {
        let expected = self.shape.byte_len();
        let got = self.stream.emitted();
        if got > expected || (ended && got < expected) {
            return Err(MapError::encoding(format!(
                "section {} capture delivered {got} bytes, expected {expected} for {}x{}",
                self.machine.section(),
                self.shape.width,
                self.shape.height
            )));
        }
        Ok(())
    }
}

/// Captures planned sections one at a time and exposes them as one concatenated stream.
///
/// Pulling from the scheduler drains the current section; only once it is exhausted is its
/// render target released and the next section resized, moved and captured. Output bytes are
/// therefore in plan order, each section contiguous and top-to-bottom.
///
/// Dropping the scheduler mid-stream releases the bound target and abandons remaining sections.
pub struct CaptureScheduler<'a, B: MapBackend + ?Sized> {
    backend: &'a mut B,
    plan: &'a SectionPlan,
    opts: CaptureOpts,
    next: usize,
    active: Option<ActiveSection>,
    completed: usize,
}

impl<'a, B: MapBackend + ?Sized> CaptureScheduler<'a, B> {
    pub fn new(backend: &'a mut B, plan: &'a SectionPlan, opts: CaptureOpts) -> Self {
        Self {
            backend,
            plan,
            opts,
            next: 0,
            active: None,
            completed: 0,
        }
    }

    /// Sections fully drained so far.
    pub fn completed(&self) -> usize {
        self.completed
    }

    fn open(&mut self, section: &Section) -> MapResult<ActiveSection> {
        tracing::info!(
            section = section.index + 1,
            of = self.plan.len(),
            height = section.shape.height,
            "capturing section"
        );
        let mut machine = SectionMachine::new(section.index);
        let target = self.backend.create_target(section.shape)?;
        match self.prepare(section, &mut machine, &target) {
            Ok(stream) => Ok(ActiveSection {
                machine,
                target: Some(target),
                stream,
                shape: section.shape,
            }),
            Err(e) => {
                self.release_quietly(target);
                Err(e)
            }
        }
    }

    fn prepare(
        &mut self,
        section: &Section,
        machine: &mut SectionMachine,
        target: &RenderTarget,
    ) -> MapResult<RowLimiter<Box<dyn PixelSource>>> {
        self.backend.resize(section.shape, self.opts.pixel_ratio)?;
        machine.begin_move()?;
        self.backend.jump_to(&section.camera)?;
        self.wait(machine, SectionPhase::Settling, self.opts.settle_timeout)?;
        self.wait(machine, SectionPhase::FrameValid, self.opts.frame_timeout)?;

        machine.begin_capture()?;
        let flip_y = self.backend.native_row_order() == RowOrder::BottomUp;
        let raw = self.backend.capture(target, flip_y)?;
        RowLimiter::new(raw, section.shape.row_stride())
    }

    fn wait(
        &mut self,
        machine: &mut SectionMachine,
        goal: SectionPhase,
        budget: Duration,
    ) -> MapResult<()> {
        let awaiting = machine.phase().awaiting();
        let timer = PhaseTimer::start(budget);
        while machine.phase() != goal {
            let timeout = || MapError::capture_timeout(awaiting, machine.section(), timer.elapsed());
            let Some(remaining) = timer.remaining() else {
                return Err(timeout());
            };
            let Some(event) = self.backend.next_event(remaining)? else {
                return Err(timeout());
            };
            let status = self.backend.status();
            machine.on_event(event, status)?;
        }
        Ok(())
    }

    fn complete(&mut self, mut active: ActiveSection) -> MapResult<()> {
        active.machine.finish()?;
        if let Some(target) = active.target.take() {
            self.backend.release_target(target)?;
        }
        self.completed += 1;
        tracing::info!(
            section = active.machine.section() + 1,
            of = self.plan.len(),
            "section done"
        );
        Ok(())
    }

    fn release_quietly(&mut self, target: RenderTarget) {
        let id = target.id();
        if let Err(e) = self.backend.release_target(target) {
            tracing::warn!(target_id = id, error = %e, "failed to release render target");
        }
    }

    fn abort(&mut self) {
        if let Some(mut active) = self.active.take()
            && let Some(target) = active.target.take()
        {
            self.release_quietly(target);
        }
        self.next = self.plan.len();
    }
}

impl<B: MapBackend + ?Sized> PixelSource for CaptureScheduler<'_, B> {
    fn next_chunk(&mut self) -> MapResult<Option<Vec<u8>>> {
        loop {
            if let Some(active) = self.active.as_mut() {
                let pulled = active
                    .stream
                    .next_chunk()
                    .and_then(|chunk| active.check_len(chunk.is_none()).map(|()| chunk));
                match pulled {
                    Ok(Some(chunk)) => return Ok(Some(chunk)),
                    Ok(None) => {
                        if let Some(done) = self.active.take() {
                            self.complete(done).inspect_err(|_| self.abort())?;
                        }
                        continue;
                    }
                    Err(e) => {
                        self.abort();
                        return Err(e);
                    }
                }
            }

            let plan = self.plan;
            let Some(section) = plan.get(self.next) else {
                return Ok(None);
            };
            self.next += 1;
            match self.open(section) {
                Ok(active) => self.active = Some(active),
                Err(e) => {
                    self.abort();
                    return Err(e);
                }
            }
        }
    }
}

impl<B: MapBackend + ?Sized> Drop for CaptureScheduler<'_, B> {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Drain `source` into `encoder`, checking the byte count against `cfg`.
///
/// Stops at the first error from either side; the encoder is only finished on success.
pub fn pump<S, E>(source: &mut S, encoder: &mut E, cfg: &EncoderConfig) -> MapResult<u64>
where
    S: PixelSource + ?Sized,
    E: ImageEncoder + ?Sized,
{
    let expected = cfg.size().byte_len();
    encoder.begin(cfg)?;
    let mut written = 0u64;
    while let Some(chunk) = source.next_chunk()? {
        written += chunk.len() as u64;
        if written > expected {
            return Err(MapError::encoding(format!(
                "pixel stream overran the {}x{} image ({written} > {expected} bytes)",
                cfg.width, cfg.height
            )));
        }
        encoder.write_rows(&chunk)?;
    }
    if written != expected {
        return Err(MapError::encoding(format!(
            "pixel stream ended early for the {}x{} image ({written} < {expected} bytes)",
            cfg.width, cfg.height
        )));
    }
    encoder.finish()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::sink::InMemoryEncoder;
    use crate::stream::ChunkedBytes;

    #[test]
    fn pump_forwards_exact_image() {
        let cfg = EncoderConfig::rgba8(PixelSize::new(2, 3));
        let mut src = ChunkedBytes::new(vec![9; 24], 8).unwrap();
        let mut enc = InMemoryEncoder::new();
        assert_eq!(pump(&mut src, &mut enc, &cfg).unwrap(), 24);
        assert!(enc.is_finished());
        assert_eq!(enc.config(), Some(cfg));
        assert_eq!(enc.chunk_lens(), &[8, 8, 8]);
    }

    #[test]
    fn pump_rejects_length_mismatch() {
        let cfg = EncoderConfig::rgba8(PixelSize::new(2, 3));

        let mut short = ChunkedBytes::new(vec![0; 16], 8).unwrap();
        let mut enc = InMemoryEncoder::new();
        assert!(matches!(
            pump(&mut short, &mut enc, &cfg),
            Err(MapError::Encoding(_))
        ));
        assert!(!enc.is_finished());

        let mut long = ChunkedBytes::new(vec![0; 32], 8).unwrap();
        let mut enc = InMemoryEncoder::new();
        assert!(matches!(
            pump(&mut long, &mut enc, &cfg),
            Err(MapError::Encoding(_))
        ));
        assert_eq!(enc.data().len(), 24);
    }
}
