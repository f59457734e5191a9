use crate::capture::scheduler::{CaptureScheduler, pump};
use crate::config::ExportConfig;
use crate::encode::sink::{EncoderConfig, ImageEncoder};
use crate::foundation::core::Viewport;
use crate::foundation::error::MapResult;
use crate::geo::viewport::calc_viewport;
use crate::plan::sections::plan_sections;
use crate::render::backend::MapBackend;

/// Summary of a finished export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportStats {
    pub viewport: Viewport,
    pub sections: usize,
    /// Raw RGBA bytes handed to the encoder.
    pub bytes: u64,
}

/// Render the configured map through `backend` and encode it with `encoder`.
///
/// Viewport, section plan, then sequential capture of every section into the encoder. The first
/// error from any stage aborts the job; the encoder is only finished on success.
#[tracing::instrument(skip_all, fields(width = cfg.width, height = cfg.height))]
pub fn export_map<B, E>(cfg: &ExportConfig, backend: &mut B, encoder: &mut E) -> MapResult<ExportStats>
where
    B: MapBackend + ?Sized,
    E: ImageEncoder + ?Sized,
{
    cfg.validate()?;
    let size = cfg.size();
    let viewport = calc_viewport(backend, &cfg.bounds, size, cfg.pixel_ratio)?;
    let plan = plan_sections(&viewport, size, cfg.budget(backend.max_renderbuffer_size()))?;

    let mut scheduler = CaptureScheduler::new(backend, &plan, cfg.capture_opts());
    let bytes = pump(&mut scheduler, encoder, &EncoderConfig::rgba8(size))?;
    let sections = scheduler.completed();

    tracing::info!(sections, bytes, "export finished");
    Ok(ExportStats {
        viewport,
        sections,
        bytes,
    })
}
