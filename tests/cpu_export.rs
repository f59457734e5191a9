use std::{cell::RefCell, io::Write, rc::Rc, time::Duration};

use mapshot::{
    BoundingBox, CpuMapRenderer, CpuRendererOpts, ExportConfig, ImageFormat, InMemoryEncoder,
    LngLat, MapRenderer, MapStyle, Marker, PixelCapture, calc_viewport, collect_all,
    create_encoder, export_map,
};

#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn style() -> MapStyle {
    MapStyle {
        graticule_step_deg: 0.5,
        markers: vec![Marker {
            position: LngLat::new(6.0, 46.0),
            radius: 4.0,
            color: [200, 30, 30, 255],
        }],
        ..MapStyle::default()
    }
}

fn renderer() -> CpuMapRenderer {
    CpuMapRenderer::new(CpuRendererOpts {
        style: style(),
        transition_frames: 3,
        load_frames: 2,
        capture_chunk_bytes: 333,
        max_renderbuffer_size: 512,
    })
    .unwrap()
}

fn config(width: u32, height: u32) -> ExportConfig {
    let bounds = BoundingBox::new(LngLat::new(5.0, 45.0), LngLat::new(7.0, 47.0)).unwrap();
    let mut cfg = ExportConfig::new(bounds, width, height);
    cfg.pixel_ratio = 1.0;
    cfg
}

#[test]
fn multi_section_png_decodes_to_requested_size() {
    let mut cfg = config(120, 90);
    cfg.max_pixels = Some(120 * 32);
    let buf = SharedBuf::default();
    let mut enc = create_encoder(ImageFormat::Png, cfg.quality, buf.clone());
    let mut backend = renderer();

    let stats = export_map(&cfg, &mut backend, enc.as_mut()).unwrap();
    assert_eq!(stats.sections, 3);
    assert_eq!(stats.bytes, 120 * 90 * 4);
    assert!(!backend.has_bound_target());
    drop(enc);

    let img = image::load_from_memory_with_format(&buf.0.borrow(), image::ImageFormat::Png)
        .unwrap()
        .to_rgba8();
    assert_eq!(img.dimensions(), (120, 90));
    // Background is opaque everywhere.
    assert!(img.pixels().all(|p| p.0[3] == 255));
}

#[test]
fn single_section_matches_a_direct_capture() {
    let cfg = config(64, 48);

    let mut enc = InMemoryEncoder::new();
    let mut backend = renderer();
    let stats = export_map(&cfg, &mut backend, &mut enc).unwrap();
    assert_eq!(stats.sections, 1);

    let mut direct = renderer();
    let viewport = calc_viewport(&mut direct, &cfg.bounds, cfg.size(), cfg.pixel_ratio).unwrap();
    assert_eq!(viewport, stats.viewport);
    let target = direct.create_target(cfg.size()).unwrap();
    direct.resize(cfg.size(), cfg.pixel_ratio).unwrap();
    direct.jump_to(&viewport.camera()).unwrap();
    while direct.next_event(Duration::ZERO).unwrap().is_some() {}
    let mut source = direct.capture(&target, true).unwrap();
    let pixels = collect_all(&mut source).unwrap();

    assert_eq!(enc.data(), pixels.as_slice());
}

#[test]
fn jpeg_export_drops_alpha_and_keeps_size() {
    let mut cfg = config(80, 60);
    cfg.format = ImageFormat::Jpeg;
    cfg.quality = 0.5;
    cfg.max_pixels = Some(80 * 25);
    let buf = SharedBuf::default();
    let mut enc = create_encoder(cfg.format, cfg.quality, buf.clone());

    export_map(&cfg, &mut renderer(), enc.as_mut()).unwrap();
    drop(enc);

    let bytes = buf.0.borrow();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    let img = image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg).unwrap();
    assert_eq!((img.width(), img.height()), (80, 60));
}
