//! End-to-end tests for the processing operations, driven through stub
//! networks so no model weights are needed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use ndarray::{Array3, Array4, ArrayView3};

use chromalift::color::BgrArray;
use chromalift::config::ColorizerConfig;
use chromalift::pipeline::{ChromaNetwork, ChromaTensor, Colorizer, FaceRestorer, LumaTensor};
use chromalift::{CancelToken, Config, Error, ErrorKind, Operation, Processor, Result, Task};

/// Predicts a warm tint at 1/4 of the input resolution, like the real graph
/// before its final upsample.
struct WarmNet {
    calls: Arc<AtomicUsize>,
    cancel_on_call: Option<CancelToken>,
}

impl WarmNet {
    fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            cancel_on_call: None,
        }
    }
}

impl ChromaNetwork for WarmNet {
    fn predict(&mut self, lightness: &LumaTensor) -> Result<ChromaTensor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = &self.cancel_on_call {
            token.cancel();
        }

        let (_, _, h, w) = lightness.dim();
        let mut out = Array4::<f32>::zeros((1, 2, (h / 4).max(1), (w / 4).max(1)));
        // Vary a with lightness so the output depends on the input
        for y in 0..out.dim().2 {
            for x in 0..out.dim().3 {
                out[[0, 0, y, x]] = 0.1 + lightness[[0, 0, y * 4, x * 4]] * 0.1;
                out[[0, 1, y, x]] = 0.2;
            }
        }
        Ok(out)
    }
}

/// Doubles the frame size and boosts the first (blue) channel.
struct DoubleBlue {
    calls: Arc<AtomicUsize>,
    first_pixel: Arc<Mutex<Option<[u8; 3]>>>,
}

impl DoubleBlue {
    fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            first_pixel: Arc::new(Mutex::new(None)),
        }
    }
}

impl FaceRestorer for DoubleBlue {
    fn restore(&mut self, frame: ArrayView3<'_, u8>) -> Result<Option<BgrArray>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.first_pixel.lock().unwrap() =
            Some([frame[[0, 0, 0]], frame[[0, 0, 1]], frame[[0, 0, 2]]]);

        let (h, w, c) = frame.dim();
        Ok(Some(Array3::from_shape_fn((h * 2, w * 2, c), |(y, x, ch)| {
            let v = frame[[y / 2, x / 2, ch]];
            if ch == 0 {
                v.saturating_add(40)
            } else {
                v
            }
        })))
    }
}

/// Always signals failure.
struct NoFaces;

impl FaceRestorer for NoFaces {
    fn restore(&mut self, _frame: ArrayView3<'_, u8>) -> Result<Option<BgrArray>> {
        Ok(None)
    }
}

fn small_colorizer(network: impl ChromaNetwork + 'static) -> Colorizer {
    let settings = ColorizerConfig {
        input_size: 32,
        ..ColorizerConfig::default()
    };
    Colorizer::new(Box::new(network), settings)
}

fn processor() -> Processor {
    Processor::with_components(
        Config::default(),
        Some(small_colorizer(WarmNet::new())),
        Some(Box::new(DoubleBlue::new())),
    )
    .unwrap()
}

fn gray_photo(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
        #[allow(clippy::cast_possible_truncation)]
        Luma([((x * 7 + y * 3) % 256) as u8])
    }))
}

fn scratch(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("chromalift-it-{}-{name}", std::process::id()))
}

// ============================================================================
// Operations without input
// ============================================================================

#[test]
fn test_every_operation_requires_an_image() {
    let mut processor = processor();

    for op in Operation::ALL {
        let err = processor.process(op).unwrap_err();
        assert!(matches!(err, Error::NoImageLoaded), "{op}: {err:?}");
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    assert!(processor.source().is_none());
    assert!(processor.processed().is_none());
}

#[test]
fn test_save_without_processing() {
    let mut processor = processor();
    processor.load_dynamic(gray_photo(8, 8)).unwrap();

    let err = processor.save(scratch("never.png")).unwrap_err();
    assert!(matches!(err, Error::NoResult));
    assert!(!scratch("never.png").exists());
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_grayscale_source_is_three_channel() {
    let path = scratch("gray.png");
    let gray = GrayImage::from_pixel(6, 4, Luma([90]));
    gray.save(&path).unwrap();

    let mut processor = processor();
    let loaded = processor.load(&path).unwrap().clone();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.dimensions(), (6, 4));
    assert!(loaded.pixels().all(|p| p.0 == [90, 90, 90]));
    assert_eq!(
        processor.source().and_then(|s| s.path.clone()),
        Some(path)
    );
}

#[test]
fn test_failed_load_keeps_prior_state() {
    let mut processor = processor();
    processor.load_dynamic(gray_photo(10, 10)).unwrap();
    let result = processor.process(Operation::Colorize).unwrap().clone();

    let err = processor.load(scratch("missing.png")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);

    assert_eq!(processor.source().unwrap().image.dimensions(), (10, 10));
    assert_eq!(processor.processed(), Some(&result));
}

#[test]
fn test_new_load_clears_result() {
    let mut processor = processor();
    processor.load_dynamic(gray_photo(10, 10)).unwrap();
    processor.process(Operation::Colorize).unwrap();

    processor.load_dynamic(gray_photo(12, 12)).unwrap();
    assert!(processor.processed().is_none());
}

#[test]
fn test_reset_clears_everything() {
    let mut processor = processor();
    processor.load_dynamic(gray_photo(10, 10)).unwrap();
    processor.process(Operation::Enhance).unwrap();

    processor.reset();
    assert!(processor.source().is_none());
    assert!(processor.processed().is_none());
    assert!(matches!(
        processor.process(Operation::Enhance),
        Err(Error::NoImageLoaded)
    ));
}

// ============================================================================
// Colorization
// ============================================================================

#[test]
fn test_colorize_keeps_native_resolution() {
    let mut processor = processor();

    for (w, h) in [(333, 123), (32, 32), (7, 90)] {
        processor.load_dynamic(gray_photo(w, h)).unwrap();
        let out = processor.process(Operation::Colorize).unwrap();
        assert_eq!(out.dimensions(), (w, h));
    }
}

#[test]
fn test_colorize_adds_color_to_gray() {
    let mut processor = processor();
    processor
        .load_dynamic(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            40,
            40,
            Rgb([120, 120, 120]),
        )))
        .unwrap();

    let out = processor.process(Operation::Colorize).unwrap();
    assert!(out.pixels().any(|p| p[0] != p[2]));
}

#[test]
fn test_operations_are_idempotent() {
    let mut processor = processor();
    processor.load_dynamic(gray_photo(50, 30)).unwrap();

    for op in Operation::ALL {
        let first = processor.process(op).unwrap().clone();
        let second = processor.process(op).unwrap().clone();
        assert_eq!(first, second, "{op}");
    }
}

// ============================================================================
// Enhancement
// ============================================================================

#[test]
fn test_restorer_receives_bgr() {
    let restorer = DoubleBlue::new();
    let seen = Arc::clone(&restorer.first_pixel);
    let mut processor =
        Processor::with_components(Config::default(), None, Some(Box::new(restorer))).unwrap();

    processor
        .load_dynamic(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            3,
            3,
            Rgb([10, 20, 30]),
        )))
        .unwrap();
    let out = processor.process(Operation::Enhance).unwrap();

    assert_eq!(*seen.lock().unwrap(), Some([30, 20, 10]));
    assert_eq!(out.dimensions(), (6, 6));
    // The boosted first BGR channel is blue once back in RGB
    assert_eq!(out.get_pixel(0, 0).0, [10, 20, 70]);
}

#[test]
fn test_restorer_failure_reported_without_result() {
    let mut processor = Processor::with_components(
        Config::default(),
        Some(small_colorizer(WarmNet::new())),
        Some(Box::new(NoFaces)),
    )
    .unwrap();
    processor.load_dynamic(gray_photo(16, 16)).unwrap();

    let err = processor.process(Operation::ColorizeEnhance).unwrap_err();
    assert!(matches!(err, Error::EmptyOutput { .. }));
    assert_eq!(err.kind(), ErrorKind::Inference);
    assert!(processor.processed().is_none());
}

#[test]
fn test_enhance_unavailable_without_restorer() {
    let mut processor = Processor::with_components(
        Config::default(),
        Some(small_colorizer(WarmNet::new())),
        None,
    )
    .unwrap();
    processor.load_dynamic(gray_photo(16, 16)).unwrap();

    assert!(processor.is_available(Operation::Colorize));
    assert!(!processor.is_available(Operation::ColorizeEnhance));
    assert!(processor.process(Operation::Colorize).is_ok());

    let err = processor.process(Operation::ColorizeEnhance).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Initialization);
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn test_colorize_then_enhance_composes() {
    let source = gray_photo(45, 28);

    let mut combined = processor();
    combined.load_dynamic(source.clone()).unwrap();
    let together = combined
        .process(Operation::ColorizeEnhance)
        .unwrap()
        .clone();

    let mut manual = processor();
    manual.load_dynamic(source).unwrap();
    let colorized = manual.process(Operation::Colorize).unwrap().clone();
    manual
        .load_dynamic(DynamicImage::ImageRgb8(colorized))
        .unwrap();
    let step_by_step = manual.process(Operation::Enhance).unwrap().clone();

    assert_eq!(together.dimensions(), (90, 56));
    assert_eq!(together, step_by_step);
}

#[test]
fn test_processed_image_saves() {
    let mut processor = processor();
    processor.load_dynamic(gray_photo(20, 20)).unwrap();
    processor.process(Operation::Colorize).unwrap();

    let path = scratch("colorized.png");
    processor.save(&path).unwrap();
    let written = image::open(&path).unwrap().to_rgb8();
    std::fs::remove_file(&path).ok();

    assert_eq!(Some(&written), processor.processed());
}

// ============================================================================
// Cancellation and background tasks
// ============================================================================

#[test]
fn test_cancelled_before_start() {
    let mut processor = processor();
    processor.load_dynamic(gray_photo(16, 16)).unwrap();

    let token = CancelToken::new();
    token.cancel();

    let err = processor
        .process_with_cancel(Operation::Colorize, &token)
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(processor.processed().is_none());
}

#[test]
fn test_cancel_between_stages_skips_restorer() {
    let token = CancelToken::new();
    let net = WarmNet {
        cancel_on_call: Some(token.clone()),
        ..WarmNet::new()
    };
    let restorer = DoubleBlue::new();
    let restorer_calls = Arc::clone(&restorer.calls);

    let mut processor = Processor::with_components(
        Config::default(),
        Some(small_colorizer(net)),
        Some(Box::new(restorer)),
    )
    .unwrap();
    processor.load_dynamic(gray_photo(16, 16)).unwrap();

    let err = processor
        .process_with_cancel(Operation::ColorizeEnhance, &token)
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert_eq!(restorer_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_background_task_hands_processor_back() {
    let net = WarmNet::new();
    let calls = Arc::clone(&net.calls);
    let mut processor = Processor::with_components(
        Config::default(),
        Some(small_colorizer(net)),
        Some(Box::new(DoubleBlue::new())),
    )
    .unwrap();
    processor.load_dynamic(gray_photo(24, 24)).unwrap();

    let task = Task::spawn(processor, Operation::Colorize).unwrap();
    let done = task.join().unwrap();

    assert!(done.outcome.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        done.processor.processed().map(RgbImage::dimensions),
        Some((24, 24))
    );
}

#[test]
fn test_lightness_passed_at_network_size() {
    struct ShapeProbe(Arc<Mutex<Vec<(usize, usize, usize, usize)>>>);

    impl ChromaNetwork for ShapeProbe {
        fn predict(&mut self, lightness: &LumaTensor) -> Result<ChromaTensor> {
            self.0.lock().unwrap().push(lightness.dim());
            let (_, _, h, w) = lightness.dim();
            Ok(Array4::zeros((1, 2, h, w)))
        }
    }

    let shapes = Arc::new(Mutex::new(Vec::new()));
    let mut colorizer = small_colorizer(ShapeProbe(Arc::clone(&shapes)));
    let out = colorizer
        .colorize(&gray_photo(100, 60).to_rgb8())
        .unwrap();

    assert_eq!(out.dimensions(), (100, 60));
    assert_eq!(shapes.lock().unwrap().as_slice(), &[(1, 1, 32, 32)]);
    // Zero chrominance leaves a gray image gray
    assert!(out
        .pixels()
        .all(|p| p[0].abs_diff(p[1]) <= 1 && p[1].abs_diff(p[2]) <= 1));
}
