// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! The `run` command: replay a recorded frame sequence and its landmark file
//! through the configured overlay passes.
//!
//! The landmark file stands in for a live pose provider. The inference gate
//! still runs against it, so skip behavior can be exercised and measured
//! offline exactly as it would behave in a live loop.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::args::RunArgs;
use crate::cli::logging;
use crate::config::VisualsConfig;
use crate::error::{OverlayError, Result};
use crate::gate::InferenceGate;
use crate::passes::VisualPipeline;
use crate::pose::PoseSample;

/// Recognized frame-image extensions.
const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Forced-infer frames after any real inference.
const GATE_MIN_KEEP: u32 = 1;

/// Hard cap on consecutive sample reuses.
const GATE_MAX_SKIP: u32 = 4;

/// What a finished run produced.
#[derive(Debug)]
pub struct RunSummary {
    /// Frames rendered.
    pub frames: usize,
    /// Pose samples reused instead of consumed fresh.
    pub skipped: u64,
    /// Where the rendered frames were written.
    pub output_dir: PathBuf,
}

/// Replay the recorded session through the overlay pipeline.
pub fn run_overlay(args: &RunArgs) -> Result<RunSummary> {
    logging::set_verbose(args.verbose);

    let config = match &args.config {
        Some(path) => VisualsConfig::from_json(&fs::read_to_string(path)?)?,
        None => {
            crate::warn!("No pass configuration given; frames are copied unmodified");
            VisualsConfig::default()
        }
    };

    let frames = list_frames(Path::new(&args.source))?;
    if frames.is_empty() {
        return Err(OverlayError::IoError(format!(
            "no frame images found in '{}'",
            args.source
        )));
    }

    let samples = load_landmarks(Path::new(&args.landmarks))?;
    if samples.len() < frames.len() {
        crate::warn!(
            "{} frames but only {} landmark samples; remaining frames use an empty sample",
            frames.len(),
            samples.len()
        );
    }

    let mut pipeline = VisualPipeline::from_config(&config);
    let mut gate = args
        .smart_skip
        .then(|| InferenceGate::new(args.skip_threshold, GATE_MIN_KEEP, GATE_MAX_SKIP));

    let output_dir = PathBuf::from(&args.output);
    fs::create_dir_all(&output_dir)?;

    let mut current = PoseSample::empty();
    for (index, path) in frames.iter().enumerate() {
        let raw = samples.get(index).cloned().unwrap_or_else(PoseSample::empty);
        let consume = gate.as_mut().map_or(true, |g| g.should_infer(&raw));
        if consume {
            current = raw;
        }

        let frame = image::open(path)?.to_rgb8();
        let rendered = pipeline.apply_all(&frame, &current, args.fps, args.height);

        let out_path = output_dir.join(format!("frame_{index:05}.png"));
        rendered.save(&out_path)?;
        crate::verbose!("Rendered {} -> {}", path.display(), out_path.display());
    }

    let skipped = gate.map_or(0, |g| g.total_skipped());
    crate::success!(
        "Processed {} frames ({} pose samples reused) -> {}",
        frames.len(),
        skipped,
        output_dir.display()
    );

    Ok(RunSummary {
        frames: frames.len(),
        skipped,
        output_dir,
    })
}

/// Frame images in the source directory, sorted by file name.
fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if is_image {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Parse the landmark file: a JSON array with one per-joint position list
/// (entries are `[x, y]` or `null`) per frame.
fn load_landmarks(path: &Path) -> Result<Vec<PoseSample>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "motion-overlay-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_session(dir: &Path, frames: usize) -> (PathBuf, PathBuf) {
        let source = dir.join("frames");
        fs::create_dir_all(&source).unwrap();
        for i in 0..frames {
            RgbImage::new(64, 48)
                .save(source.join(format!("img_{i:03}.png")))
                .unwrap();
        }

        // Right wrist (index 16) sweeping across the frame
        let mut samples = Vec::new();
        for i in 0..frames {
            let mut joints = vec![serde_json::Value::Null; 33];
            joints[16] = serde_json::json!([10.0 + i as f32 * 10.0, 24.0]);
            samples.push(serde_json::Value::Array(joints));
        }
        let landmarks = dir.join("pose.json");
        fs::write(&landmarks, serde_json::Value::Array(samples).to_string()).unwrap();

        (source, landmarks)
    }

    fn args_for(dir: &Path, source: &Path, landmarks: &Path) -> RunArgs {
        RunArgs {
            source: source.to_string_lossy().into_owned(),
            landmarks: landmarks.to_string_lossy().into_owned(),
            config: None,
            output: dir.join("out").to_string_lossy().into_owned(),
            fps: 30.0,
            height: None,
            smart_skip: false,
            skip_threshold: 6.0,
            verbose: false,
        }
    }

    #[test]
    fn test_run_renders_every_frame() {
        let dir = scratch_dir("render");
        let (source, landmarks) = write_session(&dir, 4);

        let config_path = dir.join("visuals.json");
        fs::write(
            &config_path,
            r#"{"trail": {"enabled": true, "fade_alpha": false}}"#,
        )
        .unwrap();

        let mut args = args_for(&dir, &source, &landmarks);
        args.config = Some(config_path.to_string_lossy().into_owned());

        let summary = run_overlay(&args).unwrap();
        assert_eq!(summary.frames, 4);
        for i in 0..4 {
            assert!(summary.output_dir.join(format!("frame_{i:05}.png")).exists());
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_run_without_config_copies_frames() {
        let dir = scratch_dir("passthrough");
        let (source, landmarks) = write_session(&dir, 2);

        let args = args_for(&dir, &source, &landmarks);
        let summary = run_overlay(&args).unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.skipped, 0);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_run_gate_reuses_static_samples() {
        let dir = scratch_dir("gate");
        let source = dir.join("frames");
        fs::create_dir_all(&source).unwrap();
        for i in 0..6 {
            RgbImage::new(64, 48)
                .save(source.join(format!("img_{i:03}.png")))
                .unwrap();
        }

        // Identical samples every frame: zero displacement, maximal skipping
        let mut joints = vec![serde_json::Value::Null; 33];
        joints[16] = serde_json::json!([30.0, 24.0]);
        let sample = serde_json::Value::Array(joints);
        let samples: Vec<_> = (0..6).map(|_| sample.clone()).collect();
        let landmarks = dir.join("pose.json");
        fs::write(&landmarks, serde_json::Value::Array(samples).to_string()).unwrap();

        let mut args = args_for(&dir, &source, &landmarks);
        args.smart_skip = true;

        let summary = run_overlay(&args).unwrap();
        assert_eq!(summary.frames, 6);
        assert!(summary.skipped > 0);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_run_rejects_empty_source() {
        let dir = scratch_dir("empty");
        let source = dir.join("frames");
        fs::create_dir_all(&source).unwrap();
        let landmarks = dir.join("pose.json");
        fs::write(&landmarks, "[]").unwrap();

        let args = args_for(&dir, &source, &landmarks);
        assert!(run_overlay(&args).is_err());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_landmark_file_parses_nulls() {
        let dir = scratch_dir("landmarks");
        let path = dir.join("pose.json");
        fs::write(&path, r#"[[null, [1.5, 2.5], null]]"#).unwrap();

        let samples = load_landmarks(&path).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].points[1], Some((1.5, 2.5)));
        assert!(samples[0].points[0].is_none());

        fs::remove_dir_all(&dir).unwrap();
    }
}
