use anyhow::Result;
use pug_or_bulldog::PipelineConfig;

fn main() -> Result<()> {
    env_logger::init();

    let config = PipelineConfig::from_env();
    log::info!("using model {}", config.model_path.display());

    run(config)
}

#[cfg(feature = "camera-nokhwa")]
fn run(config: PipelineConfig) -> Result<()> {
    use anyhow::{Context, anyhow};
    use crossbeam_channel::bounded;
    use pug_or_bulldog::pipeline::{
        OrtEngine, available_cameras, channel_sink, start_analysis_worker, start_camera_stream,
    };

    let cameras = available_cameras().context("failed to query cameras")?;
    for device in &cameras {
        log::info!("found camera: {}", device.label);
    }
    let device = cameras
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no camera available"))?;

    // One slot each way: the camera holds back until a frame is released,
    // and a stale overlay is never queued behind a fresh one.
    let (frame_tx, frame_rx) = bounded(1);
    let (sink, overlay_rx) = channel_sink(1);

    let model_path = config.model_path.clone();
    let worker =
        start_analysis_worker(move || OrtEngine::load(&model_path), config, frame_rx, sink)?;
    let camera = start_camera_stream(device.index, frame_tx)
        .with_context(|| format!("failed to start camera {}", device.label))?;

    // This thread owns the display; overlays are only read here. The loop
    // ends when the capture thread gives up (camera unplugged or failing),
    // which hangs up the worker and then this channel. Otherwise the
    // session runs until the process is interrupted with Ctrl-C.
    let mut shown = None;
    for overlay in overlay_rx.iter() {
        // Redraws between inferences repeat the retained readings.
        if shown == Some(overlay.readings) {
            continue;
        }
        shown = Some(overlay.readings);

        let [first, second, third, speed] = overlay.caption_lines();
        let preview = overlay.preview.as_deref().map_or_else(
            || "no preview yet".to_string(),
            |preview| format!("{}x{} preview", preview.width, preview.height),
        );
        log::info!("{first} | {second} | {third} | {speed} ({preview})");
    }

    log::info!("camera stream ended, shutting down");
    camera.stop();
    worker.join();
    Ok(())
}

#[cfg(not(feature = "camera-nokhwa"))]
fn run(_config: PipelineConfig) -> Result<()> {
    Err(anyhow::anyhow!(
        "built without a camera backend; enable the `camera-nokhwa` feature"
    ))
}
