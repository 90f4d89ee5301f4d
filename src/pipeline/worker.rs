use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, bounded};

use super::{
    decoder::decode_frame,
    engine::InferenceEngine,
    preview::render_preview,
    rate_gate::{GateDecision, RateGate},
    sink::RenderSink,
    tensor::prepare_input,
};
use crate::{
    config::PipelineConfig,
    error::FrameError,
    types::{CapturedFrame, Overlay, PreviewImage, RawFrame, Readings},
};

#[derive(Clone, Debug)]
pub enum FrameOutcome {
    /// First frame of the session; only the gate's reference time was set.
    ReferenceRecorded,
    Skipped { remaining: Duration },
    Classified(Overlay),
}

/// Per-session analysis state: the rate gate, the engine and what the last
/// inference produced. Owned by the analysis worker and never shared.
pub struct FramePipeline<E> {
    config: PipelineConfig,
    gate: RateGate,
    engine: E,
    last_readings: Readings,
    last_preview: Option<Arc<PreviewImage>>,
    inference_count: u64,
}

impl<E: InferenceEngine> FramePipeline<E> {
    pub fn new(engine: E, config: PipelineConfig) -> Self {
        Self {
            gate: RateGate::new(config.inference_interval),
            config,
            engine,
            last_readings: Readings::idle(),
            last_preview: None,
            inference_count: 0,
        }
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    pub fn last_readings(&self) -> Readings {
        self.last_readings
    }

    pub fn inference_count(&self) -> u64 {
        self.inference_count
    }

    /// The overlay to redraw for a frame that was not classified: idle
    /// readings until the first inference, the retained ones afterwards.
    pub fn retained_overlay(&self, timestamp: Instant) -> Overlay {
        Overlay {
            readings: self.last_readings,
            labels: self.config.class_labels,
            preview: self.last_preview.clone(),
            timestamp,
        }
    }

    /// Decode, prepare and classify `frame` when the gate is due. On error
    /// the frame is dropped and the gate is left untouched, so the next
    /// frame gets another chance.
    pub fn process_frame(&mut self, frame: &RawFrame<'_>) -> Result<FrameOutcome, FrameError> {
        match self.gate.poll(frame.timestamp) {
            GateDecision::Armed => {
                log::info!(
                    "first frame {}x{}, classifying every {:?}",
                    frame.width,
                    frame.height,
                    self.gate.interval()
                );
                return Ok(FrameOutcome::ReferenceRecorded);
            }
            GateDecision::Waiting { remaining } => {
                return Ok(FrameOutcome::Skipped { remaining });
            }
            GateDecision::Due => {}
        }

        let image = decode_frame(frame)?;
        let prepared = prepare_input(&image, self.config.input_size)?;
        let preview = render_preview(&prepared.resized, self.config.preview_size)
            .map_err(FrameError::Preview)?;

        let started = Instant::now();
        let probabilities = self.engine.infer(&prepared.tensor)?;
        let latency = started.elapsed();

        self.gate.rearm(frame.timestamp);
        self.inference_count += 1;
        self.last_readings = Readings::new(probabilities, latency);
        self.last_preview = Some(Arc::new(preview));
        log::info!(
            "inference #{} took {:?}: {:?}",
            self.inference_count,
            latency,
            self.last_readings.scores
        );

        Ok(FrameOutcome::Classified(self.retained_overlay(frame.timestamp)))
    }
}

/// Processes frames one at a time until the source hangs up. Every frame
/// that is not dropped puts an overlay on the sink, so the display keeps
/// showing the latest readings between inferences. Each frame is dropped,
/// and therefore released back to its source, before the next one is
/// received, whatever the outcome.
pub fn run_analysis_loop<E, S>(
    pipeline: &mut FramePipeline<E>,
    frame_rx: &Receiver<CapturedFrame>,
    sink: &S,
) where
    E: InferenceEngine,
    S: RenderSink,
{
    while let Ok(frame) = frame_rx.recv() {
        let raw = frame.raw();
        match pipeline.process_frame(&raw) {
            Ok(FrameOutcome::Classified(overlay)) => sink.present(overlay),
            Ok(FrameOutcome::ReferenceRecorded | FrameOutcome::Skipped { .. }) => {
                sink.present(pipeline.retained_overlay(raw.timestamp))
            }
            Err(err) => log::warn!("dropping frame: {err}"),
        }
    }
}

#[derive(Debug)]
pub struct AnalysisWorker {
    handle: Option<thread::JoinHandle<()>>,
}

impl AnalysisWorker {
    /// Waits for the worker to drain; it exits once the frame source is gone.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Spawns the single analysis worker. The engine is loaded on the worker
/// thread; a load failure is returned here and no worker keeps running.
pub fn start_analysis_worker<E, F, S>(
    load_engine: F,
    config: PipelineConfig,
    frame_rx: Receiver<CapturedFrame>,
    sink: S,
) -> Result<AnalysisWorker>
where
    E: InferenceEngine,
    F: FnOnce() -> Result<E> + Send + 'static,
    S: RenderSink,
{
    let (ready_tx, ready_rx) = bounded::<Result<()>>(1);

    let handle = thread::Builder::new()
        .name("frame-analysis".into())
        .spawn(move || {
            let engine = match load_engine() {
                Ok(engine) => {
                    let _ = ready_tx.send(Ok(()));
                    engine
                }
                Err(err) => {
                    log::error!("failed to load classifier: {err:?}");
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };

            let mut pipeline = FramePipeline::new(engine, config);
            run_analysis_loop(&mut pipeline, &frame_rx, &sink);
            log::info!(
                "analysis worker stopped after {} inferences",
                pipeline.inference_count()
            );
        })
        .context("failed to spawn analysis worker")?;

    let ready = ready_rx
        .recv()
        .map_err(|_| anyhow!("analysis worker exited before loading the classifier"))?;
    if let Err(err) = ready {
        let _ = handle.join();
        return Err(err.context("classifier unavailable, cannot start session"));
    }

    Ok(AnalysisWorker {
        handle: Some(handle),
    })
}
