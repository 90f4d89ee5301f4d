use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Result, anyhow};
use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use nokhwa::{
    Camera, query,
    utils::{
        ApiBackend, CameraIndex, CameraInfo, FrameFormat, RequestedFormat, RequestedFormatType,
    },
};

use crate::types::{CapturedFrame, PlaneLayout};

// The decoder only understands 4:2:0 input, so NV12 is the one format we
// ask drivers for.
const SUPPORTED_PIXEL_FORMATS: &[FrameFormat] = &[FrameFormat::NV12];

// How often a capture thread blocked on an unreleased frame checks for stop.
const RELEASE_POLL: Duration = Duration::from_millis(100);

// A camera that fails this many reads in a row is treated as gone.
const MAX_CONSECUTIVE_READ_FAILURES: u32 = 30;

fn requested_formats() -> [RequestedFormat<'static>; 2] {
    [
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestFrameRate,
            SUPPORTED_PIXEL_FORMATS,
        ),
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestResolution,
            SUPPORTED_PIXEL_FORMATS,
        ),
    ]
}

#[derive(Clone, Debug)]
pub struct CameraDevice {
    pub index: CameraIndex,
    pub label: String,
}

#[derive(Debug)]
pub struct CameraStream {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CameraStream {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn available_cameras() -> Result<Vec<CameraDevice>> {
    let cameras = query(ApiBackend::Auto)?;
    Ok(cameras
        .into_iter()
        .map(|info| CameraDevice {
            index: info.index().clone(),
            label: format_camera_label(&info),
        })
        .collect())
}

fn format_camera_label(info: &CameraInfo) -> String {
    info.human_name()
}

fn build_camera(index: CameraIndex) -> Result<Camera> {
    let mut last_err = None;

    for requested in requested_formats() {
        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => return Ok(camera),
                Err(err) => last_err = Some(err.into()),
            },
            Err(err) => last_err = Some(err.into()),
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("camera offers no NV12 stream")))
}

/// Streams NV12 frames into `frame_tx`. A new frame is only captured once
/// the previous one has been released by its consumer.
pub fn start_camera_stream(
    index: CameraIndex,
    frame_tx: Sender<CapturedFrame>,
) -> Result<CameraStream> {
    // Fail fast before spawning the capture thread.
    build_camera(index.clone())?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let handle = thread::spawn(move || {
        let mut camera = match build_camera(index) {
            Ok(cam) => cam,
            Err(err) => {
                log::error!("failed to open camera: {err:?}");
                return;
            }
        };

        let mut read_failures = 0;
        while !stop_flag.load(Ordering::Relaxed) {
            let frame_start = Instant::now();
            let frame = match camera.frame() {
                Ok(frame) => {
                    read_failures = 0;
                    frame
                }
                Err(err) => {
                    read_failures += 1;
                    log::warn!(
                        "camera frame read failed (after {:?}): {err:?}",
                        frame_start.elapsed()
                    );
                    if read_failures >= MAX_CONSECUTIVE_READ_FAILURES {
                        log::error!(
                            "camera failed {read_failures} reads in a row, stopping capture"
                        );
                        break;
                    }
                    continue;
                }
            };

            if frame.source_frame_format() != FrameFormat::NV12 {
                log::warn!(
                    "camera delivered {:?} instead of NV12, skipping",
                    frame.source_frame_format()
                );
                continue;
            }

            let resolution = frame.resolution();
            let (width, height) = (resolution.width_x, resolution.height_y);
            let (release_tx, release_rx) = bounded::<()>(1);
            let captured = CapturedFrame::new(
                frame.buffer().to_vec(),
                PlaneLayout::nv12(width, height),
                width,
                height,
                Instant::now(),
            )
            .with_release(move || {
                let _ = release_tx.send(());
            });

            if frame_tx.send(captured).is_err() {
                log::info!("frame consumer gone, stopping capture");
                break;
            }

            loop {
                match release_rx.recv_timeout(RELEASE_POLL) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) if stop_flag.load(Ordering::Relaxed) => return,
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }
        }
    });

    Ok(CameraStream {
        stop,
        handle: Some(handle),
    })
}
