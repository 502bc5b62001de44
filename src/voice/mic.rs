//! Microphone recognizer: capture, segment, transcribe
//!
//! Each start gets its own [`CaptureSlot`]. The device is opened and closed
//! on the blocking pool while holding the slot's lock, and [`Recognizer::stop`]
//! takes the same lock, so a stopped recognizer never holds the device once
//! `stop` has returned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use super::capture::{AudioSource, SAMPLE_RATE, SourceOpener, default_source, samples_to_wav};
use super::segment::SpeechSegmenter;
use super::stt::SpeechToText;
use super::{ListenMode, RecognitionError, RecognitionSink, Recognizer};
use crate::{Error, Result};

/// How often captured audio is drained into the segmenter
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The device held by one recognizer run
#[derive(Default)]
struct CaptureSlot {
    source: Mutex<Option<Box<dyn AudioSource>>>,
    /// Set under the lock once the run is over; later opens are refused
    released: AtomicBool,
}

impl CaptureSlot {
    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn AudioSource>>> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the device unless the run was already released. Blocking.
    fn open(&self, opener: &SourceOpener) -> Result<bool> {
        let mut source = self.lock();
        if self.released.load(Ordering::Acquire) {
            return Ok(false);
        }
        *source = Some(opener()?);
        Ok(true)
    }

    fn take_buffer(&self) -> Vec<f32> {
        self.lock()
            .as_ref()
            .map(|source| source.take_buffer())
            .unwrap_or_default()
    }

    /// Close the device and refuse further opens. Blocking.
    fn release(&self) {
        let mut source = self.lock();
        self.released.store(true, Ordering::Release);
        if let Some(mut source) = source.take() {
            source.stop();
        }
    }
}

struct Run {
    task: JoinHandle<()>,
    slot: Arc<CaptureSlot>,
}

/// Recognizer backed by an input device and a cloud STT service
pub struct MicRecognizer {
    sink: RecognitionSink,
    mode: ListenMode,
    stt: Arc<SpeechToText>,
    max_wait: Duration,
    opener: SourceOpener,
    run: Option<Run>,
}

impl MicRecognizer {
    /// Create a recognizer on the default input device
    ///
    /// `max_wait` bounds how long a single-shot recognizer waits for speech
    /// to begin before reporting "no speech".
    #[must_use]
    pub fn new(
        sink: RecognitionSink,
        mode: ListenMode,
        stt: Arc<SpeechToText>,
        max_wait: Duration,
    ) -> Self {
        Self {
            sink,
            mode,
            stt,
            max_wait,
            opener: default_source(),
            run: None,
        }
    }

    /// Capture from `opener` instead of the default input device
    #[must_use]
    pub fn with_source(mut self, opener: SourceOpener) -> Self {
        self.opener = opener;
        self
    }
}

impl Recognizer for MicRecognizer {
    fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Recognition(format!("no async runtime: {e}")))?;

        let slot = Arc::new(CaptureSlot::default());
        let listener = Listener {
            sink: self.sink.clone(),
            mode: self.mode,
            stt: Arc::clone(&self.stt),
            max_wait: self.max_wait,
            opener: Arc::clone(&self.opener),
            slot: Arc::clone(&slot),
        };
        self.run = Some(Run {
            task: runtime.spawn(listener.listen()),
            slot,
        });

        tracing::debug!(kind = ?self.sink.kind(), mode = ?self.mode, "microphone recognizer started");
        Ok(())
    }

    fn stop(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        let was_running = !run.task.is_finished();

        run.task.abort();
        // Waits for an in-flight open or close on the blocking pool
        run.slot.release();

        if was_running {
            self.sink.end();
            tracing::debug!(kind = ?self.sink.kind(), "microphone recognizer stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(|run| !run.task.is_finished())
    }
}

impl Drop for MicRecognizer {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            run.task.abort();
            run.slot.release();
        }
    }
}

/// State moved into one recognizer run
struct Listener {
    sink: RecognitionSink,
    mode: ListenMode,
    stt: Arc<SpeechToText>,
    max_wait: Duration,
    opener: SourceOpener,
    slot: Arc<CaptureSlot>,
}

impl Listener {
    async fn listen(self) {
        let slot = Arc::clone(&self.slot);
        let opener = Arc::clone(&self.opener);
        match tokio::task::spawn_blocking(move || slot.open(&opener)).await {
            Ok(Ok(true)) => {}
            // Stopped before the device opened; `stop` reported the end
            Ok(Ok(false)) => return,
            Ok(Err(e)) => {
                self.sink.error(RecognitionError::AudioCapture(e.to_string()));
                self.sink.end();
                return;
            }
            Err(e) => {
                self.sink
                    .error(RecognitionError::Other(format!("capture task failed: {e}")));
                self.sink.end();
                return;
            }
        }

        self.capture_loop().await;

        let slot = Arc::clone(&self.slot);
        if let Err(e) = tokio::task::spawn_blocking(move || slot.release()).await {
            tracing::warn!(error = %e, "failed to stop audio capture");
        }
        self.sink.end();
    }

    async fn capture_loop(&self) {
        let single_shot = self.mode == ListenMode::SingleShot;
        let mut segmenter = SpeechSegmenter::new();
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        let started = Instant::now();

        loop {
            ticker.tick().await;

            let samples = self.slot.take_buffer();
            if let Some(segment) = segmenter.push(&samples) {
                match transcribe(&self.stt, &segment).await {
                    Ok(text) if !text.is_empty() => self.sink.result(text),
                    Ok(_) => self.sink.error(RecognitionError::NoSpeech),
                    Err(e) => self.sink.error(e),
                }
                if single_shot {
                    return;
                }
            }

            if single_shot && !segmenter.is_collecting() && started.elapsed() >= self.max_wait {
                self.sink.error(RecognitionError::NoSpeech);
                return;
            }
        }
    }
}

async fn transcribe(
    stt: &SpeechToText,
    segment: &[f32],
) -> std::result::Result<String, RecognitionError> {
    let wav = samples_to_wav(segment, SAMPLE_RATE)
        .map_err(|e| RecognitionError::Other(e.to_string()))?;

    stt.transcribe(&wav).await.map_err(|e| match e {
        Error::Http(e) => RecognitionError::Network(e.to_string()),
        other => RecognitionError::Other(other.to_string()),
    })
}
