//! Event loop tying the scheduler, the single-flight gate and a frame sink
//! together for one playback run.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use super::guard::SingleFlight;
use super::scheduler::{Effect, Event, Scheduler, format_clock};
use crate::container::PixelStream;
use crate::device::FrameSink;
use crate::schema::{ConfigError, StreamConfig};

/// User-facing playback controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Start,
    Stop,
    Toggle,
    Reset,
    SeekForward,
    SeekBackward,
    Quit,
}

/// Observable playback state, published after every event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSnapshot {
    pub elapsed: Duration,
    pub max: Duration,
    pub running: bool,
    /// Frame shown at `elapsed`.
    pub frame_index: Option<usize>,
    /// Pushes skipped because the previous one was still in flight.
    pub dropped_pushes: u64,
}

impl PlaybackSnapshot {
    pub fn progress(&self) -> f64 {
        if self.max.is_zero() {
            return 0.0;
        }
        self.elapsed.as_secs_f64() / self.max.as_secs_f64()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Pixel stream has no frames to play")]
    EmptyStream,
    #[error("Invalid playback configuration: {0}")]
    Config(#[from] ConfigError),
}

/// One playback run of a pixel stream against a sink.
///
/// All scheduler transitions happen on the task running [`run`](Self::run).
/// Pushes run in the background behind a [`SingleFlight`], so a slow device
/// never delays the clock; frames arriving while a push is pending are
/// skipped.
pub struct PlaybackSession<S> {
    stream: Arc<PixelStream>,
    sink: Arc<S>,
    scheduler: Scheduler,
    gate: SingleFlight,
    seek_step: Duration,
    quit_at_end: bool,
    dropped_pushes: u64,
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
}

impl<S: FrameSink + 'static> PlaybackSession<S> {
    pub fn new(
        stream: Arc<PixelStream>,
        sink: Arc<S>,
        config: &StreamConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        if stream.is_empty() {
            return Err(SessionError::EmptyStream);
        }

        let scheduler = Scheduler::for_stream(&stream);
        let (snapshot_tx, _) = watch::channel(PlaybackSnapshot {
            elapsed: Duration::ZERO,
            max: scheduler.max(),
            running: false,
            frame_index: stream.frame_index_at(Duration::ZERO),
            dropped_pushes: 0,
        });

        Ok(Self {
            stream,
            sink,
            scheduler,
            gate: SingleFlight::new(),
            seek_step: config.seek_step(),
            quit_at_end: false,
            dropped_pushes: 0,
            snapshot_tx,
        })
    }

    /// End [`run`](Self::run) as soon as playback reaches the end.
    pub fn quit_at_end(mut self, quit: bool) -> Self {
        self.quit_at_end = quit;
        self
    }

    pub fn stream(&self) -> &Arc<PixelStream> {
        &self.stream
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            elapsed: self.scheduler.elapsed(),
            max: self.scheduler.max(),
            running: self.scheduler.running(),
            frame_index: self.stream.frame_index_at(self.scheduler.elapsed()),
            dropped_pushes: self.dropped_pushes,
        }
    }

    /// Play until `Quit`, a closed control channel, or (with
    /// [`quit_at_end`](Self::quit_at_end)) the end of the stream.
    pub async fn run(mut self, mut controls: mpsc::UnboundedReceiver<Control>) -> PlaybackSnapshot {
        let (ticks, mut tick_rx) = mpsc::unbounded_channel();

        log::info!(
            "Playing {} frames at {} fps ({})",
            self.stream.frame_count(),
            self.stream.frame_rate(),
            format_clock(self.scheduler.max())
        );

        let start = self.scheduler.start();
        self.dispatch(start, &ticks);

        loop {
            if self.quit_at_end && self.scheduler.is_finished() {
                log::info!("Playback finished");
                break;
            }

            tokio::select! {
                control = controls.recv() => {
                    let Some(event) = control.and_then(|c| self.event_for(c)) else {
                        break;
                    };
                    self.dispatch(event, &ticks);
                }
                Some(event) = tick_rx.recv() => self.dispatch(event, &ticks),
            }
        }

        let summary = self.snapshot();
        if summary.dropped_pushes > 0 {
            log::info!(
                "Skipped {} frames while the device was busy",
                summary.dropped_pushes
            );
        }
        summary
    }

    fn event_for(&self, control: Control) -> Option<Event> {
        let step = self.seek_step.as_secs_f64();
        let event = match control {
            Control::Start => self.scheduler.start(),
            Control::Stop => self.scheduler.stop(),
            Control::Toggle => self.scheduler.toggle(),
            Control::Reset => self.scheduler.reset(),
            Control::SeekForward => self.scheduler.seek(step),
            Control::SeekBackward => self.scheduler.seek(-step),
            Control::Quit => return None,
        };
        Some(event)
    }

    fn dispatch(&mut self, event: Event, ticks: &mpsc::UnboundedSender<Event>) {
        let before = self.scheduler.elapsed();
        let mut started = false;

        for effect in self.scheduler.handle(event) {
            match effect {
                Effect::ScheduleTick { id, tag, delay } => {
                    let ticks = ticks.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        // Closed channel means the session already ended
                        let _ = ticks.send(Event::Tick { id, tag });
                    });
                }
                Effect::RunningChanged(running) => {
                    started |= running;
                    log::debug!(
                        "Playback {} at {}",
                        if running { "started" } else { "stopped" },
                        format_clock(self.scheduler.elapsed())
                    );
                }
            }
        }

        if started || self.scheduler.elapsed() != before {
            self.transmit();
        }
        self.snapshot_tx.send_replace(self.snapshot());
    }

    fn transmit(&mut self) {
        let Some(index) = self.stream.frame_index_at(self.scheduler.elapsed()) else {
            return;
        };

        let stream = Arc::clone(&self.stream);
        let sink = Arc::clone(&self.sink);
        let pushed = self.gate.try_spawn(async move {
            if let Err(e) = sink.push(&stream.frames()[index]).await {
                log::warn!("Failed to push frame {}: {}", index, e);
            }
        });

        if pushed.is_some() {
            log::trace!("Pushing frame {}", index);
        } else {
            self.dropped_pushes += 1;
            log::trace!("Push in flight, skipping frame {}", index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Frame, PIXEL_COUNT, Pixel};
    use crate::device::DeviceError;
    use async_trait::async_trait;
    use std::num::NonZeroU8;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    /// Sink recording the red channel of the first pixel of each pushed frame.
    #[derive(Default)]
    struct RecordingSink {
        delay: Duration,
        pushed: Mutex<Vec<u8>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl RecordingSink {
        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Default::default()
            }
        }

        fn pushed(&self) -> Vec<u8> {
            self.pushed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn push(&self, frame: &Frame) -> Result<(), DeviceError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            self.pushed.lock().unwrap().push(frame.pixels()[0].r);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// `count` frames at 10 fps, frame `i` marked with red value `i`.
    fn stream(count: usize) -> Arc<PixelStream> {
        let frames = (0..count)
            .map(|i| Frame::from_pixels([Pixel::new(i as u8, 0, 0); PIXEL_COUNT]))
            .collect();
        Arc::new(PixelStream::new(NonZeroU8::new(10).unwrap(), frames))
    }

    #[test]
    fn test_empty_stream_rejected() {
        let result = PlaybackSession::new(
            stream(0),
            Arc::new(RecordingSink::default()),
            &StreamConfig::default(),
        );
        assert!(matches!(result, Err(SessionError::EmptyStream)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_every_frame_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let session = PlaybackSession::new(stream(10), sink.clone(), &StreamConfig::default())
            .unwrap()
            .quit_at_end(true);

        let (_controls, rx) = mpsc::unbounded_channel();
        let summary = session.run(rx).await;
        sleep(Duration::from_millis(10)).await;

        assert_eq!(summary.elapsed, Duration::from_secs(1));
        assert!(!summary.running);
        assert_eq!(summary.frame_index, Some(9));
        assert_eq!(summary.dropped_pushes, 0);

        let mut pushed = sink.pushed();
        pushed.dedup();
        assert_eq!(pushed, (0..10).collect::<Vec<u8>>());
        assert_eq!(sink.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_sink_drops_instead_of_queueing() {
        let sink = Arc::new(RecordingSink::slow(Duration::from_millis(250)));
        let session = PlaybackSession::new(stream(10), sink.clone(), &StreamConfig::default())
            .unwrap()
            .quit_at_end(true);

        let (_controls, rx) = mpsc::unbounded_channel();
        let summary = session.run(rx).await;
        sleep(Duration::from_secs(1)).await;

        // The clock is not held back by the device
        assert_eq!(summary.elapsed, Duration::from_secs(1));
        assert!(summary.dropped_pushes > 0);
        assert_eq!(sink.max_in_flight.load(Ordering::SeqCst), 1);

        let pushed = sink.pushed();
        assert!(pushed.len() < 11);
        assert_eq!(pushed[0], 0);
        assert!(pushed.windows(2).all(|w| w[0] <= w[1]), "{pushed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_controls_drive_scheduler() {
        let sink = Arc::new(RecordingSink::default());
        let session =
            PlaybackSession::new(stream(10), sink.clone(), &StreamConfig::default()).unwrap();
        let snapshots = session.subscribe();

        let (controls, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(session.run(rx));
        let settle = || sleep(Duration::from_millis(1));

        sleep(Duration::from_millis(350)).await;
        assert_eq!(snapshots.borrow().elapsed, Duration::from_millis(300));
        assert!(snapshots.borrow().running);

        controls.send(Control::Toggle).unwrap();
        settle().await;
        assert!(!snapshots.borrow().running);

        // Ticks armed before the stop are ignored
        sleep(Duration::from_millis(500)).await;
        assert_eq!(snapshots.borrow().elapsed, Duration::from_millis(300));

        controls.send(Control::SeekBackward).unwrap();
        settle().await;
        assert_eq!(snapshots.borrow().elapsed, Duration::ZERO);

        controls.send(Control::SeekForward).unwrap();
        settle().await;
        assert_eq!(snapshots.borrow().elapsed, Duration::from_secs(1));
        assert_eq!(snapshots.borrow().frame_index, Some(9));
        assert!(!snapshots.borrow().running);

        // Starting at the end replays from the beginning
        controls.send(Control::Start).unwrap();
        settle().await;
        assert!(snapshots.borrow().running);
        assert_eq!(snapshots.borrow().elapsed, Duration::ZERO);

        controls.send(Control::Quit).unwrap();
        let summary = handle.await.unwrap();
        assert!(summary.running);
        assert_eq!(sink.pushed().last(), Some(&0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_pause_resume_keeps_speed() {
        let session = PlaybackSession::new(
            stream(20),
            Arc::new(RecordingSink::default()),
            &StreamConfig::default(),
        )
        .unwrap();
        let snapshots = session.subscribe();

        let (controls, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(session.run(rx));

        // Pause and resume inside the first interval
        sleep(Duration::from_millis(50)).await;
        controls.send(Control::Toggle).unwrap();
        controls.send(Control::Toggle).unwrap();

        // Restarted at 50ms: ticks land at 150, 250, 350, 450 and 550ms
        sleep(Duration::from_millis(510)).await;
        assert!(snapshots.borrow().running);
        assert_eq!(snapshots.borrow().elapsed, Duration::from_millis(500));

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(snapshots.borrow().elapsed, Duration::from_millis(1500));

        controls.send(Control::Quit).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_controls_end_session() {
        let session = PlaybackSession::new(
            stream(10),
            Arc::new(RecordingSink::default()),
            &StreamConfig::default(),
        )
        .unwrap();

        let (controls, rx) = mpsc::unbounded_channel::<Control>();
        drop(controls);
        let summary = session.run(rx).await;
        assert_eq!(summary.elapsed, Duration::ZERO);
    }
}
