//! The per-frame loop.
//!
//! One loop iteration is either a command from a [`SessionHandle`] or a
//! frame tick running detect, classify and present to completion. Queued
//! commands are drained before the next frame starts.

use handknn_core::{Error, Label, Result, Snapshot, Vector};
use std::future::Future;
use std::ops::ControlFlow;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use crate::collaborator::{FrameSource, HandDetector, Presenter};
use crate::context::{FrameOutcome, SessionContext};

enum Command {
    AddExample {
        vector: Vector,
        label: Label,
        reply: oneshot::Sender<Result<()>>,
    },
    CaptureExample {
        label: Label,
        reply: oneshot::Sender<Result<()>>,
    },
    ExportDataset {
        reply: oneshot::Sender<Snapshot>,
    },
    ImportDataset {
        snapshot: Snapshot,
        reply: oneshot::Sender<Result<()>>,
    },
    Stop,
}

enum LoopEvent {
    Command(Option<Command>),
    Tick,
}

/// Counters reported when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: u64,
    /// Hands that received a real prediction
    pub classified: u64,
    /// Sentinel predictions handed to the presenter
    pub sentinels: u64,
}

impl SessionSummary {
    fn record(&mut self, outcome: &FrameOutcome) {
        for p in &outcome.predictions {
            if p.is_sentinel() {
                self.sentinels += 1;
            } else {
                self.classified += 1;
            }
        }
    }
}

/// Cloneable handle for UI-triggered operations.
///
/// Every request is queued when the method is called; the returned future
/// only waits for the session's reply.
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::UnboundedSender<Command>,
}

impl SessionHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.sender.send(command).map_err(|_| Error::SessionClosed)
    }

    pub fn add_example(
        &self,
        vector: Vector,
        label: impl Into<Label>,
    ) -> impl Future<Output = Result<()>> {
        let (reply, rx) = oneshot::channel();
        let sent = self.send(Command::AddExample {
            vector,
            label: label.into(),
            reply,
        });
        async move {
            sent?;
            rx.await.map_err(|_| Error::SessionClosed)?
        }
    }

    /// Add the first hand of the most recent frame as an example
    pub fn capture_example(&self, label: impl Into<Label>) -> impl Future<Output = Result<()>> {
        let (reply, rx) = oneshot::channel();
        let sent = self.send(Command::CaptureExample {
            label: label.into(),
            reply,
        });
        async move {
            sent?;
            rx.await.map_err(|_| Error::SessionClosed)?
        }
    }

    pub fn export_dataset(&self) -> impl Future<Output = Result<Snapshot>> {
        let (reply, rx) = oneshot::channel();
        let sent = self.send(Command::ExportDataset { reply });
        async move {
            sent?;
            rx.await.map_err(|_| Error::SessionClosed)
        }
    }

    pub fn import_dataset(&self, snapshot: Snapshot) -> impl Future<Output = Result<()>> {
        let (reply, rx) = oneshot::channel();
        let sent = self.send(Command::ImportDataset { snapshot, reply });
        async move {
            sent?;
            rx.await.map_err(|_| Error::SessionClosed)?
        }
    }

    /// Ask the loop to finish after the current step
    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }
}

pub struct Session<S, D, P> {
    context: SessionContext,
    source: S,
    detector: D,
    presenter: P,
    commands: mpsc::UnboundedReceiver<Command>,
    commands_open: bool,
}

impl<S, D, P> Session<S, D, P>
where
    S: FrameSource,
    D: HandDetector<S::Frame>,
    P: Presenter<S::Frame>,
{
    pub fn new(context: SessionContext, source: S, detector: D, presenter: P) -> (Self, SessionHandle) {
        let (sender, commands) = mpsc::unbounded_channel();
        let session = Self {
            context,
            source,
            detector,
            presenter,
            commands,
            commands_open: true,
        };
        (session, SessionHandle { sender })
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn into_context(self) -> SessionContext {
        self.context
    }

    /// Drive the loop until the source runs dry or a stop is requested.
    ///
    /// Only a media failure is fatal. Detector, classifier and presenter
    /// failures are logged and the frame degrades to the sentinel.
    pub async fn run(&mut self) -> Result<SessionSummary> {
        if let Err(e) = self.source.start().await {
            error!("Cannot start the media source: {}. Grant camera access and restart the session.", e);
            return Err(e);
        }
        info!(
            "Session started: {} classes, {} examples",
            self.context.store().num_classes(),
            self.context.store().total_examples()
        );

        let mut ticker = tokio::time::interval(self.context.config().frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut summary = SessionSummary::default();

        loop {
            let event = tokio::select! {
                biased;
                command = self.commands.recv(), if self.commands_open => LoopEvent::Command(command),
                _ = ticker.tick() => LoopEvent::Tick,
            };

            match event {
                LoopEvent::Command(Some(command)) => {
                    if self.apply(command).is_break() {
                        info!("Stop requested");
                        break;
                    }
                }
                LoopEvent::Command(None) => {
                    debug!("All session handles dropped");
                    self.commands_open = false;
                }
                LoopEvent::Tick => {
                    if self.step(&mut summary).await?.is_break() {
                        break;
                    }
                }
            }
        }

        // Serve what was queued before the loop ended, refuse the rest
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            let _ = self.apply(command);
        }

        info!(
            "Session finished: {} frames, {} classified, {} sentinels",
            summary.frames, summary.classified, summary.sentinels
        );
        Ok(summary)
    }

    async fn step(&mut self, summary: &mut SessionSummary) -> Result<ControlFlow<()>> {
        let frame = match self.source.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("Frame source finished");
                return Ok(ControlFlow::Break(()));
            }
            Err(e @ Error::MediaAccessDenied(_)) => {
                error!("Lost access to the media source: {}", e);
                return Err(e);
            }
            Err(e) => {
                warn!("Frame capture failed: {}", e);
                return Ok(ControlFlow::Continue(()));
            }
        };

        let frame_number = summary.frames;
        summary.frames += 1;

        let estimation = self.context.config().estimation;
        let hands = match self.detector.estimate_hands(&frame, &estimation).await {
            Ok(hands) => hands,
            Err(e) => {
                warn!(frame_number, "Hand detection failed: {}", e);
                Vec::new()
            }
        };

        let outcome = self.context.classify_hands(frame_number, hands);
        summary.record(&outcome);

        if let Err(e) = self.presenter.present(&frame, &outcome) {
            warn!(frame_number, "Presenter failed: {}", e);
        }
        Ok(ControlFlow::Continue(()))
    }

    fn apply(&mut self, command: Command) -> ControlFlow<()> {
        // A dropped reply receiver only means the caller stopped waiting
        match command {
            Command::AddExample { vector, label, reply } => {
                let _ = reply.send(self.context.add_example(&vector, label));
            }
            Command::CaptureExample { label, reply } => {
                let _ = reply.send(self.context.capture_example(label));
            }
            Command::ExportDataset { reply } => {
                let _ = reply.send(self.context.export_dataset());
            }
            Command::ImportDataset { snapshot, reply } => {
                let _ = reply.send(self.context.import_dataset(snapshot));
            }
            Command::Stop => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }
}
