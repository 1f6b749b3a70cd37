use handknn_core::{Error, ExampleStore, Hand, Handedness, Label, Result, Snapshot, Vector};
use serde::Serialize;
use tracing::{debug, info, warn};
use crate::config::SessionConfig;

/// What the presentation layer learns about one hand
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandPrediction {
    /// Display name of the predicted class, or the configured "none" label
    pub label: String,
    pub confidence: f32,
    /// `None` when no hand was detected at all
    pub handedness: Option<Handedness>,
    /// Raw predicted label; `None` for the "no detection" sentinel
    pub class: Option<Label>,
}

impl HandPrediction {
    /// Whether every vote went to the predicted label
    pub fn is_certain(&self) -> bool {
        self.confidence >= 1.0
    }

    pub fn is_sentinel(&self) -> bool {
        self.class.is_none()
    }
}

/// Result of one detect/classify step
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub frame_number: u64,
    pub hands: Vec<Hand>,
    /// One entry per hand, or a single sentinel when no hand was found
    pub predictions: Vec<HandPrediction>,
}

/// Everything a session mutates, owned in one place
pub struct SessionContext {
    store: ExampleStore,
    config: SessionConfig,
    /// Features of the first hand in the latest frame
    last_vector: Option<Vector>,
}

impl SessionContext {
    pub fn new(store: ExampleStore, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            last_vector: None,
        })
    }

    pub fn store(&self) -> &ExampleStore {
        &self.store
    }

    pub fn into_store(self) -> ExampleStore {
        self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn last_vector(&self) -> Option<&Vector> {
        self.last_vector.as_ref()
    }

    fn sentinel(&self, handedness: Option<Handedness>) -> HandPrediction {
        HandPrediction {
            label: self.config.none_label.clone(),
            confidence: 1.0,
            handedness,
            class: None,
        }
    }

    /// Vectorize and classify every hand of a frame.
    ///
    /// Never fails: hands that cannot be classified, and frames without
    /// hands or without any trained class, yield the sentinel.
    pub fn classify_hands(&mut self, frame_number: u64, hands: Vec<Hand>) -> FrameOutcome {
        self.last_vector = None;

        if hands.is_empty() {
            return FrameOutcome {
                frame_number,
                hands,
                predictions: vec![self.sentinel(None)],
            };
        }

        let has_classes = self.store.num_classes() > 0;
        let mut predictions = Vec::with_capacity(hands.len());

        for (i, hand) in hands.iter().enumerate() {
            let vector = match hand.to_vector() {
                Ok(vector) => vector,
                Err(e) => {
                    warn!(frame_number, hand = i, "Skipping hand: {}", e);
                    predictions.push(self.sentinel(Some(hand.handedness)));
                    continue;
                }
            };

            let prediction = if has_classes {
                match self.store.predict_class(&vector) {
                    Ok(p) => HandPrediction {
                        label: self.config.class_names.display(&p.label),
                        confidence: p.confidence(),
                        handedness: Some(hand.handedness),
                        class: Some(p.label),
                    },
                    Err(e) => {
                        warn!(frame_number, hand = i, "Classification failed: {}", e);
                        self.sentinel(Some(hand.handedness))
                    }
                }
            } else {
                self.sentinel(Some(hand.handedness))
            };
            predictions.push(prediction);

            if i == 0 {
                self.last_vector = Some(vector);
            }
        }

        FrameOutcome {
            frame_number,
            hands,
            predictions,
        }
    }

    pub fn add_example(&mut self, vector: &Vector, label: Label) -> Result<()> {
        self.store.add_example(vector, label.clone())?;
        debug!(
            "Added example for {} ({} total)",
            label,
            self.store.example_count(&label)
        );
        Ok(())
    }

    /// Add the first hand of the latest frame as an example of `label`
    pub fn capture_example(&mut self, label: Label) -> Result<()> {
        let vector = self.last_vector.clone().ok_or_else(|| {
            Error::InvalidInput("no hand in the most recent frame".to_string())
        })?;
        self.add_example(&vector, label)
    }

    pub fn export_dataset(&self) -> Snapshot {
        self.store.export_dataset()
    }

    pub fn import_dataset(&mut self, snapshot: Snapshot) -> Result<()> {
        self.store.import_dataset(snapshot)?;
        info!(
            "Imported dataset: {} classes, {} examples",
            self.store.num_classes(),
            self.store.total_examples()
        );
        Ok(())
    }
}
