//! Progress checkpoints and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use log::info;

/// Pipeline checkpoints, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressStage {
    ParseStructure,
    BuildRelationships,
    Serialize,
    Validate,
    Finished,
}

impl ProgressStage {
    /// Percentage reported when the stage starts.
    pub fn percent(&self) -> u8 {
        match self {
            ProgressStage::ParseStructure => 10,
            ProgressStage::BuildRelationships => 50,
            ProgressStage::Serialize => 70,
            ProgressStage::Validate => 90,
            ProgressStage::Finished => 100,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProgressStage::ParseStructure => "Parsing structure",
            ProgressStage::BuildRelationships => "Building relationships",
            ProgressStage::Serialize => "Serializing",
            ProgressStage::Validate => "Validating",
            ProgressStage::Finished => "Finished",
        }
    }
}

/// One progress message sent to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    pub percent: u8,
    pub message: String,
}

/// Shared flag checked between pages and body blocks.
///
/// Clones observe the same flag, so one can be handed to a worker thread
/// while the caller keeps the other.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sends checkpoints to an optional channel.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProgressReporter {
    sender: Option<Sender<ProgressEvent>>,
}

impl ProgressReporter {
    pub(crate) fn new(sender: Option<Sender<ProgressEvent>>) -> Self {
        Self { sender }
    }

    pub(crate) fn report(&self, stage: ProgressStage, message: impl Into<String>) {
        let message = message.into();
        info!("[{}%] {}: {}", stage.percent(), stage.label(), message);
        if let Some(sender) = &self.sender {
            // A receiver that hung up only stops the reports, not the conversion.
            let _ = sender.send(ProgressEvent {
                stage,
                percent: stage.percent(),
                message,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_percentages_increase() {
        let stages = [
            ProgressStage::ParseStructure,
            ProgressStage::BuildRelationships,
            ProgressStage::Serialize,
            ProgressStage::Validate,
            ProgressStage::Finished,
        ];
        assert!(stages.windows(2).all(|w| w[0].percent() < w[1].percent()));
    }

    #[test]
    fn test_reporter_sends_events() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let reporter = ProgressReporter::new(Some(tx));
        reporter.report(ProgressStage::Serialize, "3 elements");
        let event = rx.try_recv().unwrap();
        assert_eq!(event.stage, ProgressStage::Serialize);
        assert_eq!(event.percent, 70);
        assert_eq!(event.message, "3 elements");
    }

    #[test]
    fn test_reporter_survives_disconnect() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        ProgressReporter::new(Some(tx)).report(ProgressStage::Finished, "done");
        ProgressReporter::default().report(ProgressStage::Finished, "done");
    }

    #[test]
    fn test_cancellation_token_shared() {
        let token = CancellationToken::new();
        let worker = token.clone();
        assert!(!worker.is_cancelled());
        token.cancel();
        assert!(worker.is_cancelled());
    }
}
