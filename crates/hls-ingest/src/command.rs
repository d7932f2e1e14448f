//! Commands exchanged between the ingest thread and the playback consumer.

use std::sync::Arc;

use aac::{AudioFormat, AudioFrame};
use cea608::CaptionRun;
use pipeline_common::Command;

use crate::IngestError;

/// Work handed to the playback consumer
#[derive(Debug, Clone)]
pub enum PipelineCommand {
    /// Stream format, sent before the first sample
    Format(AudioFormat),
    /// One audio access unit
    Sample(AudioFrame),
    /// A caption page to display
    Caption {
        /// Display time in 100 ns ticks
        timestamp: u64,
        /// The page
        caption: CaptionRun,
    },
    /// Playback restarts at this position (100 ns ticks)
    Seek(u64),
    /// Stop consuming
    Close,
    /// The stream failed and must be torn down
    Error(Arc<IngestError>),
}

/// Tag of a [`PipelineCommand`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// [`PipelineCommand::Format`]
    Format,
    /// [`PipelineCommand::Sample`]
    Sample,
    /// [`PipelineCommand::Caption`]
    Caption,
    /// [`PipelineCommand::Seek`]
    Seek,
    /// [`PipelineCommand::Close`]
    Close,
    /// [`PipelineCommand::Error`]
    Error,
}

impl Command for PipelineCommand {
    type Kind = CommandKind;

    fn kind(&self) -> CommandKind {
        match self {
            PipelineCommand::Format(_) => CommandKind::Format,
            PipelineCommand::Sample(_) => CommandKind::Sample,
            PipelineCommand::Caption { .. } => CommandKind::Caption,
            PipelineCommand::Seek(_) => CommandKind::Seek,
            PipelineCommand::Close => CommandKind::Close,
            PipelineCommand::Error(_) => CommandKind::Error,
        }
    }
}

impl PipelineCommand {
    /// True for commands after which the consumer stops
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineCommand::Close | PipelineCommand::Error(_))
    }
}
