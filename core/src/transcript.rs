//! JSON persistence of a session's committed messages.

use std::io::Write;
use std::path::Path;

use parley_protocol::Message;
use serde::Deserialize;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::HistoryError;
use crate::error::TranscriptError;
use crate::history::ConversationHistory;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transcript {
    pub session_id: String,
    pub messages: Vec<Message>,
}

impl Transcript {
    pub fn new(session_id: impl Into<String>, history: &ConversationHistory) -> Self {
        Self {
            session_id: session_id.into(),
            messages: history.messages().to_vec(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, TranscriptError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes the transcript through a temporary file in the target
    /// directory, so a crash never leaves a truncated transcript behind.
    pub fn save(&self, path: &Path) -> Result<(), TranscriptError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        file.write_all(b"\n")?;
        file.persist(path).map_err(|e| TranscriptError::Io(e.error))?;
        Ok(())
    }

    pub fn rounds(&self) -> u32 {
        u32::try_from(self.messages.len() / 2).unwrap_or(u32::MAX)
    }

    pub fn into_history(self) -> Result<ConversationHistory, HistoryError> {
        ConversationHistory::from_messages(self.messages)
    }
}
