//! The frame protocol streamed to callers.
//!
//! Per tool-calling turn: `tool_start` (names only), one `tool_result` per
//! call, then exactly one `tool_complete`. The terminal turn's prose arrives
//! as `text`. Every stream ends with exactly one `done` or `error`.

use grantscout_core::Error;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Frames buffered between the orchestrator task and the transport.
pub const FRAME_BUFFER: usize = 64;

/// One unit of the response stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Tools about to run for this turn.
    ToolStart { tools: Vec<String> },

    /// One finished call, with the full client-facing payload.
    ToolResult {
        id: String,
        name: String,
        result: serde_json::Value,
        is_error: bool,
    },

    /// All calls of the turn have finished.
    ToolComplete { count: usize },

    /// Assistant prose.
    Text { content: String },

    /// Fatal failure; terminal.
    Error { message: String },

    /// Normal end of stream; terminal.
    Done,
}

impl Frame {
    /// SSE event name for this frame.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ToolStart { .. } => "tool_start",
            Self::ToolResult { .. } => "tool_result",
            Self::ToolComplete { .. } => "tool_complete",
            Self::Text { .. } => "text",
            Self::Error { .. } => "error",
            Self::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}

/// Ordered, single-termination writer over a frame channel.
///
/// Rejects frames that would break the per-turn ordering. Once a terminal
/// frame has gone out, further sends are silently dropped. A closed receiver
/// surfaces as [`Error::Cancelled`].
pub struct FrameSink {
    tx: mpsc::Sender<Frame>,
    in_turn: bool,
    terminated: bool,
    sent: usize,
}

impl FrameSink {
    pub fn new(tx: mpsc::Sender<Frame>) -> Self {
        Self {
            tx,
            in_turn: false,
            terminated: false,
            sent: 0,
        }
    }

    /// A sink and its receiving end.
    pub fn channel() -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        (Self::new(tx), rx)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Frames delivered so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    pub async fn send(&mut self, frame: Frame) -> Result<(), Error> {
        if self.terminated {
            return Ok(());
        }
        self.check_order(&frame)?;

        match &frame {
            Frame::ToolStart { .. } => self.in_turn = true,
            Frame::ToolComplete { .. } => self.in_turn = false,
            Frame::Done | Frame::Error { .. } => self.terminated = true,
            Frame::ToolResult { .. } | Frame::Text { .. } => {}
        }

        self.tx.send(frame).await.map_err(|_| Error::Cancelled)?;
        self.sent += 1;
        Ok(())
    }

    fn check_order(&self, frame: &Frame) -> Result<(), Error> {
        let ok = match frame {
            Frame::ToolStart { .. } | Frame::Text { .. } => !self.in_turn,
            Frame::ToolResult { .. } | Frame::ToolComplete { .. } => self.in_turn,
            // A fatal error may interrupt a turn.
            Frame::Error { .. } => true,
            Frame::Done => !self.in_turn,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::Internal(format!(
                "frame '{}' out of order",
                frame.event_type()
            )))
        }
    }
}
