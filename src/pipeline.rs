//! Frame input for the service.
//!
//! Camera capture, color filtering, and contour extraction run in the
//! upstream detection pipeline; this module consumes its per-frame output
//! stream and hands observations to the tracker.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Stdin};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geometry::TargetObservation;

/// Per-frame output of the upstream detection pipeline.
///
/// Encoded as one JSON object per line:
///
/// ```json
/// {"observation":{"rect":{"x":290.0,"y":220.0,"width":60.0,"height":40.0},"frame_width":640.0,"frame_height":480.0}}
/// ```
///
/// A frame with no detected target carries `{"observation":null}` or an
/// empty object.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineResult {
    /// The detection chosen by the pipeline, if the frame had one.
    pub observation: Option<TargetObservation>,
}

/// Source of per-frame pipeline results.
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    /// The next frame's result, or `None` once the stream has ended.
    async fn next_frame(&mut self) -> Option<PipelineResult>;
}

/// Replays recorded pipeline results from a JSON-lines reader.
///
/// Blank lines are skipped. A line that fails to parse is logged and
/// skipped so a single corrupt record cannot end a replay.
#[derive(Debug)]
pub struct ReplaySource<R> {
    reader: R,
    line: u64,
}

impl<R: BufRead> ReplaySource<R> {
    /// Replay from any buffered reader of JSON lines.
    pub fn new(reader: R) -> Self {
        Self { reader, line: 0 }
    }
}

impl ReplaySource<BufReader<File>> {
    /// Replay from a recorded file.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl ReplaySource<BufReader<Stdin>> {
    /// Read frames piped from a live pipeline on standard input.
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()))
    }
}

impl<R: BufRead> FrameSource for ReplaySource<R> {
    async fn next_frame(&mut self) -> Option<PipelineResult> {
        loop {
            let mut buf = String::new();
            match self.reader.read_line(&mut buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line += 1;
                    let trimmed = buf.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str(trimmed) {
                        Ok(result) => return Some(result),
                        Err(e) => {
                            tracing::warn!(
                                "Skipping unparsable frame on line {}: {}",
                                self.line,
                                e
                            );
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Frame input failed after line {}: {}", self.line, e);
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingRect;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_replays_target_and_empty_frames() {
        let lines = concat!(
            r#"{"observation":{"rect":{"x":290.0,"y":220.0,"width":60.0,"height":40.0},"frame_width":640.0,"frame_height":480.0}}"#,
            "\n",
            r#"{"observation":null}"#,
            "\n",
        );
        let mut source = ReplaySource::new(Cursor::new(lines));

        let first = source.next_frame().await.unwrap();
        let observation = first.observation.unwrap();
        assert_eq!(observation.rect, BoundingRect::new(290.0, 220.0, 60.0, 40.0));
        assert_eq!(observation.frame_width, 640.0);

        let second = source.next_frame().await.unwrap();
        assert_eq!(second.observation, None);

        assert_eq!(source.next_frame().await, None);
    }

    #[tokio::test]
    async fn test_blank_and_corrupt_lines_are_skipped() {
        let lines = "\n{not json}\n{\"observation\":null}\n";
        let mut source = ReplaySource::new(Cursor::new(lines));

        assert_eq!(
            source.next_frame().await,
            Some(PipelineResult { observation: None })
        );
        assert_eq!(source.next_frame().await, None);
    }

    #[tokio::test]
    async fn test_missing_observation_field_reads_as_empty_frame() {
        let mut source = ReplaySource::new(Cursor::new("{}\n"));
        assert_eq!(
            source.next_frame().await,
            Some(PipelineResult { observation: None })
        );
    }
}
