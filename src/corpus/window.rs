//! Sliding-window contextualization of transcript rows.
//!
//! Splits each video into overlapping runs of consecutive utterances.

use super::{ContextWindow, TranscriptRow};
use crate::error::{EtoError, Result};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Build context windows of `window` utterances, advancing by `stride`.
///
/// Rows are grouped by title; videos are emitted in title order and rows
/// within a video keep their input order. A window starts at every multiple
/// of `stride` that leaves room for `window` utterances, so videos shorter
/// than `window` contribute nothing.
#[instrument(skip(rows), fields(rows = rows.len()))]
pub fn contextualize(rows: &[TranscriptRow], window: usize, stride: usize) -> Result<Vec<ContextWindow>> {
    if window == 0 || stride == 0 {
        return Err(EtoError::Config(format!(
            "window ({}) and stride ({}) must be positive",
            window, stride
        )));
    }
    if stride >= window {
        return Err(EtoError::Config(format!(
            "stride ({}) must be smaller than window ({}) for windows to overlap",
            stride, window
        )));
    }

    let mut videos: BTreeMap<&str, Vec<&TranscriptRow>> = BTreeMap::new();
    for row in rows {
        videos.entry(row.title.as_str()).or_default().push(row);
    }

    let mut contexts = Vec::new();
    for utterances in videos.values() {
        if utterances.len() < window {
            continue;
        }

        for start in (0..=utterances.len() - window).step_by(stride) {
            let span = &utterances[start..start + window];
            let first = span[0];
            let last = span[window - 1];

            contexts.push(ContextWindow {
                title: first.title.clone(),
                published: first.published.clone(),
                url: first.url.clone(),
                video_id: first.video_id.clone(),
                channel_id: first.channel_id.clone(),
                id: first.id.clone(),
                text: span.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join(" "),
                start: first.start,
                end: last.end,
            });
        }
    }

    debug!("Built {} context windows from {} videos", contexts.len(), videos.len());
    Ok(contexts)
}
