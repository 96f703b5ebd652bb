use std::collections::BTreeMap;

use super::types::FrameEvent;

/// Frame events keyed by the frame that activates them. Events of one frame
/// keep their generation order. They stay in the timeline after playback so
/// a loop restart can replay them.
#[derive(Debug, Default)]
pub struct EventTimeline {
    frames: BTreeMap<u16, Vec<FrameEvent>>,
    len: usize,
}

impl EventTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: FrameEvent) {
        self.frames.entry(event.frame).or_default().push(event);
        self.len += 1;
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = FrameEvent>) {
        for event in events {
            self.push(event);
        }
    }

    pub fn events_for(&self, frame: u16) -> &[FrameEvent] {
        self.frames.get(&frame).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.len = 0;
    }
}
