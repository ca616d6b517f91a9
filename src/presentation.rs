//! Full-screen, one-quote-at-a-time display for projecting the wall.

use crate::{
    floating::DeviceClass,
    models::{quotes::Quote, snapshot::Snapshot},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Presentation {
    index: usize,
}

impl Presentation {
    /// Only offered on wide screens, and only with something to show.
    pub fn available(device: DeviceClass, total: usize) -> bool {
        device == DeviceClass::Desktop && total > 0
    }

    pub fn at(index: usize, total: usize) -> Self {
        let mut presentation = Presentation { index };
        presentation.clamp(total);
        presentation
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn next(&mut self, total: usize) {
        if total > 0 {
            self.index = (self.index + 1) % total;
        }
    }

    pub fn prev(&mut self, total: usize) {
        if total > 0 {
            self.index = if self.index == 0 {
                total - 1
            } else {
                self.index - 1
            };
        }
    }

    /// Keeps the index valid after the snapshot shrank.
    pub fn clamp(&mut self, total: usize) {
        self.index = self.index.min(total.saturating_sub(1));
    }

    pub fn current<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a Quote> {
        snapshot.get(self.index)
    }

    pub fn counter_label(&self, total: usize) -> String {
        format!("{} / {}", self.index + 1, total)
    }
}
