use tracing::debug;

use crate::interferometry::common::{Mask, Result};

/// How a mask was drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskShape {
    Circular,
    Rectangular,
    Polygon,
    #[default]
    Custom,
}

#[derive(Debug, Clone)]
pub struct MaskEntry {
    pub mask: Mask,
    pub shape: MaskShape,
    pub selected: bool,
    pub inverted: bool,
}

impl MaskEntry {
    /// The mask with its inversion flag applied.
    pub fn effective(&self) -> Mask {
        if self.inverted {
            self.mask.inverted()
        } else {
            self.mask.clone()
        }
    }
}

/// Ordered collection of user masks combined into one aperture.
///
/// The global aperture is the union of the selected masks (each inverted when
/// flagged), optionally inverted as a whole.
#[derive(Debug, Clone, Default)]
pub struct MaskSet {
    entries: Vec<MaskEntry>,
    global_inverted: bool,
}

impl MaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a selected, non-inverted mask; every mask must share one shape.
    pub fn add(&mut self, mask: Mask, shape: MaskShape) -> Result<usize> {
        if let Some(first) = self.entries.first() {
            first.mask.ensure_same_shape(&mask)?;
        }
        self.entries.push(MaskEntry {
            mask,
            shape,
            selected: true,
            inverted: false,
        });
        debug!(count = self.entries.len(), ?shape, "Mask added");
        Ok(self.entries.len() - 1)
    }

    pub fn remove(&mut self, index: usize) -> Option<MaskEntry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MaskEntry> {
        self.entries.get(index)
    }

    pub fn select(&mut self, index: usize, selected: bool) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.selected = selected;
        }
    }

    pub fn invert(&mut self, index: usize, inverted: bool) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.inverted = inverted;
        }
    }

    pub fn invert_global(&mut self, inverted: bool) {
        self.global_inverted = inverted;
    }

    /// Combined aperture, `None` when the set is empty.
    pub fn global_mask(&self) -> Option<Mask> {
        let first = self.entries.first()?;
        let mut global = first.mask.map(|_| false);
        for entry in self.entries.iter().filter(|entry| entry.selected) {
            global = global
                .zip_map(&entry.effective(), |&a, &b| a || b)
                .ok()?;
        }
        Some(if self.global_inverted {
            global.inverted()
        } else {
            global
        })
    }
}
