//! The three-block tray: each refill offers three blocks in three distinct colours.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use sandbridge::{BlockKind, BlockShape, SandColor};

pub const TRAY_SLOTS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct TrayBlock {
    pub kind: BlockKind,
    pub color: SandColor,
    pub shape: BlockShape,
}

#[derive(Debug, Clone)]
pub struct Tray {
    slots: [Option<TrayBlock>; TRAY_SLOTS],
    selected: usize,
    palette: Vec<SandColor>,
    sub_square_size: usize,
    rng: Pcg32,
}

impl Tray {
    pub fn new(seed: u64, sub_square_size: usize, palette: &[SandColor]) -> Self {
        let mut tray = Self {
            slots: Default::default(),
            selected: 0,
            palette: if palette.len() >= TRAY_SLOTS {
                palette.to_vec()
            } else {
                SandColor::BASE.to_vec()
            },
            sub_square_size: sub_square_size.max(1),
            rng: Pcg32::seed_from_u64(seed),
        };
        tray.refill();
        tray
    }

    pub fn slots(&self) -> &[Option<TrayBlock>] {
        &self.slots
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&TrayBlock> {
        self.slots[self.selected].as_ref()
    }

    pub fn select(&mut self, index: usize) {
        if index < TRAY_SLOTS {
            self.selected = index;
        }
    }

    /// Next slot that still holds a block, wrapping.
    pub fn select_next(&mut self) {
        for step in 1..=TRAY_SLOTS {
            let i = (self.selected + step) % TRAY_SLOTS;
            if self.slots[i].is_some() {
                self.selected = i;
                return;
            }
        }
    }

    /// Take the selected block. When the last one goes the tray refills.
    pub fn take_selected(&mut self) -> Option<TrayBlock> {
        let block = self.slots[self.selected].take()?;
        if self.slots.iter().all(Option::is_none) {
            self.refill();
        } else {
            self.select_next();
        }
        Some(block)
    }

    /// Fresh set of blocks with distinct colours.
    pub fn refill(&mut self) {
        let mut colors = self.palette.clone();
        colors.shuffle(&mut self.rng);
        for (slot, color) in self.slots.iter_mut().zip(colors) {
            let kind = BlockKind::ALL[self.rng.random_range(0..BlockKind::ALL.len())];
            *slot = Some(TrayBlock {
                kind,
                color,
                shape: BlockShape::from_kind(kind, self.sub_square_size),
            });
        }
        self.selected = 0;
        log::debug!(
            "tray refilled: {:?}",
            self.slots
                .iter()
                .flatten()
                .map(|b| (b.kind.name(), b.color.name()))
                .collect::<Vec<_>>()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_refill_has_distinct_colours() {
        for seed in 0..50 {
            let tray = Tray::new(seed, 2, &SandColor::BASE);
            let colors: HashSet<_> = tray.slots().iter().flatten().map(|b| b.color).collect();
            assert_eq!(colors.len(), TRAY_SLOTS);
        }
    }

    #[test]
    fn test_refills_only_after_all_used() {
        let mut tray = Tray::new(7, 2, &SandColor::BASE);
        assert!(tray.take_selected().is_some());
        assert_eq!(tray.slots().iter().flatten().count(), 2);
        assert!(tray.take_selected().is_some());
        assert_eq!(tray.slots().iter().flatten().count(), 1);
        assert!(tray.take_selected().is_some());
        assert_eq!(tray.slots().iter().flatten().count(), 3);
        assert_eq!(tray.selected_index(), 0);
    }

    #[test]
    fn test_empty_slot_yields_nothing() {
        let mut tray = Tray::new(1, 2, &SandColor::BASE);
        tray.take_selected();
        tray.select(0);
        assert!(tray.take_selected().is_none());
        tray.select(9);
        assert_eq!(tray.selected_index(), 0);
    }

    #[test]
    fn test_shape_uses_sub_square_size() {
        let tray = Tray::new(3, 4, &SandColor::ALL);
        let block = tray.selected().unwrap();
        assert_eq!(block.shape.len(), block.kind.cells().len() * 16);
    }

    #[test]
    fn test_same_seed_same_tray() {
        let a = Tray::new(42, 3, &SandColor::BASE);
        let b = Tray::new(42, 3, &SandColor::BASE);
        assert_eq!(a.slots(), b.slots());
    }
}
