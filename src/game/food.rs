//! Food registry: a fixed arena of food slots
//!
//! Slots are allocated once when the session starts and are never removed.
//! Eating a food turns its slot into a tombstone; the handle stays valid.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, trace};

use super::error::GameError;
use super::state::{Grid, Position};

/// Random probes before falling back to a full scan of free cells
const RANDOM_ATTEMPTS: usize = 64;

/// Stable index of a food slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FoodHandle(usize);

impl FoodHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodSlot {
    Active {
        position: Position,
        /// Animation phase, taken from the shared clock
        phase: u32,
    },
    Eaten,
}

impl FoodSlot {
    pub fn position(&self) -> Option<Position> {
        match self {
            FoodSlot::Active { position, .. } => Some(*position),
            FoodSlot::Eaten => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FoodRegistry {
    grid: Grid,
    slots: Vec<FoodSlot>,
}

impl FoodRegistry {
    /// Empty registry for a grid
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            slots: Vec::new(),
        }
    }

    /// Place `count` food items, none on an occupied cell or on each other
    pub fn populate<R: Rng>(
        grid: Grid,
        count: usize,
        occupied: &HashSet<Position>,
        rng: &mut R,
    ) -> Result<Self, GameError> {
        let mut registry = Self {
            grid,
            slots: Vec::with_capacity(count),
        };
        for _ in 0..count {
            let position = registry.random_food(occupied, rng)?;
            registry.slots.push(FoodSlot::Active { position, phase: 0 });
        }
        debug!(count, "food placed");
        Ok(registry)
    }

    /// Pick a cell that holds neither a snake nor active food.
    ///
    /// Returns `RegistryExhausted` when the grid is saturated; the registry
    /// is left untouched either way.
    pub fn random_food<R: Rng>(
        &self,
        occupied: &HashSet<Position>,
        rng: &mut R,
    ) -> Result<Position, GameError> {
        let is_free = |pos: Position| !occupied.contains(&pos) && self.find_at(pos).is_none();

        for _ in 0..RANDOM_ATTEMPTS {
            let pos = self.grid.position(
                rng.gen_range(0..self.grid.width),
                rng.gen_range(0..self.grid.height),
            );
            if is_free(pos) {
                return Ok(pos);
            }
        }

        let free: Vec<Position> = self.grid.cells().filter(|pos| is_free(*pos)).collect();
        free.choose(rng)
            .copied()
            .ok_or(GameError::RegistryExhausted {
                width: self.grid.width,
                height: self.grid.height,
            })
    }

    /// First active food at `pos`, in slot order
    pub fn find_at(&self, pos: Position) -> Option<FoodHandle> {
        self.slots
            .iter()
            .position(|slot| slot.position() == Some(pos))
            .map(FoodHandle)
    }

    /// Tombstone a slot. Returns false if it was already eaten.
    pub fn mark_eaten(&mut self, handle: FoodHandle) -> bool {
        match self.slots.get_mut(handle.0) {
            Some(slot) if slot.position().is_some() => {
                *slot = FoodSlot::Eaten;
                true
            }
            _ => false,
        }
    }

    pub fn slot(&self, handle: FoodHandle) -> Option<&FoodSlot> {
        self.slots.get(handle.0)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.position().is_some()).count()
    }

    /// Active food with its animation phase, in slot order
    pub fn iter_active(&self) -> impl Iterator<Item = (FoodHandle, Position, u32)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                FoodSlot::Active { position, phase } => Some((FoodHandle(i), *position, *phase)),
                FoodSlot::Eaten => None,
            })
    }

    pub fn active_positions(&self) -> Vec<Position> {
        self.iter_active().map(|(_, pos, _)| pos).collect()
    }

    /// Advance animation state. No gameplay effect.
    pub fn update(&mut self, tick: u32) -> Result<(), GameError> {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let FoodSlot::Active { position, phase } = slot {
                if !self.grid.contains(*position) {
                    return Err(GameError::FoodOutOfBounds {
                        slot: i,
                        at: *position,
                    });
                }
                *phase = tick;
            }
        }
        trace!(tick, "food animation advanced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_populate_avoids_occupied() {
        let grid = Grid::new(4, 4);
        let occupied: HashSet<_> = grid.cells().take(10).collect();

        let registry = FoodRegistry::populate(grid, 6, &occupied, &mut rng()).unwrap();

        assert_eq!(registry.capacity(), 6);
        assert_eq!(registry.active_count(), 6);
        let positions = registry.active_positions();
        let unique: HashSet<_> = positions.iter().copied().collect();
        assert_eq!(unique.len(), 6);
        assert!(positions.iter().all(|pos| !occupied.contains(pos)));
    }

    #[test]
    fn test_exhausted_grid_leaves_registry_unchanged() {
        let grid = Grid::new(2, 2);
        let occupied: HashSet<_> = grid.cells().take(3).collect();
        let registry = FoodRegistry::populate(grid, 1, &occupied, &mut rng()).unwrap();
        let before = registry.active_positions();

        let result = registry.random_food(&occupied, &mut rng());

        assert_eq!(
            result,
            Err(GameError::RegistryExhausted {
                width: 2,
                height: 2
            })
        );
        assert_eq!(registry.active_positions(), before);
    }

    #[test]
    fn test_populate_fails_when_saturated() {
        let grid = Grid::new(2, 2);
        let occupied: HashSet<_> = grid.cells().collect();
        let result = FoodRegistry::populate(grid, 1, &occupied, &mut rng());
        assert!(matches!(result, Err(GameError::RegistryExhausted { .. })));
    }

    #[test]
    fn test_mark_eaten_is_idempotent() {
        let grid = Grid::new(5, 5);
        let mut registry = FoodRegistry::populate(grid, 2, &HashSet::new(), &mut rng()).unwrap();
        let pos = registry.active_positions()[0];
        let handle = registry.find_at(pos).unwrap();

        assert!(registry.mark_eaten(handle));
        assert!(!registry.mark_eaten(handle));
        assert_eq!(registry.slot(handle), Some(&FoodSlot::Eaten));
        assert_eq!(registry.find_at(pos), None);
        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.capacity(), 2);
    }

    #[test]
    fn test_update_sets_phase() {
        let grid = Grid::new(5, 5);
        let mut registry = FoodRegistry::populate(grid, 3, &HashSet::new(), &mut rng()).unwrap();

        registry.update(4).unwrap();

        assert!(registry.iter_active().all(|(_, _, phase)| phase == 4));
    }

    #[test]
    fn test_update_rejects_off_grid_food() {
        let mut registry = FoodRegistry::new(Grid::new(3, 3));
        registry.slots.push(FoodSlot::Active {
            position: Position::new(7, 7),
            phase: 0,
        });

        assert!(matches!(
            registry.update(1),
            Err(GameError::FoodOutOfBounds { slot: 0, .. })
        ));
    }
}
