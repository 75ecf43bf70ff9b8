//! Entity ids and the `run_id`-class UUID helper.

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A 64-bit entity handle. `0` denotes "no entity" (`Id::INVALID`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub u64);

impl Id {
    pub const INVALID: Id = Id(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for Id {
    fn default() -> Self {
        Id::INVALID
    }
}

/// Allocates monotonically increasing ids. Lives on `GameState.next_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn starting_at(next: u64) -> Self {
        IdAllocator { next: next.max(1) }
    }

    pub fn alloc(&mut self) -> Id {
        let id = Id(self.next);
        self.next += 1;
        id
    }

    pub fn peek_next(&self) -> u64 {
        self.next
    }

    /// Ensures `next > id`, used by the fixer and by scenario loaders that
    /// insert entities with explicit ids.
    pub fn observe(&mut self, id: Id) {
        if id.0 >= self.next {
            self.next = id.0 + 1;
        }
    }
}

/// Generate a deterministic v4-format UUID from a seeded RNG. Used for
/// `run_id`/scenario-instance identifiers, never for entity `Id`s.
pub fn generate_uuid(rng: &mut impl Rng) -> Uuid {
    let bytes: [u8; 16] = rng.gen();
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn allocator_is_monotonic() {
        let mut a = IdAllocator::starting_at(1);
        let x = a.alloc();
        let y = a.alloc();
        assert!(y.0 > x.0);
    }

    #[test]
    fn observe_raises_next_past_existing_id() {
        let mut a = IdAllocator::starting_at(1);
        a.observe(Id(41));
        assert_eq!(a.alloc(), Id(42));
    }

    #[test]
    fn deterministic_uuid_from_same_seed() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(42);
        let mut rng2 = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(generate_uuid(&mut rng1), generate_uuid(&mut rng2));
    }

    #[test]
    fn different_seeds_produce_different_uuids() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(42);
        let mut rng2 = ChaCha8Rng::seed_from_u64(99);
        assert_ne!(generate_uuid(&mut rng1), generate_uuid(&mut rng2));
    }
}
