//! Fixed-capacity entity storage with an occupancy bitmask.
//!
//! Every kind of entity in the world lives in a `Pool` whose capacity is fixed
//! at compile time. Spawning into a full pool is silently dropped: the caller
//! gets `None` back and nothing else happens. A slot is either inactive (and
//! holds `T::default()`) or holds a fully initialised entity.
//!
//! On the wire a pool is encoded as `ceil(N / 8)` occupancy bytes followed by
//! all `N` slots, so its encoded size never depends on how many entities are
//! alive.

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

#[derive(Debug, Clone, PartialEq)]
pub struct Pool<T, const N: usize> {
    slots: Vec<T>,
    occupied: u128,
}

impl<T: Default, const N: usize> Pool<T, N> {
    const CAPACITY_FITS_MASK: () = assert!(N > 0 && N <= 128, "pool capacity must be 1..=128");

    /// Number of occupancy bytes that precede the slots on the wire
    pub const MASK_BYTES: usize = (N + 7) / 8;

    const FULL_MASK: u128 = if N == 128 { u128::MAX } else { (1u128 << N) - 1 };

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_FITS_MASK;
        Self {
            slots: (0..N).map(|_| T::default()).collect(),
            occupied: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of active slots
    pub fn len(&self) -> usize {
        self.occupied.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    pub fn is_full(&self) -> bool {
        self.occupied == Self::FULL_MASK
    }

    pub fn is_active(&self, index: usize) -> bool {
        index < N && self.occupied & (1u128 << index) != 0
    }

    /// Index of the lowest inactive slot
    pub fn first_free(&self) -> Option<usize> {
        let free = !self.occupied & Self::FULL_MASK;
        if free == 0 {
            None
        } else {
            Some(free.trailing_zeros() as usize)
        }
    }

    /// Activates the lowest free slot with `value`.
    ///
    /// Returns the slot index, or `None` when the pool is full. A full pool
    /// never grows and never reports an error beyond that `None`.
    pub fn spawn(&mut self, value: T) -> Option<usize> {
        let index = self.first_free()?;
        self.slots[index] = value;
        self.occupied |= 1u128 << index;
        Some(index)
    }

    /// Activates a specific slot, replacing whatever it held.
    ///
    /// Returns false if `index` is out of range.
    pub fn insert_at(&mut self, index: usize, value: T) -> bool {
        if index >= N {
            return false;
        }
        self.slots[index] = value;
        self.occupied |= 1u128 << index;
        true
    }

    /// Deactivates a slot and resets it to `T::default()`.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if !self.is_active(index) {
            return None;
        }
        self.occupied &= !(1u128 << index);
        Some(std::mem::take(&mut self.slots[index]))
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if self.is_active(index) {
            self.slots.get(index)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if self.is_active(index) {
            self.slots.get_mut(index)
        } else {
            None
        }
    }

    /// Iterates active slots as `(index, &entity)`
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        let occupied = self.occupied;
        self.slots
            .iter()
            .enumerate()
            .filter(move |&(i, _)| occupied & (1u128 << i) != 0)
    }

    /// Iterates active slots mutably as `(index, &mut entity)`
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> + '_ {
        let occupied = self.occupied;
        self.slots
            .iter_mut()
            .enumerate()
            .filter(move |&(i, _)| occupied & (1u128 << i) != 0)
    }

    /// Deactivates every active slot for which `keep` returns false.
    ///
    /// Returns the number of slots removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let mut removed = 0;
        for index in 0..N {
            if self.is_active(index) && !keep(&self.slots[index]) {
                self.remove(index);
                removed += 1;
            }
        }
        removed
    }
}

impl<T: Default, const N: usize> Default for Pool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + Default, const N: usize> Serialize for Pool<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(Self::MASK_BYTES + N)?;
        let mask = self.occupied.to_le_bytes();
        for byte in &mask[..Self::MASK_BYTES] {
            tuple.serialize_element(byte)?;
        }
        for slot in &self.slots {
            tuple.serialize_element(slot)?;
        }
        tuple.end()
    }
}

struct PoolVisitor<T, const N: usize>(PhantomData<T>);

impl<'de, T, const N: usize> Visitor<'de> for PoolVisitor<T, N>
where
    T: Deserialize<'de> + Default,
{
    type Value = Pool<T, N>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a pool of {} slots", N)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mask_bytes = Pool::<T, N>::MASK_BYTES;

        let mut mask = [0u8; 16];
        for (i, byte) in mask.iter_mut().enumerate().take(mask_bytes) {
            *byte = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        let occupied = u128::from_le_bytes(mask);
        if occupied & !Pool::<T, N>::FULL_MASK != 0 {
            return Err(de::Error::custom("occupancy bits beyond pool capacity"));
        }

        let mut pool = Pool::<T, N>::new();
        for i in 0..N {
            let slot: T = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(mask_bytes + i, &self))?;
            if occupied & (1u128 << i) != 0 {
                pool.insert_at(i, slot);
            }
        }
        Ok(pool)
    }
}

impl<'de, T, const N: usize> Deserialize<'de> for Pool<T, N>
where
    T: Deserialize<'de> + Default,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_tuple(
            Pool::<T, N>::MASK_BYTES + N,
            PoolVisitor::<T, N>(PhantomData),
        )
    }
}
