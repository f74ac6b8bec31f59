// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Lock-variant expansion and the grab registry
//!
//! X11 matches a passive grab against the exact modifier state, so a grab
//! on `Ctrl+F1` stops firing as soon as Caps Lock or Num Lock is on. Every
//! logical grab is therefore registered four times, once per lock state.

use std::collections::HashMap;

use crate::core::{KeyCombo, MappingId, Modifiers, MOD_LOCK};

/// Lock-modifier state a physical grab is registered under
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LockVariant {
    Plain,
    CapsLock,
    NumLock,
    Both,
}

impl LockVariant {
    pub const ALL: [LockVariant; 4] = [
        LockVariant::Plain,
        LockVariant::CapsLock,
        LockVariant::NumLock,
        LockVariant::Both,
    ];

    /// Lock bits added for this variant, given the server's NumLock bit
    pub const fn lock_bits(self, numlock_mask: u16) -> u16 {
        match self {
            LockVariant::Plain => 0,
            LockVariant::CapsLock => MOD_LOCK,
            LockVariant::NumLock => numlock_mask,
            LockVariant::Both => MOD_LOCK | numlock_mask,
        }
    }

    /// Physical modifier mask for a base mask
    pub const fn apply(self, base: u16, numlock_mask: u16) -> u16 {
        base | self.lock_bits(numlock_mask)
    }
}

/// Registers all four lock variants of `base`, or none of them
///
/// `register` is called once per variant. If any call fails, every variant
/// already registered is passed to `release` (newest first) before the
/// error is returned, so a failed grab never leaves a partial handle.
///
/// Returns the physical masks registered, in `LockVariant::ALL` order.
pub fn register_variants<E>(
    base: u16,
    numlock_mask: u16,
    mut register: impl FnMut(u16) -> Result<(), E>,
    mut release: impl FnMut(u16),
) -> Result<Vec<u16>, E> {
    let mut registered: Vec<u16> = Vec::with_capacity(LockVariant::ALL.len());

    for variant in LockVariant::ALL {
        let mask = variant.apply(base, numlock_mask);

        // NumLock on an unusual bit may coincide with Lock
        if registered.contains(&mask) {
            continue;
        }

        if let Err(e) = register(mask) {
            for done in registered.iter().rev() {
                release(*done);
            }
            return Err(e);
        }

        registered.push(mask);
    }

    Ok(registered)
}

/// One logical grab as registered with the server
#[derive(Clone, Debug, PartialEq)]
pub struct GrabRecord {
    /// Combo the mapping asked for
    pub combo: KeyCombo,
    pub keycode: u8,
    /// Modifier mask without lock bits (may include an implicit Shift)
    pub base_mask: u16,
    /// Physical masks registered, one per lock variant
    pub masks: Vec<u16>,
}

/// Registry of live grabs, keyed by mapping id
#[derive(Debug, Default)]
pub struct GrabTable {
    records: HashMap<MappingId, GrabRecord>,
}

impl GrabTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record, returning the one it replaced
    pub fn insert(&mut self, id: MappingId, record: GrabRecord) -> Option<GrabRecord> {
        self.records.insert(id, record)
    }

    pub fn remove(&mut self, id: &MappingId) -> Option<GrabRecord> {
        self.records.remove(id)
    }

    pub fn get(&self, id: &MappingId) -> Option<&GrabRecord> {
        self.records.get(id)
    }

    /// Record matching a key event, ignoring lock and button bits in `state`
    pub fn find(&self, keycode: u8, state: u16) -> Option<&GrabRecord> {
        let normalized = state & Modifiers::SUPPORTED;
        self.records
            .values()
            .find(|r| r.keycode == keycode && r.base_mask == normalized)
    }

    /// Another mapping already grabbing the same key and base mask
    pub fn holder(&self, keycode: u8, base_mask: u16, except: &MappingId) -> Option<&MappingId> {
        self.records
            .iter()
            .find(|(id, r)| *id != except && r.keycode == keycode && r.base_mask == base_mask)
            .map(|(id, _)| id)
    }

    /// Removes every record on one of `keycodes`, for suspending grabs
    /// while those keys are typed
    pub fn take_on_keys(&mut self, keycodes: &[u8]) -> Vec<(MappingId, GrabRecord)> {
        let ids: Vec<MappingId> = self
            .records
            .iter()
            .filter(|(_, r)| keycodes.contains(&r.keycode))
            .map(|(id, _)| id.clone())
            .collect();

        ids.into_iter()
            .filter_map(|id| self.records.remove(&id).map(|record| (id, record)))
            .collect()
    }

    /// Removes and returns every record
    pub fn drain(&mut self) -> Vec<(MappingId, GrabRecord)> {
        self.records.drain().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{keysym, MOD_CTRL, MOD_NUMLOCK, MOD_SHIFT};
    use crate::hook::keymap::{fixtures::us_layout, Keymap};

    #[test]
    fn test_four_distinct_variants() {
        let masks: Vec<u16> = LockVariant::ALL
            .iter()
            .map(|v| v.apply(MOD_CTRL, MOD_NUMLOCK))
            .collect();

        assert_eq!(
            masks,
            vec![MOD_CTRL, MOD_CTRL | MOD_LOCK, MOD_CTRL | MOD_NUMLOCK, MOD_CTRL | MOD_LOCK | MOD_NUMLOCK]
        );
    }

    #[test]
    fn test_register_all_variants() {
        let mut calls = Vec::new();
        let result: Result<Vec<u16>, ()> = register_variants(
            MOD_CTRL,
            MOD_NUMLOCK,
            |mask| {
                calls.push(mask);
                Ok(())
            },
            |_| unreachable!("nothing to roll back"),
        );

        assert_eq!(result.unwrap().len(), 4);
        assert_eq!(calls.len(), 4);
    }

    #[test]
    fn test_rollback_on_third_variant() {
        let mut released = Vec::new();
        let mut attempts = 0;

        let result = register_variants(
            0,
            MOD_NUMLOCK,
            |_| {
                attempts += 1;
                if attempts == 3 {
                    Err("access")
                } else {
                    Ok(())
                }
            },
            |mask| released.push(mask),
        );

        assert_eq!(result, Err("access"));
        // Newest first
        assert_eq!(released, vec![MOD_LOCK, 0]);
    }

    fn record(keymap: &Keymap, combo: KeyCombo) -> GrabRecord {
        let (keycode, base_mask) = keymap.physical(combo).unwrap();
        GrabRecord {
            combo,
            keycode,
            base_mask,
            masks: vec![],
        }
    }

    #[test]
    fn test_shifted_symbol_and_shift_combo_share_a_key() {
        let keymap = us_layout();
        let upper_a = KeyCombo::bare(0x41);
        let shift_a = KeyCombo::from_raw(0x61, MOD_SHIFT);
        let plain_a = KeyCombo::bare(0x61);

        let mut table = GrabTable::new();
        let first = MappingId::from("aaaa0001");
        table.insert(first.clone(), record(&keymap, upper_a));

        let (keycode, mask) = keymap.physical(shift_a).unwrap();
        assert_eq!(table.holder(keycode, mask, &MappingId::from("aaaa0002")), Some(&first));
        // Re-grabbing the holder itself is not a clash
        assert_eq!(table.holder(keycode, mask, &first), None);

        let (keycode, mask) = keymap.physical(plain_a).unwrap();
        assert_eq!(table.holder(keycode, mask, &MappingId::from("aaaa0002")), None);
    }

    #[test]
    fn test_take_on_keys_only_removes_typed_keys() {
        let keymap = us_layout();
        let mut table = GrabTable::new();
        table.insert(MappingId::from("f1f1f1f1"), record(&keymap, KeyCombo::bare(keysym::F1)));
        table.insert(MappingId::from("f2f2f2f2"), record(&keymap, KeyCombo::bare(keysym::F2)));

        // F2 is keycode 68 in the fixture
        let taken = table.take_on_keys(&[37, 68]);

        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].0, MappingId::from("f2f2f2f2"));
        assert_eq!(table.len(), 1);
        assert!(table.get(&MappingId::from("f1f1f1f1")).is_some());
    }

    #[test]
    fn test_find_ignores_lock_and_button_bits() {
        let mut table = GrabTable::new();
        table.insert(
            MappingId::from("a1b2c3d4"),
            GrabRecord {
                combo: KeyCombo::from_raw(keysym::F1, MOD_CTRL),
                keycode: 67,
                base_mask: MOD_CTRL,
                masks: vec![],
            },
        );

        // Ctrl + Caps + NumLock + Button1
        let state = MOD_CTRL | MOD_LOCK | MOD_NUMLOCK | 0x100;
        assert!(table.find(67, state).is_some());
        assert!(table.find(67, 0).is_none());
        assert!(table.find(68, MOD_CTRL).is_none());
    }
}
