//! Fingers, bit vectors and the fixed gesture patterns

use serde::{Deserialize, Serialize};

/// One of the five flex-sensed fingers, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinkie,
}

impl Finger {
    pub const ALL: [Finger; 5] = [Finger::Thumb, Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinkie];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(i: usize) -> Option<Finger> {
        Self::ALL.get(i).copied()
    }

    /// Wire name as sent by the glove
    pub fn name(&self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Pinkie => "pinkie",
        }
    }

    /// Exact match on a lower-cased wire name
    pub fn from_name(s: &str) -> Option<Finger> {
        Self::ALL.iter().copied().find(|f| f.name() == s)
    }
}

/// "Bent" flag per finger, thumb first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FingerBits(pub [bool; 5]);

impl FingerBits {
    pub const NONE: FingerBits = FingerBits([false; 5]);
    pub const ALL: FingerBits = FingerBits([true; 5]);

    pub fn get(&self, finger: Finger) -> bool {
        self.0[finger.index()]
    }

    pub fn set(&mut self, finger: Finger, bent: bool) {
        self.0[finger.index()] = bent;
    }

    pub fn clear(&mut self) {
        self.0 = [false; 5];
    }

    pub fn count(&self) -> usize {
        self.0.iter().filter(|b| **b).count()
    }

    pub fn all_bent(&self) -> bool {
        self.0.iter().all(|b| *b)
    }

    /// Build from 0/1 values; anything non-zero counts as bent
    pub fn from_ints(values: &[u8; 5]) -> FingerBits {
        let mut bits = [false; 5];
        for (b, v) in bits.iter_mut().zip(values.iter()) {
            *b = *v != 0;
        }
        FingerBits(bits)
    }
}

impl std::fmt::Display for FingerBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in self.0 {
            write!(f, "{}", if b { '1' } else { '0' })?;
        }
        Ok(())
    }
}

/// Fixed template matched exactly against a `FingerBits`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GesturePattern {
    pub name: &'static str,
    pub bits: FingerBits,
}

impl GesturePattern {
    pub fn matches(&self, bits: &FingerBits) -> bool {
        self.bits == *bits
    }
}

/// Only the index finger straight
pub const CHOICE_1: GesturePattern = GesturePattern {
    name: "choice-1",
    bits: FingerBits([true, false, true, true, true]),
};

/// Index and middle straight
pub const CHOICE_2: GesturePattern = GesturePattern {
    name: "choice-2",
    bits: FingerBits([true, false, false, true, true]),
};

/// Middle, ring and pinkie straight
pub const CHOICE_3: GesturePattern = GesturePattern {
    name: "choice-3",
    bits: FingerBits([true, true, false, false, false]),
};

/// Everything bent except the thumb
pub const THUMBS_UP: GesturePattern = GesturePattern {
    name: "thumbs-up",
    bits: FingerBits([false, true, true, true, true]),
};

/// Choice patterns in evaluation order; position + 1 is the choice number
pub const CHOICE_PATTERNS: [GesturePattern; 3] = [CHOICE_1, CHOICE_2, CHOICE_3];
