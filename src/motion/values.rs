// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Fixed-capacity per-axis containers shared by the planner, step generator and kinematics.
//!
//! Axes are addressed by a small index `0..MAX_AXES`. The number of axes a robot actually uses is
//! set by its [`AxesConfig`](crate::motion::AxesConfig); unused slots stay at zero.

use serde::{Deserialize, Serialize, Serializer};

/// Maximum number of axes any robot geometry may configure.
pub const MAX_AXES: usize = 3;

/// Signed step counts, one per axis.
pub type StepCounts = [i32; MAX_AXES];

/// Per-axis `f32` values, each with its own validity flag.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisFloats {
    vals: [f32; MAX_AXES],
    valid: u8,
}

impl AxisFloats {
    /// All axes zero and invalid.
    pub const fn new() -> Self {
        Self {
            vals: [0.0; MAX_AXES],
            valid: 0,
        }
    }

    /// Build from a slice of values, marking each supplied axis valid.
    pub fn from_slice(vals: &[f32]) -> Self {
        let mut out = Self::new();
        for (axis, &val) in vals.iter().take(MAX_AXES).enumerate() {
            out.set(axis, val);
        }
        out
    }

    #[inline]
    pub fn get(&self, axis: usize) -> f32 {
        self.vals[axis]
    }

    /// Set a value and mark the axis valid.
    #[inline]
    pub fn set(&mut self, axis: usize, val: f32) {
        self.vals[axis] = val;
        self.valid |= 1 << axis;
    }

    #[inline]
    pub fn is_valid(&self, axis: usize) -> bool {
        axis < MAX_AXES && self.valid & (1 << axis) != 0
    }

    pub fn set_valid(&mut self, axis: usize, valid: bool) {
        if valid {
            self.valid |= 1 << axis;
        } else {
            self.valid &= !(1 << axis);
        }
    }

    #[inline]
    pub fn any_valid(&self) -> bool {
        self.valid != 0
    }

    #[inline]
    pub fn values(&self) -> &[f32; MAX_AXES] {
        &self.vals
    }

    /// Euclidean distance to `other` over the axes selected by `include`.
    pub fn distance_to(&self, other: &AxisFloats, include: &[bool; MAX_AXES]) -> f32 {
        let mut sum = 0.0;
        for axis in 0..MAX_AXES {
            if include[axis] {
                let d = self.vals[axis] - other.vals[axis];
                sum += d * d;
            }
        }
        libm::sqrtf(sum)
    }
}

/// Last commanded position: physical units plus the matching actuator steps from home.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct AxisPosition {
    pub units: AxisFloats,
    pub steps_from_home: StepCounts,
}

/// Which end of an axis an end-stop guards.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AxisEnd {
    Min,
    Max,
}

impl AxisEnd {
    pub const BOTH: [AxisEnd; 2] = [AxisEnd::Min, AxisEnd::Max];

    #[inline]
    fn index(self) -> usize {
        match self {
            AxisEnd::Min => 0,
            AxisEnd::Max => 1,
        }
    }
}

/// End-stop test requested for one end of one axis.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum EndstopCheck {
    /// Not tested.
    #[default]
    None = 0,
    /// Abort the block when the end-stop reads triggered.
    Hit = 1,
    /// Abort the block when the end-stop reads released.
    NotHit = 2,
    /// Abort on trigger, but only while the axis is travelling towards this end.
    Towards = 3,
}

impl EndstopCheck {
    fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            1 => EndstopCheck::Hit,
            2 => EndstopCheck::NotHit,
            3 => EndstopCheck::Towards,
            _ => EndstopCheck::None,
        }
    }
}

/// Two bits per (axis, end), packed into one word so a block can carry it by value.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EndstopChecks(u32);

impl EndstopChecks {
    const BITS_PER_END: usize = 2;

    /// No end-stop tests.
    pub const fn none() -> Self {
        Self(0)
    }

    /// Test every end-stop in the direction of travel.
    pub fn all() -> Self {
        let mut checks = Self::none();
        for axis in 0..MAX_AXES {
            for end in AxisEnd::BOTH {
                checks.set(axis, end, EndstopCheck::Towards);
            }
        }
        checks
    }

    #[inline]
    fn shift(axis: usize, end: AxisEnd) -> usize {
        (axis * 2 + end.index()) * Self::BITS_PER_END
    }

    pub fn set(&mut self, axis: usize, end: AxisEnd, check: EndstopCheck) {
        if axis >= MAX_AXES {
            return;
        }
        let shift = Self::shift(axis, end);
        self.0 = (self.0 & !(0b11 << shift)) | ((check as u32) << shift);
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, axis: usize, end: AxisEnd, check: EndstopCheck) -> Self {
        self.set(axis, end, check);
        self
    }

    pub fn get(&self, axis: usize, end: AxisEnd) -> EndstopCheck {
        if axis >= MAX_AXES {
            return EndstopCheck::None;
        }
        EndstopCheck::from_bits(self.0 >> Self::shift(axis, end))
    }

    #[inline]
    pub fn any(&self) -> bool {
        self.0 != 0
    }

    /// Swap hit and not-hit tests, e.g. to back off a switch that was just found.
    pub fn reverse(&self) -> Self {
        let mut out = *self;
        for axis in 0..MAX_AXES {
            for end in AxisEnd::BOTH {
                let flipped = match self.get(axis, end) {
                    EndstopCheck::Hit => EndstopCheck::NotHit,
                    EndstopCheck::NotHit => EndstopCheck::Hit,
                    other => other,
                };
                out.set(axis, end, flipped);
            }
        }
        out
    }

    /// `[[min, max]; MAX_AXES]` as raw codes.
    pub fn to_codes(&self) -> [[u8; 2]; MAX_AXES] {
        core::array::from_fn(|axis| {
            [
                self.get(axis, AxisEnd::Min) as u8,
                self.get(axis, AxisEnd::Max) as u8,
            ]
        })
    }
}

// Serialized as nested arrays of codes, e.g. `[[2,0],[0,0],[0,0]]`.
impl Serialize for EndstopChecks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_codes().serialize(serializer)
    }
}
