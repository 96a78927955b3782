//! Identifier newtypes
//!
//! Products, lanes, defects and product types are referenced by opaque ids
//! everywhere outside the component that owns them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique product identifier (monotonic per factory)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl ProductId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "product-{:04}", self.0)
    }
}

/// Conveyor lane index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaneId(pub u8);

impl LaneId {
    pub fn new(index: u8) -> Self {
        Self(index)
    }

    /// Position of the lane in the lane array
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lane-{}", self.0)
    }
}

/// Defect (fault type) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefectId(pub u32);

impl DefectId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for DefectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "defect-{}", self.0)
    }
}

/// Product type (catalog entry) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductTypeId(pub u32);

impl ProductTypeId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ProductTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type-{}", self.0)
    }
}
