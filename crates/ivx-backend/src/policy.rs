//! Per-operation dtype exclusions.

use ivx_core::DType;
use std::collections::{BTreeMap, BTreeSet};

/// Table of `(op, dtype)` combinations a backend refuses.
///
/// The default table matches the limits of the emulated engine: unsigned
/// inputs are refused wherever accepting them would break the upcasting rule
/// for sums and products, and the moment estimators only accept floating
/// inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DTypePolicy {
    unsupported: BTreeMap<String, BTreeSet<DType>>,
}

const INTEGERS: [DType; 6] = [
    DType::Bool,
    DType::U8,
    DType::I8,
    DType::I16,
    DType::I32,
    DType::I64,
];

impl DTypePolicy {
    /// Accept every dtype for every op.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            unsupported: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn reference() -> Self {
        Self::permissive()
            .deny("sum", &[DType::U8])
            .deny("prod", &[DType::U8, DType::F16, DType::BF16])
            .deny("mean", &INTEGERS)
            .deny("var", &INTEGERS)
            .deny("std", &INTEGERS)
            .deny("std", &[DType::F16])
            .deny("cumsum", &[DType::U8, DType::F16, DType::BF16])
            .deny("cumprod", &[DType::U8, DType::BF16])
    }

    #[must_use]
    pub fn deny(mut self, op: &str, dtypes: &[DType]) -> Self {
        self.unsupported
            .entry(op.to_owned())
            .or_default()
            .extend(dtypes.iter().copied());
        self
    }

    #[must_use]
    pub fn allows(&self, op: &str, dtype: DType) -> bool {
        self.unsupported
            .get(op)
            .is_none_or(|denied| !denied.contains(&dtype))
    }

    /// Every denied pair, ordered by op then dtype.
    #[must_use]
    pub fn denied_pairs(&self) -> Vec<(String, DType)> {
        self.unsupported
            .iter()
            .flat_map(|(op, dtypes)| dtypes.iter().map(move |dtype| (op.clone(), *dtype)))
            .collect()
    }
}

impl Default for DTypePolicy {
    fn default() -> Self {
        Self::reference()
    }
}
