//! Parse-then-validate for composite keys.
//!
//! Every path that accepts component ids from outside the process (HTTP path
//! segments, CLI arguments, JSON bodies) goes through a [`Validator`] before a
//! store is consulted. The validator is pure: its only input besides the
//! tokens is the configured supply bound.

use std::num::IntErrorKind;

use serde::{Deserialize, Serialize};

use crate::component::{ComponentId, ComponentKind, ComponentTuple};
use crate::error::ValidationError;
use crate::record::AssetRefs;

/// Highest component id minted when no bound is configured.
pub const DEFAULT_MAX_COMPONENT_SUPPLY: u32 = 6969;

/// Range and shape checks for component ids and asset references.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    max_supply: u32,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_COMPONENT_SUPPLY)
    }
}

impl Validator {
    /// A validator accepting ids in `0..=max_supply`.
    pub fn new(max_supply: u32) -> Self {
        Self { max_supply }
    }

    pub fn max_supply(&self) -> u32 {
        self.max_supply
    }

    /// Parse and range-check four raw tokens given in composite-key order.
    ///
    /// Fields are checked in order and the first failure is returned.
    pub fn validate(
        &self,
        wheel: &str,
        engine: &str,
        build: &str,
        wrapping: &str,
    ) -> Result<ComponentTuple, ValidationError> {
        Ok(ComponentTuple {
            wheel: self.parse_id(ComponentKind::Wheel, wheel)?,
            engine: self.parse_id(ComponentKind::Engine, engine)?,
            build: self.parse_id(ComponentKind::Build, build)?,
            wrapping: self.parse_id(ComponentKind::Wrapping, wrapping)?,
        })
    }

    /// Parse a single token for `kind`.
    pub fn parse_id(&self, kind: ComponentKind, token: &str) -> Result<ComponentId, ValidationError> {
        match token.parse::<i64>() {
            Ok(value) => self.check_id(kind, value),
            // An integer too wide for i64 is still an integer, just out of range.
            Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
                Err(ValidationError::OutOfRange {
                    field: kind,
                    value: token.to_string(),
                    max: self.max_supply,
                })
            }
            Err(_) => Err(ValidationError::MalformedId {
                field: kind,
                token: token.to_string(),
            }),
        }
    }

    /// Range-check an already numeric id.
    pub fn check_id(&self, kind: ComponentKind, value: i64) -> Result<ComponentId, ValidationError> {
        match u32::try_from(value) {
            Ok(id) if id <= self.max_supply => Ok(ComponentId::new(id)),
            _ => Err(ValidationError::OutOfRange {
                field: kind,
                value: value.to_string(),
                max: self.max_supply,
            }),
        }
    }

    /// Range-check a tuple that was built without parsing, e.g. from JSON.
    pub fn check_tuple(&self, tuple: &ComponentTuple) -> Result<(), ValidationError> {
        for kind in ComponentKind::ALL {
            self.check_id(kind, i64::from(tuple.get(kind).get()))?;
        }
        Ok(())
    }

    /// Asset references must be all populated or all placeholders.
    pub fn check_refs(&self, refs: &AssetRefs) -> Result<(), ValidationError> {
        let missing = refs.missing();
        if missing.is_empty() || missing.len() == 3 {
            Ok(())
        } else {
            Err(ValidationError::IncompleteRefs { missing })
        }
    }
}
