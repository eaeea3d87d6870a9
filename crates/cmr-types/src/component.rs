use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// One of the four component categories that make up a full car.
///
/// The declaration order is the positional order of the composite key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Wheel,
    Engine,
    Build,
    Wrapping,
}

impl ComponentKind {
    /// All kinds in composite-key order.
    pub const ALL: [ComponentKind; 4] = [Self::Wheel, Self::Engine, Self::Build, Self::Wrapping];

    /// Field name as it appears in paths and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wheel => "wheel",
            Self::Engine => "engine",
            Self::Build => "build",
            Self::Wrapping => "wrapping",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TypeError::UnknownComponent(s.to_string()))
    }
}

/// Identifier of a single component within its category.
///
/// Construction does not check the supply bound; that is the
/// [`Validator`](crate::Validator)'s job, since the bound is configured per
/// process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(u32);

impl ComponentId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for ComponentId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The composite key identifying a full-car record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentTuple {
    pub wheel: ComponentId,
    pub engine: ComponentId,
    pub build: ComponentId,
    pub wrapping: ComponentId,
}

impl ComponentTuple {
    pub fn new(wheel: u32, engine: u32, build: u32, wrapping: u32) -> Self {
        Self {
            wheel: ComponentId(wheel),
            engine: ComponentId(engine),
            build: ComponentId(build),
            wrapping: ComponentId(wrapping),
        }
    }

    /// Build a tuple from ids given in composite-key order.
    pub fn from_ids(ids: [ComponentId; 4]) -> Self {
        let [wheel, engine, build, wrapping] = ids;
        Self { wheel, engine, build, wrapping }
    }

    /// The id stored for `kind`.
    pub fn get(&self, kind: ComponentKind) -> ComponentId {
        match kind {
            ComponentKind::Wheel => self.wheel,
            ComponentKind::Engine => self.engine,
            ComponentKind::Build => self.build,
            ComponentKind::Wrapping => self.wrapping,
        }
    }

    /// Ids in composite-key order.
    pub fn ids(&self) -> [ComponentId; 4] {
        [self.wheel, self.engine, self.build, self.wrapping]
    }
}

impl fmt::Display for ComponentTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.wheel, self.engine, self.build, self.wrapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_order_matches_key_order() {
        let names: Vec<&str> = ComponentKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, ["wheel", "engine", "build", "wrapping"]);
    }

    #[test]
    fn kind_from_str_ignores_case() {
        assert_eq!("Engine".parse::<ComponentKind>().unwrap(), ComponentKind::Engine);
        assert!(matches!(
            "spoiler".parse::<ComponentKind>(),
            Err(TypeError::UnknownComponent(_))
        ));
    }

    #[test]
    fn tuple_accessors() {
        let t = ComponentTuple::new(6, 29, 394, 400);
        assert_eq!(t.get(ComponentKind::Build), ComponentId::new(394));
        assert_eq!(t.ids().map(ComponentId::get), [6, 29, 394, 400]);
        assert_eq!(ComponentTuple::from_ids(t.ids()), t);
        assert_eq!(t.to_string(), "6/29/394/400");
    }

    #[test]
    fn tuple_serializes_as_plain_numbers() {
        let t = ComponentTuple::new(1, 2, 3, 4);
        let json = serde_json::to_value(t).unwrap();
        assert_eq!(json, serde_json::json!({"wheel": 1, "engine": 2, "build": 3, "wrapping": 4}));
    }
}
