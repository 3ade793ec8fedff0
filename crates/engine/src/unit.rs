use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Units of mass quantities are recorded in.
///
/// Every unit sits on a decade scale; converting between two units is a
/// power-of-ten rescale by the difference of their positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOfMass {
    Ton,
    Kg,
    Hg,
    Dag,
    G,
    Dg,
    Cg,
    Mg,
}

struct UnitEntry {
    unit: UnitOfMass,
    acronym: &'static str,
    description: &'static str,
    position: i32,
}

const UNITS: [UnitEntry; 8] = [
    UnitEntry {
        unit: UnitOfMass::Ton,
        acronym: "ton",
        description: "tonne",
        position: 10,
    },
    UnitEntry {
        unit: UnitOfMass::Kg,
        acronym: "kg",
        description: "kilogram",
        position: 7,
    },
    UnitEntry {
        unit: UnitOfMass::Hg,
        acronym: "hg",
        description: "hectogram",
        position: 6,
    },
    UnitEntry {
        unit: UnitOfMass::Dag,
        acronym: "dag",
        description: "decagram",
        position: 5,
    },
    UnitEntry {
        unit: UnitOfMass::G,
        acronym: "g",
        description: "gram",
        position: 4,
    },
    UnitEntry {
        unit: UnitOfMass::Dg,
        acronym: "dg",
        description: "decigram",
        position: 3,
    },
    UnitEntry {
        unit: UnitOfMass::Cg,
        acronym: "cg",
        description: "centigram",
        position: 2,
    },
    UnitEntry {
        unit: UnitOfMass::Mg,
        acronym: "mg",
        description: "milligram",
        position: 1,
    },
];

impl UnitOfMass {
    pub const ALL: [UnitOfMass; 8] = [
        Self::Ton,
        Self::Kg,
        Self::Hg,
        Self::Dag,
        Self::G,
        Self::Dg,
        Self::Cg,
        Self::Mg,
    ];

    fn entry(self) -> &'static UnitEntry {
        // Variants are declared in table order.
        &UNITS[self as usize]
    }

    pub fn acronym(self) -> &'static str {
        self.entry().acronym
    }

    pub fn description(self) -> &'static str {
        self.entry().description
    }

    /// Decade position on the scale (`mg` = 1 … `ton` = 10).
    pub fn position(self) -> i32 {
        self.entry().position
    }

    /// Convert `value` expressed in `self` into `to`.
    pub fn convert_to(self, to: UnitOfMass, value: f64) -> f64 {
        let shift = self.position() - to.position();
        match shift {
            0 => value,
            s if s > 0 => value * 10f64.powi(s),
            s => value / 10f64.powi(-s),
        }
    }

    /// Space separated list of every acronym, used as a validation parameter.
    pub fn acronyms() -> String {
        UNITS
            .iter()
            .map(|entry| entry.acronym)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl core::fmt::Display for UnitOfMass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.acronym())
    }
}

impl TryFrom<&str> for UnitOfMass {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        UNITS
            .iter()
            .find(|entry| entry.acronym == value)
            .map(|entry| entry.unit)
            .ok_or_else(|| EngineError::UnknownUnit(value.to_string()))
    }
}

/// Convert `value` from the unit `from` into the unit `to`, both given as
/// acronyms.
///
/// Moving up the scale multiplies, moving down divides.
pub fn convert(from: &str, to: &str, value: f64) -> ResultEngine<f64> {
    let from = UnitOfMass::try_from(from)?;
    let to = UnitOfMass::try_from(to)?;
    Ok(from.convert_to(to, value))
}
