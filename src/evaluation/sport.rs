//! Sport catalogue and the per-sport weight tables used for the overall score.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::models::ComponentScores;
use crate::error::{RankingError, RankingResult};
use crate::features::SportFeatureKind;

/// Allowed distance from 1.0 for the sum of a weight table.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Tennis,
    Basketball,
    Football,
    Athletics,
    Fitness,
    /// Used for any sport name that is not recognized.
    Generic,
}

impl Sport {
    pub const ALL: [Sport; 6] = [
        Sport::Tennis,
        Sport::Basketball,
        Sport::Football,
        Sport::Athletics,
        Sport::Fitness,
        Sport::Generic,
    ];

    /// Case-insensitive lookup, falling back to [`Sport::Generic`].
    pub fn from_name(name: &str) -> Sport {
        Self::parse(name).unwrap_or(Sport::Generic)
    }

    fn parse(name: &str) -> Option<Sport> {
        match name.trim().to_ascii_lowercase().as_str() {
            "tennis" => Some(Sport::Tennis),
            "basketball" => Some(Sport::Basketball),
            "football" | "soccer" => Some(Sport::Football),
            "athletics" | "track" => Some(Sport::Athletics),
            "fitness" => Some(Sport::Fitness),
            "generic" => Some(Sport::Generic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Tennis => "tennis",
            Sport::Basketball => "basketball",
            Sport::Football => "football",
            Sport::Athletics => "athletics",
            Sport::Fitness => "fitness",
            Sport::Generic => "generic",
        }
    }

    pub fn default_weights(&self) -> WeightTable {
        match self {
            Sport::Generic => GENERIC_WEIGHTS,
            Sport::Tennis => TENNIS_WEIGHTS,
            Sport::Basketball => BASKETBALL_WEIGHTS,
            Sport::Football => FOOTBALL_WEIGHTS,
            Sport::Athletics => ATHLETICS_WEIGHTS,
            Sport::Fitness => FITNESS_WEIGHTS,
        }
    }

    /// The small fixed set of sport-specific features measured for this sport.
    pub fn feature_kinds(&self) -> &'static [SportFeatureKind] {
        use SportFeatureKind::*;
        match self {
            Sport::Tennis => &[ArmExtension, TorsoUprightness, Footwork],
            Sport::Basketball => &[KneeFlexion, ArmExtension, Footwork],
            Sport::Football => &[Footwork, KneeFlexion, TorsoUprightness],
            Sport::Athletics => &[KneeFlexion, TorsoUprightness, ArmExtension],
            Sport::Fitness | Sport::Generic => &[TorsoUprightness, ArmExtension, KneeFlexion],
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weights of the six scored components. Timing is reported but never weighted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    pub form: f64,
    pub technique: f64,
    pub movement: f64,
    pub balance: f64,
    pub posture: f64,
    pub consistency: f64,
}

pub const GENERIC_WEIGHTS: WeightTable = WeightTable::new(0.20, 0.20, 0.15, 0.15, 0.15, 0.15);
pub const TENNIS_WEIGHTS: WeightTable = WeightTable::new(0.20, 0.25, 0.20, 0.15, 0.10, 0.10);
pub const BASKETBALL_WEIGHTS: WeightTable = WeightTable::new(0.15, 0.25, 0.20, 0.20, 0.10, 0.10);
pub const FOOTBALL_WEIGHTS: WeightTable = WeightTable::new(0.15, 0.20, 0.25, 0.20, 0.10, 0.10);
pub const ATHLETICS_WEIGHTS: WeightTable = WeightTable::new(0.20, 0.15, 0.25, 0.15, 0.15, 0.10);
pub const FITNESS_WEIGHTS: WeightTable = WeightTable::new(0.30, 0.15, 0.10, 0.10, 0.20, 0.15);

impl WeightTable {
    pub const fn new(
        form: f64,
        technique: f64,
        movement: f64,
        balance: f64,
        posture: f64,
        consistency: f64,
    ) -> Self {
        Self {
            form,
            technique,
            movement,
            balance,
            posture,
            consistency,
        }
    }

    fn values(&self) -> [f64; 6] {
        [
            self.form,
            self.technique,
            self.movement,
            self.balance,
            self.posture,
            self.consistency,
        ]
    }

    pub fn total(&self) -> f64 {
        self.values().iter().sum()
    }

    pub fn validate(&self, label: &str) -> RankingResult<()> {
        if self.values().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(RankingError::Configuration(format!(
                "Weight table for {} contains a negative or non-finite weight",
                label
            )));
        }
        let total = self.total();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(RankingError::Configuration(format!(
                "Weight table for {} sums to {} instead of 1.0",
                label, total
            )));
        }
        Ok(())
    }

    /// Weighted sum of the six scored components.
    pub fn combine(&self, components: &ComponentScores) -> f64 {
        self.form * components.form
            + self.technique * components.technique
            + self.movement * components.movement
            + self.balance * components.balance
            + self.posture * components.posture
            + self.consistency * components.consistency
    }
}

/// Built-in weight tables plus any per-sport overrides loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct WeightTables {
    overrides: HashMap<Sport, WeightTable>,
}

impl WeightTables {
    /// Builds the tables from overrides keyed by sport name, validating every
    /// resulting table. Unknown sport names are rejected rather than silently
    /// mapped onto the generic table.
    pub fn with_overrides(overrides: &HashMap<String, WeightTable>) -> RankingResult<Self> {
        let mut resolved = HashMap::new();
        for (name, table) in overrides {
            let sport = Sport::parse(name).ok_or_else(|| {
                RankingError::Configuration(format!("Unknown sport in weight overrides: {}", name))
            })?;
            resolved.insert(sport, *table);
        }
        let tables = Self {
            overrides: resolved,
        };
        tables.validate()?;
        Ok(tables)
    }

    pub fn lookup(&self, sport: Sport) -> WeightTable {
        self.overrides
            .get(&sport)
            .copied()
            .unwrap_or_else(|| sport.default_weights())
    }

    pub fn validate(&self) -> RankingResult<()> {
        for sport in Sport::ALL {
            self.lookup(sport).validate(sport.as_str())?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn with_unchecked_override(sport: Sport, table: WeightTable) -> Self {
        let mut overrides = HashMap::new();
        overrides.insert(sport, table);
        Self { overrides }
    }
}
