//! Quota coefficients served by the rule configuration store.
//!
//! Personnel ranks and student levels carry an entitled area per person; disciplines carry a
//! dimensionless multiplier applied to a department's summed entitlement.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonnelRank {
    Professor,
    AssociateProfessor,
    MidOrBelow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentLevel {
    Doctoral,
    Master,
    Undergraduate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    Humanities,
    Science,
    Engineering,
    Medicine,
    Arts,
}

macro_rules! keyed {
    ($name:ident { $($variant:ident => $key:literal),+ $(,)? }) => {
        impl $name {
            pub const fn key(self) -> &'static str {
                match self {
                    $(Self::$variant => $key),+
                }
            }

            fn from_key(value: &str) -> Option<Self> {
                match value {
                    $($key => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

keyed!(PersonnelRank {
    Professor => "professor",
    AssociateProfessor => "associate_professor",
    MidOrBelow => "mid_or_below",
});
keyed!(StudentLevel {
    Doctoral => "doctoral",
    Master => "master",
    Undergraduate => "undergraduate",
});
keyed!(Discipline {
    Humanities => "humanities",
    Science => "science",
    Engineering => "engineering",
    Medicine => "medicine",
    Arts => "arts",
});

/// Lookup key into the quota rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "category", content = "key", rename_all = "snake_case")]
pub enum QuotaKey {
    PersonnelRank(PersonnelRank),
    StudentLevel(StudentLevel),
    Discipline(Discipline),
}

impl QuotaKey {
    pub const fn category(self) -> &'static str {
        match self {
            QuotaKey::PersonnelRank(_) => "personnel_rank",
            QuotaKey::StudentLevel(_) => "student_level",
            QuotaKey::Discipline(_) => "discipline",
        }
    }

    pub const fn unit(self) -> QuotaUnit {
        match self {
            QuotaKey::PersonnelRank(_) | QuotaKey::StudentLevel(_) => {
                QuotaUnit::SquareMetresPerPerson
            }
            QuotaKey::Discipline(_) => QuotaUnit::Multiplier,
        }
    }

    pub fn parse(category: &str, key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        match category.trim().to_ascii_lowercase().as_str() {
            "personnel_rank" => PersonnelRank::from_key(&key).map(Self::PersonnelRank),
            "student_level" => StudentLevel::from_key(&key).map(Self::StudentLevel),
            "discipline" => Discipline::from_key(&key).map(Self::Discipline),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            QuotaKey::PersonnelRank(rank) => rank.key(),
            QuotaKey::StudentLevel(level) => level.key(),
            QuotaKey::Discipline(discipline) => discipline.key(),
        }
    }
}

impl fmt::Display for QuotaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category(), self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaUnit {
    SquareMetresPerPerson,
    Multiplier,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuotaRule {
    #[serde(flatten)]
    pub key: QuotaKey,
    pub coefficient: f64,
    pub unit: QuotaUnit,
}

/// Read-only access to quota coefficients.
pub trait QuotaSource: Send + Sync {
    fn coefficient(&self, key: QuotaKey) -> Option<f64>;
    fn rules(&self) -> Vec<QuotaRule>;
}

#[derive(Debug, thiserror::Error)]
pub enum QuotaRuleError {
    #[error("unable to read quota rules: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed quota rule file: {0}")]
    Csv(#[from] csv::Error),
    #[error("unknown quota rule '{category}/{key}'")]
    UnknownKey { category: String, key: String },
    #[error("quota coefficient for {key} must be positive (found {value})")]
    InvalidCoefficient { key: QuotaKey, value: f64 },
}

/// In-memory rule table, seeded with the university defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaRuleTable {
    rules: BTreeMap<QuotaKey, f64>,
}

const STANDARD_RULES: [(QuotaKey, f64); 11] = [
    (QuotaKey::PersonnelRank(PersonnelRank::Professor), 24.0),
    (
        QuotaKey::PersonnelRank(PersonnelRank::AssociateProfessor),
        16.0,
    ),
    (QuotaKey::PersonnelRank(PersonnelRank::MidOrBelow), 9.0),
    (QuotaKey::StudentLevel(StudentLevel::Doctoral), 6.0),
    (QuotaKey::StudentLevel(StudentLevel::Master), 4.0),
    (QuotaKey::StudentLevel(StudentLevel::Undergraduate), 2.0),
    (QuotaKey::Discipline(Discipline::Humanities), 1.0),
    (QuotaKey::Discipline(Discipline::Science), 1.2),
    (QuotaKey::Discipline(Discipline::Engineering), 1.3),
    (QuotaKey::Discipline(Discipline::Medicine), 1.3),
    (QuotaKey::Discipline(Discipline::Arts), 1.1),
];

impl Default for QuotaRuleTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl QuotaRuleTable {
    pub fn standard() -> Self {
        Self {
            rules: STANDARD_RULES.into_iter().collect(),
        }
    }

    /// Standard table with the given coefficients replacing the defaults.
    pub fn with_overrides(
        overrides: impl IntoIterator<Item = (QuotaKey, f64)>,
    ) -> Result<Self, QuotaRuleError> {
        let mut table = Self::standard();
        for (key, value) in overrides {
            if !(value.is_finite() && value > 0.0) {
                return Err(QuotaRuleError::InvalidCoefficient { key, value });
            }
            table.rules.insert(key, value);
        }
        Ok(table)
    }

    /// Load overrides from a `category,key,coefficient` CSV document.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, QuotaRuleError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut overrides = Vec::new();

        for row in csv_reader.deserialize::<QuotaRow>() {
            let row = row?;
            let key = QuotaKey::parse(&row.category, &row.key).ok_or_else(|| {
                QuotaRuleError::UnknownKey {
                    category: row.category.clone(),
                    key: row.key.clone(),
                }
            })?;
            overrides.push((key, row.coefficient));
        }

        Self::with_overrides(overrides)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, QuotaRuleError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Entitled area for a single person of the given rank.
    pub fn quota_for_rank(&self, rank: PersonnelRank) -> Option<f64> {
        self.coefficient(QuotaKey::PersonnelRank(rank))
    }
}

impl QuotaSource for QuotaRuleTable {
    fn coefficient(&self, key: QuotaKey) -> Option<f64> {
        self.rules.get(&key).copied()
    }

    fn rules(&self) -> Vec<QuotaRule> {
        self.rules
            .iter()
            .map(|(key, coefficient)| QuotaRule {
                key: *key,
                coefficient: *coefficient,
                unit: key.unit(),
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct QuotaRow {
    category: String,
    key: String,
    coefficient: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn standard_table_carries_rank_quotas() {
        let table = QuotaRuleTable::standard();
        assert_eq!(table.quota_for_rank(PersonnelRank::Professor), Some(24.0));
        assert_eq!(
            table.quota_for_rank(PersonnelRank::AssociateProfessor),
            Some(16.0)
        );
        assert_eq!(table.quota_for_rank(PersonnelRank::MidOrBelow), Some(9.0));
        assert_eq!(table.rules().len(), STANDARD_RULES.len());
    }

    #[test]
    fn csv_overrides_replace_defaults() {
        let csv = "category,key,coefficient\npersonnel_rank,professor,30\n discipline , Science , 1.5\n";
        let table = QuotaRuleTable::from_reader(Cursor::new(csv)).expect("rules parse");
        assert_eq!(table.quota_for_rank(PersonnelRank::Professor), Some(30.0));
        assert_eq!(
            table.coefficient(QuotaKey::Discipline(Discipline::Science)),
            Some(1.5)
        );
        assert_eq!(
            table.coefficient(QuotaKey::StudentLevel(StudentLevel::Master)),
            Some(4.0)
        );
    }

    #[test]
    fn csv_rejects_unknown_keys_and_bad_coefficients() {
        let unknown = "category,key,coefficient\npersonnel_rank,dean,40\n";
        assert!(matches!(
            QuotaRuleTable::from_reader(Cursor::new(unknown)),
            Err(QuotaRuleError::UnknownKey { .. })
        ));

        let negative = "category,key,coefficient\nstudent_level,master,-1\n";
        assert!(matches!(
            QuotaRuleTable::from_reader(Cursor::new(negative)),
            Err(QuotaRuleError::InvalidCoefficient { .. })
        ));
    }

    #[test]
    fn quota_rule_serializes_with_flat_key() {
        let rule = QuotaRule {
            key: QuotaKey::PersonnelRank(PersonnelRank::Professor),
            coefficient: 24.0,
            unit: QuotaUnit::SquareMetresPerPerson,
        };
        let value = serde_json::to_value(rule).expect("serializes");
        assert_eq!(value["category"], "personnel_rank");
        assert_eq!(value["key"], "professor");
        assert_eq!(value["unit"], "square_metres_per_person");
    }
}
