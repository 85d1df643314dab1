use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Damage severity reported by staff on a returned book.
///
/// Each category charges a fixed percentage of the book's replacement value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageCategory {
    MinorWear,
    TornPages,
    WaterDamage,
    SevereDamage,
    Lost,
}

impl DamageCategory {
    pub const ALL: [DamageCategory; 5] = [
        DamageCategory::MinorWear,
        DamageCategory::TornPages,
        DamageCategory::WaterDamage,
        DamageCategory::SevereDamage,
        DamageCategory::Lost,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            DamageCategory::MinorWear => "minor_wear",
            DamageCategory::TornPages => "torn_pages",
            DamageCategory::WaterDamage => "water_damage",
            DamageCategory::SevereDamage => "severe_damage",
            DamageCategory::Lost => "lost",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DamageCategory::MinorWear => "Minor wear",
            DamageCategory::TornPages => "Torn pages",
            DamageCategory::WaterDamage => "Water damage",
            DamageCategory::SevereDamage => "Severe damage",
            DamageCategory::Lost => "Lost",
        }
    }

    /// Share of the replacement value charged, in percent
    pub fn fine_percentage(&self) -> Decimal {
        match self {
            DamageCategory::MinorWear => dec!(10),
            DamageCategory::TornPages => dec!(20),
            DamageCategory::WaterDamage => dec!(50),
            DamageCategory::SevereDamage => dec!(75),
            DamageCategory::Lost => dec!(100),
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl std::str::FromStr for DamageCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("Unknown damage category: {}", s))
    }
}

/// `book_value * percentage / 100`
pub fn damage_fine(book_value: Decimal, category: DamageCategory) -> Decimal {
    book_value * category.fine_percentage() / dec!(100)
}

/// Same as [`damage_fine`] but keyed by the stored category code.
///
/// An unknown code charges nothing.
pub fn damage_fine_for_code(book_value: Decimal, code: &str) -> Decimal {
    DamageCategory::from_code(code)
        .map(|category| damage_fine(book_value, category))
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_torn_pages_example() {
        assert_eq!(damage_fine(dec!(100000), DamageCategory::TornPages), dec!(20000));
    }

    #[test]
    fn test_every_category_charges_its_percentage() {
        let values = [dec!(0), dec!(1), dec!(150000), dec!(87500.50)];
        for category in DamageCategory::ALL {
            for value in values {
                assert_eq!(
                    damage_fine(value, category),
                    value * category.fine_percentage() / dec!(100)
                );
            }
        }
    }

    #[test]
    fn test_lost_book_charges_full_value() {
        assert_eq!(damage_fine(dec!(150000), DamageCategory::Lost), dec!(150000));
    }

    #[test]
    fn test_unknown_code_charges_nothing() {
        assert_eq!(damage_fine_for_code(dec!(100000), "coffee_stain"), Decimal::ZERO);
        assert_eq!(damage_fine_for_code(dec!(100000), ""), Decimal::ZERO);
    }

    #[test]
    fn test_codes_round_trip() {
        for category in DamageCategory::ALL {
            assert_eq!(category.code().parse::<DamageCategory>(), Ok(category));
        }
    }

    #[test]
    fn test_percentages_are_ascending() {
        let pcts: Vec<_> = DamageCategory::ALL.iter().map(|c| c.fine_percentage()).collect();
        assert!(pcts.windows(2).all(|w| w[0] < w[1]));
    }
}
