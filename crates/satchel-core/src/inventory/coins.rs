//! Coin denominations, coin purses and exact coin valuation

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coin limit of the belt pouch
pub const BELT_POUCH_LIMIT: u32 = 50;

/// Coin limit for coin containers that don't declare one
pub const DEFAULT_PURSE_LIMIT: u32 = 100;

/// Name given to a freshly created belt pouch
pub const BELT_POUCH_NAME: &str = "Coin Purse";

/// A currency denomination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Denomination {
    #[serde(rename = "PP")]
    Platinum,
    #[serde(rename = "GP")]
    Gold,
    #[serde(rename = "SP")]
    Silver,
    #[serde(rename = "CP")]
    Copper,
    #[serde(rename = "EP")]
    Electrum,
    #[serde(rename = "Gems")]
    Gems,
}

impl Denomination {
    /// Canonical display order
    pub const ALL: [Denomination; 6] = [
        Denomination::Platinum,
        Denomination::Gold,
        Denomination::Silver,
        Denomination::Copper,
        Denomination::Electrum,
        Denomination::Gems,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Denomination::Platinum => "PP",
            Denomination::Gold => "GP",
            Denomination::Silver => "SP",
            Denomination::Copper => "CP",
            Denomination::Electrum => "EP",
            Denomination::Gems => "Gems",
        }
    }

    /// Value of one coin in hundredths of a gold piece.
    ///
    /// Gems count as one gold each until they carry their own appraisal.
    pub fn rate_hundredths(self) -> u64 {
        match self {
            Denomination::Platinum => 500,
            Denomination::Gold => 100,
            Denomination::Electrum => 50,
            Denomination::Silver => 10,
            Denomination::Copper => 1,
            Denomination::Gems => 100,
        }
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Denomination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PP" => Ok(Denomination::Platinum),
            "GP" => Ok(Denomination::Gold),
            "SP" => Ok(Denomination::Silver),
            "CP" => Ok(Denomination::Copper),
            "EP" => Ok(Denomination::Electrum),
            "GEMS" | "GEM" => Ok(Denomination::Gems),
            other => Err(format!("unknown denomination: {}", other)),
        }
    }
}

/// Exact coin value, stored in hundredths of a gold piece
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct CoinValue(pub u64);

impl CoinValue {
    pub fn from_coins(denomination: Denomination, amount: u32) -> Self {
        Self(denomination.rate_hundredths() * u64::from(amount))
    }

    pub fn as_gold(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl std::ops::Add for CoinValue {
    type Output = CoinValue;

    fn add(self, rhs: CoinValue) -> CoinValue {
        CoinValue(self.0 + rhs.0)
    }
}

impl std::iter::Sum for CoinValue {
    fn sum<I: Iterator<Item = CoinValue>>(iter: I) -> Self {
        iter.fold(CoinValue::default(), |a, b| a + b)
    }
}

impl fmt::Display for CoinValue {
    /// Gold amount without trailing zeros: "8", "8.5", "0.03"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}", whole)
        } else if frac % 10 == 0 {
            write!(f, "{}.{}", whole, frac / 10)
        } else {
            write!(f, "{}.{:02}", whole, frac)
        }
    }
}

/// Coin-container capability attached to an item head
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinPurse {
    /// Denominations this container tracks, in display order
    pub types: Vec<Denomination>,
    /// Amount held per denomination; every entry of `types` is present
    pub amounts: BTreeMap<Denomination, u32>,
    /// Maximum total number of coins held
    pub limit: u32,
}

impl CoinPurse {
    /// An empty purse over the given denominations
    pub fn new(types: Vec<Denomination>, limit: u32) -> Self {
        let types = if types.is_empty() {
            Denomination::ALL.to_vec()
        } else {
            types
        };
        let amounts = types.iter().map(|d| (*d, 0)).collect();
        Self {
            types,
            amounts,
            limit,
        }
    }

    /// The canonical belt pouch purse: every denomination, limit 50
    pub fn belt_pouch() -> Self {
        Self::new(Denomination::ALL.to_vec(), BELT_POUCH_LIMIT)
    }

    /// Same denominations and limit, all amounts zeroed
    pub fn zeroed(&self) -> Self {
        Self::new(self.types.clone(), self.limit)
    }

    pub fn amount(&self, denomination: Denomination) -> u32 {
        self.amounts.get(&denomination).copied().unwrap_or(0)
    }

    /// Total number of coins held, across all denominations
    pub fn total_coins(&self) -> u32 {
        self.amounts
            .values()
            .fold(0u32, |total, amount| total.saturating_add(*amount))
    }

    /// Set one denomination, clamped so the purse never exceeds its limit.
    ///
    /// Returns the amount actually stored.
    pub fn set_amount(&mut self, denomination: Denomination, requested: u32) -> u32 {
        let others: u64 = self
            .amounts
            .iter()
            .filter(|(d, _)| **d != denomination)
            .map(|(_, a)| u64::from(*a))
            .sum();
        let room = u64::from(self.limit).saturating_sub(others);
        let stored = u64::from(requested).min(room) as u32;
        if !self.types.contains(&denomination) {
            self.types.push(denomination);
        }
        self.amounts.insert(denomination, stored);
        stored
    }

    /// Gold value of the purse contents
    pub fn value(&self) -> CoinValue {
        self.amounts
            .iter()
            .map(|(d, a)| CoinValue::from_coins(*d, *a))
            .sum()
    }

    /// "4/50 coins (1PP 3GP)"
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .types
            .iter()
            .filter_map(|d| {
                let amount = self.amount(*d);
                (amount > 0).then(|| format!("{}{}", amount, d))
            })
            .collect();
        let held = if parts.is_empty() {
            "0".to_string()
        } else {
            parts.join(" ")
        };
        format!("{}/{} coins ({})", self.total_coins(), self.limit, held)
    }
}

/// Extract an opening balance from names such as "Coin Pouch 32gp".
pub(crate) fn parse_amount_from_name(name: &str) -> Option<(Denomination, u32)> {
    let bytes = name.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let letters_start = i;
            while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                i += 1;
            }
            if letters_start == i {
                continue;
            }
            let amount: u32 = name[start..letters_start].parse().ok()?;
            return match name[letters_start..i].parse::<Denomination>() {
                Ok(Denomination::Gems) | Err(_) => None,
                Ok(d) => Some((d, amount)),
            };
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_value_formatting() {
        assert_eq!(CoinValue(800).to_string(), "8");
        assert_eq!(CoinValue(850).to_string(), "8.5");
        assert_eq!(CoinValue(3).to_string(), "0.03");
        assert_eq!(CoinValue(1234).to_string(), "12.34");
        assert_eq!(CoinValue(0).to_string(), "0");
    }

    #[test]
    fn test_purse_value_uses_conversion_table() {
        let mut purse = CoinPurse::belt_pouch();
        purse.set_amount(Denomination::Platinum, 1);
        purse.set_amount(Denomination::Gold, 3);
        assert_eq!(purse.value(), CoinValue(800));
        assert_eq!(purse.value().to_string(), "8");

        purse.set_amount(Denomination::Electrum, 1);
        purse.set_amount(Denomination::Silver, 2);
        purse.set_amount(Denomination::Copper, 5);
        // 8 + 0.5 + 0.2 + 0.05
        assert_eq!(purse.value().to_string(), "8.75");
    }

    #[test]
    fn test_set_amount_clamps_to_remaining_capacity() {
        let mut purse = CoinPurse::belt_pouch();
        assert_eq!(purse.set_amount(Denomination::Gold, 40), 40);
        assert_eq!(purse.set_amount(Denomination::Silver, 25), 10);
        assert_eq!(purse.total_coins(), 50);
        // Lowering a denomination frees room again
        assert_eq!(purse.set_amount(Denomination::Gold, 10), 10);
        assert_eq!(purse.set_amount(Denomination::Silver, 40), 40);
    }

    #[test]
    fn test_summary() {
        let mut purse = CoinPurse::belt_pouch();
        assert_eq!(purse.summary(), "0/50 coins (0)");
        purse.set_amount(Denomination::Platinum, 1);
        purse.set_amount(Denomination::Gold, 3);
        assert_eq!(purse.summary(), "4/50 coins (1PP 3GP)");
    }

    #[test]
    fn test_denomination_parse_is_case_insensitive() {
        assert_eq!("gp".parse::<Denomination>().unwrap(), Denomination::Gold);
        assert_eq!("Gems".parse::<Denomination>().unwrap(), Denomination::Gems);
        assert!("zz".parse::<Denomination>().is_err());
    }

    #[test]
    fn test_parse_amount_from_name() {
        assert_eq!(
            parse_amount_from_name("Coin Pouch 32gp"),
            Some((Denomination::Gold, 32))
        );
        assert_eq!(
            parse_amount_from_name("coins 7SP"),
            Some((Denomination::Silver, 7))
        );
        assert_eq!(parse_amount_from_name("Coin Purse"), None);
        assert_eq!(parse_amount_from_name("Coin 12 gp"), None);
    }

    #[test]
    fn test_parse_amount_leading_group() {
        assert_eq!(
            parse_amount_from_name("32gp coins"),
            Some((Denomination::Gold, 32))
        );
    }

    #[test]
    fn test_parse_amount_skips_bare_numbers() {
        assert_eq!(
            parse_amount_from_name("Coin 12 bag 5sp"),
            Some((Denomination::Silver, 5))
        );
        // Only the first suffixed group counts
        assert_eq!(
            parse_amount_from_name("Pouch 3cp 9gp"),
            Some((Denomination::Copper, 3))
        );
    }

    #[test]
    fn test_parse_amount_unknown_suffix() {
        assert_eq!(parse_amount_from_name("3xx coins"), None);
        assert_eq!(parse_amount_from_name("2gems coin"), None);
        assert_eq!(parse_amount_from_name("99999999999gp"), None);
    }

    #[test]
    fn test_huge_loaded_amounts_do_not_overflow() {
        let mut purse = CoinPurse::new(Denomination::ALL.to_vec(), DEFAULT_PURSE_LIMIT);
        purse.amounts.insert(Denomination::Gold, u32::MAX);
        purse.amounts.insert(Denomination::Silver, 5);
        assert_eq!(purse.total_coins(), u32::MAX);
        assert_eq!(purse.set_amount(Denomination::Copper, 1), 0);
        assert_eq!(purse.set_amount(Denomination::Gold, 500), 95);
        assert_eq!(purse.total_coins(), 100);
    }
}
