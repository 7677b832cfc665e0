//! Standardized product taxonomy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The four product families the assistant answers questions about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProductCategory {
    #[serde(rename = "Credit Card")]
    CreditCard,
    #[serde(rename = "Personal Loan")]
    PersonalLoan,
    #[serde(rename = "Savings Account")]
    SavingsAccount,
    #[serde(rename = "Money Transfers")]
    MoneyTransfers,
}

/// Raw CFPB `Product` labels and the category each one maps to.
pub const PRODUCT_MAP: &[(&str, ProductCategory)] = &[
    ("Credit card", ProductCategory::CreditCard),
    ("Credit card or prepaid card", ProductCategory::CreditCard),
    ("Prepaid card", ProductCategory::CreditCard),
    (
        "Payday loan, title loan, or personal loan",
        ProductCategory::PersonalLoan,
    ),
    ("Personal loan", ProductCategory::PersonalLoan),
    ("Checking or savings account", ProductCategory::SavingsAccount),
    ("Bank account or service", ProductCategory::SavingsAccount),
    (
        "Money transfer, virtual currency, or money service",
        ProductCategory::MoneyTransfers,
    ),
    ("Money transfers", ProductCategory::MoneyTransfers),
];

impl ProductCategory {
    pub const ALL: [ProductCategory; 4] = [
        ProductCategory::CreditCard,
        ProductCategory::PersonalLoan,
        ProductCategory::SavingsAccount,
        ProductCategory::MoneyTransfers,
    ];

    /// Map a raw product label; `None` means the record is out of scope.
    pub fn from_raw(label: &str) -> Option<Self> {
        PRODUCT_MAP
            .iter()
            .find(|(raw, _)| *raw == label)
            .map(|(_, category)| *category)
    }

    /// Display name used in the processed CSV and in chunk metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::CreditCard => "Credit Card",
            ProductCategory::PersonalLoan => "Personal Loan",
            ProductCategory::SavingsAccount => "Savings Account",
            ProductCategory::MoneyTransfers => "Money Transfers",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown product category: {}", s)))
    }
}
