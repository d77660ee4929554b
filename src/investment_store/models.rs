//! Investment record models shared by the stores, the query builder and the aggregator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// =============================================================================
// Enumerations
// =============================================================================

/// Whether an investment is domestic (PMDN) or foreign (PMA).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvestmentStatus {
    #[serde(rename = "PMDN")]
    Domestic,
    #[serde(rename = "PMA")]
    Foreign,
}

impl InvestmentStatus {
    /// Convert from database string representation
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "PMDN" => Some(InvestmentStatus::Domestic),
            "PMA" => Some(InvestmentStatus::Foreign),
            _ => None,
        }
    }

    /// Convert to database string representation
    pub fn to_db_str(&self) -> &'static str {
        match self {
            InvestmentStatus::Domestic => "PMDN",
            InvestmentStatus::Foreign => "PMA",
        }
    }

    /// Parse user input. Accepts both the source labels and the English names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PMDN" | "DOMESTIC" => Some(InvestmentStatus::Domestic),
            "PMA" | "FOREIGN" => Some(InvestmentStatus::Foreign),
            _ => None,
        }
    }
}

impl fmt::Display for InvestmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

/// A categorical dimension records can be grouped by or enumerated over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Year,
    Sector,
    Region,
    Province,
    Country,
    Status,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Year,
        Dimension::Sector,
        Dimension::Region,
        Dimension::Province,
        Dimension::Country,
        Dimension::Status,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Dimension::Year => "year",
            Dimension::Sector => "sector",
            Dimension::Region => "region",
            Dimension::Province => "province",
            Dimension::Country => "country",
            Dimension::Status => "status",
        }
    }

    /// Parse a dimension name. Accepts the column names and the reference
    /// dashboard column names (`Tahun`, `SektorUtama`, ...). Case-sensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "year" | "Tahun" => Some(Dimension::Year),
            "sector" | "SektorUtama" => Some(Dimension::Sector),
            "region" | "Wilayah" => Some(Dimension::Region),
            "province" | "Provinsi" => Some(Dimension::Province),
            "country" | "Negara" => Some(Dimension::Country),
            "status" | "Status" => Some(Dimension::Status),
            _ => None,
        }
    }

    /// The grouping key of `record` along this dimension.
    pub fn key_of(&self, record: &InvestmentRecord) -> GroupKey {
        let text = |value: &Option<String>| match value {
            Some(v) => GroupKey::Text(v.clone()),
            None => GroupKey::Null,
        };
        match self {
            Dimension::Year => GroupKey::Year(record.year),
            Dimension::Sector => text(&record.sector),
            Dimension::Region => text(&record.region),
            Dimension::Province => text(&record.province),
            Dimension::Country => text(&record.country),
            Dimension::Status => GroupKey::Text(record.status.to_db_str().to_string()),
        }
    }
}

/// A single field records can be ordered by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    Year,
    Province,
    Sector,
    Region,
    Country,
    Status,
    DomesticAmount,
    ForeignAmount,
    Projects,
    DomesticWorkers,
    ForeignWorkers,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Year => "year",
            SortField::Province => "province",
            SortField::Sector => "sector",
            SortField::Region => "region",
            SortField::Country => "country",
            SortField::Status => "status",
            SortField::DomesticAmount => "domestic_amount",
            SortField::ForeignAmount => "foreign_amount",
            SortField::Projects => "projects",
            SortField::DomesticWorkers => "domestic_workers",
            SortField::ForeignWorkers => "foreign_workers",
        }
    }

    /// Parse a sort field. Accepts the column names and the reference dashboard
    /// column names. Case-sensitive, like the reference schema identifiers.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "id" => Some(SortField::Id),
            "year" | "Tahun" => Some(SortField::Year),
            "province" | "Provinsi" => Some(SortField::Province),
            "sector" | "SektorUtama" => Some(SortField::Sector),
            "region" | "Wilayah" => Some(SortField::Region),
            "country" | "Negara" => Some(SortField::Country),
            "status" | "Status" => Some(SortField::Status),
            "domestic_amount" | "InvestasiRpJuta" => Some(SortField::DomesticAmount),
            "foreign_amount" | "TambahanInvestasiDalamUSDRibu" => Some(SortField::ForeignAmount),
            "projects" | "Proyek" => Some(SortField::Projects),
            "domestic_workers" | "TKI" => Some(SortField::DomesticWorkers),
            "foreign_workers" | "TKA" => Some(SortField::ForeignWorkers),
            _ => None,
        }
    }

    pub fn is_amount(&self) -> bool {
        matches!(self, SortField::DomesticAmount | SortField::ForeignAmount)
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self,
            SortField::Province
                | SortField::Sector
                | SortField::Region
                | SortField::Country
                | SortField::Status
        )
    }

    /// Extract this field's value from a record.
    pub fn value_of(&self, record: &InvestmentRecord) -> SortValue {
        let text = |value: &Option<String>| match value {
            Some(v) => SortValue::Text(v.clone()),
            None => SortValue::Null,
        };
        match self {
            SortField::Id => SortValue::Integer(record.id),
            SortField::Year => SortValue::Integer(record.year as i64),
            SortField::Province => text(&record.province),
            SortField::Sector => text(&record.sector),
            SortField::Region => text(&record.region),
            SortField::Country => text(&record.country),
            SortField::Status => SortValue::Text(record.status.to_db_str().to_string()),
            SortField::DomesticAmount => SortValue::Amount(record.domestic_amount),
            SortField::ForeignAmount => SortValue::Amount(record.foreign_amount),
            SortField::Projects => SortValue::Integer(record.projects as i64),
            SortField::DomesticWorkers => SortValue::Integer(record.domestic_workers as i64),
            SortField::ForeignWorkers => SortValue::Integer(record.foreign_workers as i64),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

// =============================================================================
// Values
// =============================================================================

/// The value of a sort field for one record. NULL orders below everything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortValue {
    Null,
    Integer(i64),
    Amount(Decimal),
    Text(String),
}

impl SortValue {
    /// Compare two values of the same field. `None` for NULL operands, which
    /// never satisfy a comparison predicate.
    pub fn compare(&self, other: &SortValue) -> Option<Ordering> {
        match (self, other) {
            (SortValue::Integer(a), SortValue::Integer(b)) => Some(a.cmp(b)),
            (SortValue::Amount(a), SortValue::Amount(b)) => Some(a.cmp(b)),
            (SortValue::Text(a), SortValue::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used for sorting, NULL first.
    pub fn sort_cmp(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Null, SortValue::Null) => Ordering::Equal,
            (SortValue::Null, _) => Ordering::Less,
            (_, SortValue::Null) => Ordering::Greater,
            _ => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }
}

/// Key of one aggregation bucket.
///
/// Years order numerically, text values lexicographically, and records with a
/// missing value collect under `Null`, which orders last.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupKey {
    Year(i32),
    Text(String),
    Null,
}

impl GroupKey {
    pub fn as_year(&self) -> Option<i32> {
        match self {
            GroupKey::Year(year) => Some(*year),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            GroupKey::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Year(year) => write!(f, "{}", year),
            GroupKey::Text(text) => f.write_str(text),
            GroupKey::Null => f.write_str("(none)"),
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// One investment entry. Immutable once loaded.
///
/// Exactly one of `domestic_amount` / `foreign_amount` is populated, chosen by
/// `status`; the other one is zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentRecord {
    pub id: i64,
    pub year: i32,
    pub province: Option<String>,
    pub sector: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub status: InvestmentStatus,
    pub domestic_amount: Decimal,
    pub foreign_amount: Decimal,
    pub projects: u32,
    pub domestic_workers: u32,
    pub foreign_workers: u32,
}

impl InvestmentRecord {
    /// The populated amount, in the currency implied by `status`.
    pub fn amount(&self) -> Decimal {
        match self.status {
            InvestmentStatus::Domestic => self.domestic_amount,
            InvestmentStatus::Foreign => self.foreign_amount,
        }
    }
}

/// A record that has not been assigned an id yet. Input to bulk seeding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvestmentRecord {
    pub year: i32,
    pub province: Option<String>,
    pub sector: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub status: InvestmentStatus,
    pub domestic_amount: Decimal,
    pub foreign_amount: Decimal,
    pub projects: u32,
    pub domestic_workers: u32,
    pub foreign_workers: u32,
}

impl NewInvestmentRecord {
    /// A domestic (PMDN) entry of `amount` in domestic currency.
    pub fn domestic(year: i32, amount: Decimal) -> Self {
        Self::new(year, InvestmentStatus::Domestic, amount, Decimal::ZERO)
    }

    /// A foreign (PMA) entry of `amount` in foreign currency.
    pub fn foreign(year: i32, amount: Decimal) -> Self {
        Self::new(year, InvestmentStatus::Foreign, Decimal::ZERO, amount)
    }

    fn new(year: i32, status: InvestmentStatus, domestic: Decimal, foreign: Decimal) -> Self {
        Self {
            year,
            province: None,
            sector: None,
            region: None,
            country: None,
            status,
            domestic_amount: domestic,
            foreign_amount: foreign,
            projects: 0,
            domestic_workers: 0,
            foreign_workers: 0,
        }
    }

    pub fn with_sector(mut self, sector: &str) -> Self {
        self.sector = Some(sector.to_string());
        self
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn with_province(mut self, province: &str) -> Self {
        self.province = Some(province.to_string());
        self
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_string());
        self
    }

    pub fn with_projects(mut self, projects: u32) -> Self {
        self.projects = projects;
        self
    }

    pub fn with_workers(mut self, domestic: u32, foreign: u32) -> Self {
        self.domestic_workers = domestic;
        self.foreign_workers = foreign;
        self
    }

    /// Check the amount partition: non-negative amounts, and the amount that
    /// does not match `status` is zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.domestic_amount.is_sign_negative() && !self.domestic_amount.is_zero() {
            return Err(format!(
                "domestic amount must be non-negative, got {}",
                self.domestic_amount
            ));
        }
        if self.foreign_amount.is_sign_negative() && !self.foreign_amount.is_zero() {
            return Err(format!(
                "foreign amount must be non-negative, got {}",
                self.foreign_amount
            ));
        }
        match self.status {
            InvestmentStatus::Domestic if !self.foreign_amount.is_zero() => Err(format!(
                "PMDN record carries a foreign amount of {}",
                self.foreign_amount
            )),
            InvestmentStatus::Foreign if !self.domestic_amount.is_zero() => Err(format!(
                "PMA record carries a domestic amount of {}",
                self.domestic_amount
            )),
            _ => Ok(()),
        }
    }

    pub fn into_record(self, id: i64) -> InvestmentRecord {
        InvestmentRecord {
            id,
            year: self.year,
            province: self.province,
            sector: self.sector,
            region: self.region,
            country: self.country,
            status: self.status,
            domestic_amount: self.domestic_amount,
            foreign_amount: self.foreign_amount,
            projects: self.projects,
            domestic_workers: self.domestic_workers,
            foreign_workers: self.foreign_workers,
        }
    }
}

/// Smallest and largest positive domestic amount in the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: Decimal,
    pub max: Decimal,
}
