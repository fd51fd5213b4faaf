use std::cmp::Ordering;

use serde::de::Error as DeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::UtcDateTime;

/// One element of an upstream `data` array.
///
/// Upstream payloads are untrusted: anything that is not a JSON object is kept
/// as [`RawSaleRecord::Malformed`] so normalization can skip it explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSaleRecord {
    Sale(RawSale),
    Malformed(Value),
}

impl RawSaleRecord {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self::Sale(RawSale::from_fields(&fields)),
            other => Self::Malformed(other),
        }
    }
}

impl From<RawSale> for RawSaleRecord {
    fn from(value: RawSale) -> Self {
        Self::Sale(value)
    }
}

impl<'de> Deserialize<'de> for RawSaleRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// Loosely-typed sale fields as sent by the upstream source. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSale {
    pub grade: Option<String>,
    pub end_date: Option<String>,
    pub auction_house: Option<String>,
    pub sale_type: Option<String>,
    pub cert_number: Option<String>,
    pub sale_price: Option<String>,
}

impl RawSale {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            grade: text_field(fields, "GradeString"),
            end_date: text_field(fields, "EndDate"),
            auction_house: text_field(fields, "Name"),
            sale_type: text_field(fields, "AuctionType"),
            cert_number: text_field(fields, "CertNo"),
            sale_price: text_field(fields, "SalePrice"),
        }
    }

    pub fn with_grade(mut self, grade: impl Into<String>) -> Self {
        self.grade = Some(grade.into());
        self
    }

    pub fn with_end_date(mut self, end_date: impl Into<String>) -> Self {
        self.end_date = Some(end_date.into());
        self
    }

    pub fn with_sale_price(mut self, sale_price: impl Into<String>) -> Self {
        self.sale_price = Some(sale_price.into());
        self
    }

    pub fn with_auction_house(mut self, auction_house: impl Into<String>) -> Self {
        self.auction_house = Some(auction_house.into());
        self
    }
}

/// Strings pass through; numbers and booleans are rendered; null, arrays and objects count as absent.
fn text_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Sale date that either parsed or is explicitly marked unparseable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaleDate {
    Parsed(UtcDateTime),
    Unparseable(String),
}

impl SaleDate {
    pub fn parse(raw: Option<&str>) -> Self {
        let raw = raw.unwrap_or_default();
        match UtcDateTime::parse_sale_date(raw) {
            Some(parsed) => Self::Parsed(parsed),
            None => Self::Unparseable(raw.to_owned()),
        }
    }

    pub const fn timestamp(&self) -> Option<UtcDateTime> {
        match self {
            Self::Parsed(timestamp) => Some(*timestamp),
            Self::Unparseable(_) => None,
        }
    }

    /// Most recent first; unparseable dates after every parsed one, equal among themselves.
    pub fn cmp_recent_first(&self, other: &Self) -> Ordering {
        match (self.timestamp(), other.timestamp()) {
            (Some(left), Some(right)) => right.cmp(&left),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl Serialize for SaleDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Parsed(timestamp) => timestamp.serialize(serializer),
            Self::Unparseable(raw) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("unparseable", raw)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for SaleDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(text) => Ok(Self::parse(Some(&text))),
            Value::Null => Ok(Self::Unparseable(String::new())),
            Value::Object(fields) => match fields.get("unparseable") {
                Some(Value::String(raw)) => Ok(Self::Unparseable(raw.clone())),
                _ => Err(D::Error::custom("sale date object must carry an 'unparseable' string")),
            },
            other => Err(D::Error::custom(format!("unsupported sale date: {other}"))),
        }
    }
}

/// Normalized sale. Built once by normalization and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionSale {
    pub date: SaleDate,
    pub auction_house: String,
    pub sale_type: String,
    #[serde(default)]
    pub certification: String,
    pub price: f64,
}

impl AuctionSale {
    /// Applies the per-field defaults to one raw sale.
    pub fn from_raw(raw: &RawSale) -> Self {
        Self {
            date: SaleDate::parse(raw.end_date.as_deref()),
            auction_house: non_empty_or_unknown(raw.auction_house.as_deref()),
            sale_type: non_empty_or_unknown(raw.sale_type.as_deref()),
            certification: raw.cert_number.clone().unwrap_or_default(),
            price: parse_price(raw.sale_price.as_deref()),
        }
    }

    pub const fn timestamp(&self) -> Option<UtcDateTime> {
        self.date.timestamp()
    }
}

fn non_empty_or_unknown(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_owned(),
        _ => String::from("Unknown"),
    }
}

/// Keeps only digits and `.`, then parses the longest numeric prefix with at
/// most one decimal point. Anything without a leading digit becomes 0.
pub fn parse_price(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };

    let mut prefix = String::new();
    let mut seen_point = false;
    for ch in raw.chars().filter(|ch| ch.is_ascii_digit() || *ch == '.') {
        if ch == '.' {
            if seen_point {
                break;
            }
            seen_point = true;
        }
        prefix.push(ch);
    }

    if !prefix.chars().any(|ch| ch.is_ascii_digit()) {
        return 0.0;
    }
    match prefix.parse::<f64>() {
        Ok(price) if price.is_finite() && price >= 0.0 => price,
        _ => 0.0,
    }
}
