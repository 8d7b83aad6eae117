//! Canonical card record

use std::fmt;

use derive_more::Display;

/// Card holder gender
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
pub enum Gender {
    /// Not present or not recognised
    #[default]
    #[display("unknown")]
    Unknown,
    /// Male
    #[display("male")]
    Male,
    /// Female
    #[display("female")]
    Female,
}

/// Kind of card a record was read from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
pub enum CardType {
    /// Not known
    #[default]
    #[display("unknown")]
    Unknown,
    /// National health or ID card
    #[display("health card")]
    HealthCard,
    /// Staff or access card read over NFC
    #[display("staff card")]
    StaffCard,
}

/// Gregorian calendar date, kept as the digit strings read from the card
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{year}-{month}-{day}")]
pub struct CardDate {
    /// Four digit year
    pub year: String,
    /// Two digit month
    pub month: String,
    /// Two digit day
    pub day: String,
}

impl CardDate {
    /// Create a date from its parts
    pub fn new(year: impl Into<String>, month: impl Into<String>, day: impl Into<String>) -> Self {
        Self {
            year: year.into(),
            month: month.into(),
            day: day.into(),
        }
    }
}

/// Card holder data decoded from any supported card
///
/// A record with an empty card number is empty and never counts as a
/// successful read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardRecord {
    /// Card number
    pub card_number: String,
    /// National ID number
    pub national_id: String,
    /// Card holder name
    pub name: String,
    /// Card holder gender
    pub gender: Gender,
    /// Card type
    pub card_type: CardType,
    /// Date of birth
    pub birth_date: Option<CardDate>,
    /// Issue date
    pub issued_date: Option<CardDate>,
    /// Expiry date
    pub expired_date: Option<CardDate>,
}

impl CardRecord {
    /// Create an empty record of the given card type
    pub fn new(card_type: CardType) -> Self {
        Self {
            card_type,
            ..Self::default()
        }
    }

    /// Whether the record carries no card number
    pub fn is_empty(&self) -> bool {
        self.card_number.is_empty()
    }
}

impl fmt::Display for CardRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn date(value: Option<&CardDate>) -> String {
            value.map_or_else(|| "-".to_string(), ToString::to_string)
        }

        writeln!(f, "Card type:   {}", self.card_type)?;
        writeln!(f, "Card number: {}", self.card_number)?;
        writeln!(f, "National ID: {}", self.national_id)?;
        writeln!(f, "Name:        {}", self.name)?;
        writeln!(f, "Gender:      {}", self.gender)?;
        writeln!(f, "Birth date:  {}", date(self.birth_date.as_ref()))?;
        writeln!(f, "Issued:      {}", date(self.issued_date.as_ref()))?;
        write!(f, "Expires:     {}", date(self.expired_date.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record() {
        let record = CardRecord::new(CardType::StaffCard);
        assert!(record.is_empty());
        assert_eq!(record.card_type, CardType::StaffCard);

        let record = CardRecord {
            card_number: "04A1B2C3".into(),
            ..record
        };
        assert!(!record.is_empty());
    }

    #[test]
    fn test_date_display() {
        assert_eq!(CardDate::new("1985", "03", "12").to_string(), "1985-03-12");
    }
}
