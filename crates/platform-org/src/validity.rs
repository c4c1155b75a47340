//! Human duration phrases
//!
//! Subscriptions are created and extended with phrases such as `"1 year"`,
//! `"3 months"` or `"+14 days"`. This module parses those phrases into a
//! [`ValidityPeriod`] and applies them to instants with calendar semantics.
//!
//! # Grammar
//!
//! ```text
//! phrase    := component+
//! component := [sign] number unit
//! unit      := year(s) | month(s) | week(s) | day(s) | hour(s) | minute(s) | second(s)
//! ```
//!
//! The sign may stand alone (`"+ 3 days"`) or be attached to the number
//! (`"+3 days"`), and the unit may be attached to the number (`"3days"`).
//! Matching is case-insensitive.

use chrono::{DateTime, Months, TimeDelta, Utc};
use std::str::FromStr;

use crate::error::ValidityError;

/// A calendar-aware span of time.
///
/// Months (years are folded into months) are applied first with the day
/// clamped to the end of shorter months, then days, then the sub-day part.
///
/// # Examples
///
/// ```
/// use platform_org::ValidityPeriod;
///
/// let period: ValidityPeriod = "1 year 2 weeks".parse().unwrap();
/// assert_eq!(period.months, 12);
/// assert_eq!(period.days, 14);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidityPeriod {
    /// Calendar months (years count as twelve)
    pub months: i64,

    /// Whole days (weeks count as seven)
    pub days: i64,

    /// Hours, minutes and seconds, in seconds
    pub seconds: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl Unit {
    fn parse(word: &str) -> Result<Self, ValidityError> {
        let normalized = word.trim_end_matches(',').to_ascii_lowercase();
        let unit = match normalized.as_str() {
            "year" | "years" | "yr" | "yrs" => Unit::Year,
            "month" | "months" => Unit::Month,
            "week" | "weeks" => Unit::Week,
            "day" | "days" => Unit::Day,
            "hour" | "hours" => Unit::Hour,
            "minute" | "minutes" | "min" | "mins" => Unit::Minute,
            "second" | "seconds" | "sec" | "secs" => Unit::Second,
            _ => return Err(ValidityError::UnknownUnit(word.to_string())),
        };
        Ok(unit)
    }
}

impl ValidityPeriod {
    /// Whether applying the period leaves an instant unchanged.
    pub fn is_zero(&self) -> bool {
        self.months == 0 && self.days == 0 && self.seconds == 0
    }

    /// Apply the period to `start`.
    ///
    /// # Errors
    ///
    /// [`ValidityError::OutOfRange`] when the result is not representable.
    pub fn add_to(&self, start: DateTime<Utc>) -> Result<DateTime<Utc>, ValidityError> {
        let months = u32::try_from(self.months.unsigned_abs())
            .map_err(|_| ValidityError::OutOfRange)?;
        let shifted = if self.months >= 0 {
            start.checked_add_months(Months::new(months))
        } else {
            start.checked_sub_months(Months::new(months))
        }
        .ok_or(ValidityError::OutOfRange)?;

        let days = TimeDelta::try_days(self.days).ok_or(ValidityError::OutOfRange)?;
        let seconds = TimeDelta::try_seconds(self.seconds).ok_or(ValidityError::OutOfRange)?;

        shifted
            .checked_add_signed(days)
            .and_then(|t| t.checked_add_signed(seconds))
            .ok_or(ValidityError::OutOfRange)
    }

    fn add_component(&mut self, amount: i64, unit: Unit, raw: &str) -> Result<(), ValidityError> {
        let overflow = || ValidityError::InvalidNumber(raw.to_string());
        match unit {
            Unit::Year => {
                let months = amount.checked_mul(12).ok_or_else(overflow)?;
                self.months = self.months.checked_add(months).ok_or_else(overflow)?;
            }
            Unit::Month => {
                self.months = self.months.checked_add(amount).ok_or_else(overflow)?;
            }
            Unit::Week => {
                let days = amount.checked_mul(7).ok_or_else(overflow)?;
                self.days = self.days.checked_add(days).ok_or_else(overflow)?;
            }
            Unit::Day => {
                self.days = self.days.checked_add(amount).ok_or_else(overflow)?;
            }
            Unit::Hour | Unit::Minute | Unit::Second => {
                let factor = match unit {
                    Unit::Hour => 3600,
                    Unit::Minute => 60,
                    _ => 1,
                };
                let seconds = amount.checked_mul(factor).ok_or_else(overflow)?;
                self.seconds = self.seconds.checked_add(seconds).ok_or_else(overflow)?;
            }
        }
        Ok(())
    }
}

impl FromStr for ValidityPeriod {
    type Err = ValidityError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut period = ValidityPeriod::default();
        let mut tokens = input.split_whitespace().peekable();
        if tokens.peek().is_none() {
            return Err(ValidityError::Empty);
        }

        let mut pending_sign: Option<i64> = None;
        while let Some(token) = tokens.next() {
            if token == "+" || token == "-" {
                if pending_sign.is_some() {
                    return Err(ValidityError::InvalidNumber(token.to_string()));
                }
                pending_sign = Some(if token == "-" { -1 } else { 1 });
                continue;
            }

            let (number, attached_unit) = match token.find(|c: char| c.is_ascii_alphabetic()) {
                Some(idx) => token.split_at(idx),
                None => (token, ""),
            };

            let mut amount: i64 = number
                .parse()
                .map_err(|_| ValidityError::InvalidNumber(token.to_string()))?;
            if let Some(sign) = pending_sign.take() {
                amount = amount
                    .checked_mul(sign)
                    .ok_or_else(|| ValidityError::InvalidNumber(token.to_string()))?;
            }

            let unit_word = if attached_unit.is_empty() {
                tokens
                    .next()
                    .ok_or_else(|| ValidityError::MissingUnit(token.to_string()))?
            } else {
                attached_unit
            };

            period.add_component(amount, Unit::parse(unit_word)?, token)?;
        }

        if let Some(sign) = pending_sign {
            let dangling = if sign < 0 { "-" } else { "+" };
            return Err(ValidityError::MissingUnit(dangling.to_string()));
        }

        Ok(period)
    }
}
