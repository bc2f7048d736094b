//! Booking form parsing and validation

use std::collections::HashMap;
use thiserror::Error;

/// Rejections shown to the user in place of a prediction
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormError {
    #[error("Invalid input format")]
    InvalidFormat,

    #[error("Lead time must be between 0 and 100 days")]
    LeadTime,

    #[error("Number of special requests must be between 0 and 5")]
    SpecialRequests,

    #[error("Average price per room must be between 0 and 200")]
    AveragePrice,

    #[error("Number of week nights must be between 0 and 8")]
    WeekNights,

    #[error("Number of weekend nights must be between 0 and 8")]
    WeekendNights,
}

/// One reservation as submitted through the form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookingForm {
    pub lead_time: i64,
    pub no_of_special_request: i64,
    pub avg_price_per_room: f64,
    pub arrival_month: i64,
    pub arrival_date: i64,
    pub market_segment_type: i64,
    pub no_of_week_nights: i64,
    pub no_of_weekend_nights: i64,
    pub type_of_meal_plan: i64,
    pub room_type_reserved: i64,
}

fn int_field(fields: &HashMap<String, String>, name: &str, default: i64) -> Result<i64, FormError> {
    match fields.get(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| FormError::InvalidFormat),
    }
}

fn float_field(fields: &HashMap<String, String>, name: &str, default: f64) -> Result<f64, FormError> {
    match fields.get(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| FormError::InvalidFormat),
    }
}

impl BookingForm {
    /// Parse every field, then check ranges in a fixed order.
    ///
    /// Absent fields take their defaults; a field that is present but does
    /// not parse is a format error even if another field is out of range.
    pub fn parse(fields: &HashMap<String, String>) -> Result<Self, FormError> {
        let form = Self {
            lead_time: int_field(fields, "lead_time", 0)?,
            no_of_special_request: int_field(fields, "no_of_special_request", 0)?,
            avg_price_per_room: float_field(fields, "avg_price_per_room", 0.0)?,
            arrival_month: int_field(fields, "arrival_month", 1)?,
            arrival_date: int_field(fields, "arrival_date", 1)?,
            market_segment_type: int_field(fields, "market_segment_type", 0)?,
            no_of_week_nights: int_field(fields, "no_of_week_nights", 0)?,
            no_of_weekend_nights: int_field(fields, "no_of_weekend_nights", 0)?,
            type_of_meal_plan: int_field(fields, "type_of_meal_plan", 0)?,
            room_type_reserved: int_field(fields, "room_type_reserved", 0)?,
        };
        form.validate()?;
        Ok(form)
    }

    fn validate(&self) -> Result<(), FormError> {
        if !(0..=100).contains(&self.lead_time) {
            return Err(FormError::LeadTime);
        }
        if !(0..=5).contains(&self.no_of_special_request) {
            return Err(FormError::SpecialRequests);
        }
        // NaN fails the range check too
        if !(0.0..=200.0).contains(&self.avg_price_per_room) {
            return Err(FormError::AveragePrice);
        }
        if !(0..=8).contains(&self.no_of_week_nights) {
            return Err(FormError::WeekNights);
        }
        if !(0..=8).contains(&self.no_of_weekend_nights) {
            return Err(FormError::WeekendNights);
        }
        Ok(())
    }

    /// Value for a model feature name; `no_of_special_requests` reads the
    /// singular form field.
    pub fn feature(&self, name: &str) -> Option<f64> {
        let value = match name {
            "lead_time" => self.lead_time as f64,
            "no_of_special_requests" => self.no_of_special_request as f64,
            "avg_price_per_room" => self.avg_price_per_room,
            "arrival_month" => self.arrival_month as f64,
            "arrival_date" => self.arrival_date as f64,
            "market_segment_type" => self.market_segment_type as f64,
            "no_of_week_nights" => self.no_of_week_nights as f64,
            "no_of_weekend_nights" => self.no_of_weekend_nights as f64,
            "type_of_meal_plan" => self.type_of_meal_plan as f64,
            "room_type_reserved" => self.room_type_reserved as f64,
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults_for_absent_fields() {
        let form = BookingForm::parse(&HashMap::new()).unwrap();
        assert_eq!(form.lead_time, 0);
        assert_eq!(form.arrival_month, 1);
        assert_eq!(form.arrival_date, 1);
        assert_eq!(form.avg_price_per_room, 0.0);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let form = BookingForm::parse(&fields(&[
            ("lead_time", "100"),
            ("no_of_special_request", "5"),
            ("avg_price_per_room", "200"),
            ("no_of_week_nights", "8"),
            ("no_of_weekend_nights", "0"),
        ]))
        .unwrap();
        assert_eq!(form.lead_time, 100);
        assert_eq!(form.feature("no_of_special_requests"), Some(5.0));
    }

    #[test]
    fn test_range_errors_in_order() {
        let err = BookingForm::parse(&fields(&[("lead_time", "150"), ("no_of_special_request", "9")]));
        assert_eq!(err, Err(FormError::LeadTime));
        let err = BookingForm::parse(&fields(&[("no_of_special_request", "6")]));
        assert_eq!(err, Err(FormError::SpecialRequests));
        let err = BookingForm::parse(&fields(&[("avg_price_per_room", "200.5")]));
        assert_eq!(err, Err(FormError::AveragePrice));
        let err = BookingForm::parse(&fields(&[("no_of_week_nights", "-1")]));
        assert_eq!(err, Err(FormError::WeekNights));
        let err = BookingForm::parse(&fields(&[("no_of_weekend_nights", "9")]));
        assert_eq!(err, Err(FormError::WeekendNights));
    }

    #[test]
    fn test_format_error_wins_over_range() {
        let err = BookingForm::parse(&fields(&[("lead_time", "150"), ("avg_price_per_room", "abc")]));
        assert_eq!(err, Err(FormError::InvalidFormat));
        assert_eq!(
            BookingForm::parse(&fields(&[("arrival_month", "")])),
            Err(FormError::InvalidFormat)
        );
        assert_eq!(
            BookingForm::parse(&fields(&[("lead_time", "12.5")])),
            Err(FormError::InvalidFormat)
        );
    }

    #[test]
    fn test_nan_price_rejected() {
        assert_eq!(
            BookingForm::parse(&fields(&[("avg_price_per_room", "NaN")])),
            Err(FormError::AveragePrice)
        );
    }

    #[test]
    fn test_unknown_feature() {
        let form = BookingForm::parse(&HashMap::new()).unwrap();
        assert_eq!(form.feature("no_of_adults"), None);
    }
}
