//! Shared serving state

use super::error::ServerError;
use super::form::BookingForm;
use crate::training::ModelArtifact;
use std::sync::Arc;
use tracing::{info, warn};

/// Every feature the form can supply, in the order used when the model's
/// column names do not match the form
pub const CANONICAL_FEATURES: [&str; 10] = [
    "lead_time",
    "no_of_special_requests",
    "avg_price_per_room",
    "arrival_month",
    "arrival_date",
    "market_segment_type",
    "no_of_week_nights",
    "no_of_weekend_nights",
    "type_of_meal_plan",
    "room_type_reserved",
];

/// Order in which form values are fed to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLayout {
    features: Vec<String>,
}

impl FeatureLayout {
    /// Follow the model's own feature names when the form supplies all of
    /// them; fall back to the canonical order for ten-feature models.
    pub fn for_model(feature_names: &[String]) -> Result<Self, ServerError> {
        if feature_names
            .iter()
            .all(|name| CANONICAL_FEATURES.contains(&name.as_str()))
        {
            return Ok(Self {
                features: feature_names.to_vec(),
            });
        }
        if feature_names.len() == CANONICAL_FEATURES.len() {
            return Ok(Self {
                features: CANONICAL_FEATURES.iter().map(|s| s.to_string()).collect(),
            });
        }
        Err(ServerError::Layout(format!(
            "model features {:?} cannot be built from the booking form",
            feature_names
        )))
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn is_model_order(&self, feature_names: &[String]) -> bool {
        self.features == feature_names
    }

    /// `(model feature, form field fed to it)` for every position where the
    /// two names differ
    pub fn mismatches(&self, feature_names: &[String]) -> Vec<(String, String)> {
        feature_names
            .iter()
            .zip(&self.features)
            .filter(|(model, fed)| model != fed)
            .map(|(model, fed)| (model.clone(), fed.clone()))
            .collect()
    }

    /// Feature row for one submission
    pub fn row(&self, form: &BookingForm) -> Vec<f64> {
        self.features
            .iter()
            .map(|name| form.feature(name).unwrap_or_default())
            .collect()
    }
}

/// State shared by every request; the model is read-only after startup
pub struct AppState {
    pub model: Arc<ModelArtifact>,
    pub layout: FeatureLayout,
}

impl AppState {
    pub fn new(model: ModelArtifact) -> Result<Self, ServerError> {
        let layout = FeatureLayout::for_model(&model.feature_names)?;
        if layout.is_model_order(&model.feature_names) {
            info!(features = ?layout.features(), "Feeding form fields in model order");
        } else {
            warn!(
                mismatched = ?layout.mismatches(&model.feature_names),
                "Model features are not all form fields, feeding form values in canonical order"
            );
        }
        Ok(Self {
            model: Arc::new(model),
            layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_model_order_when_all_names_known() {
        let model = names(&["avg_price_per_room", "lead_time", "no_of_special_requests"]);
        let layout = FeatureLayout::for_model(&model).unwrap();
        assert!(layout.is_model_order(&model));

        let mut fields = std::collections::HashMap::new();
        fields.insert("lead_time".to_string(), "50".to_string());
        fields.insert("avg_price_per_room".to_string(), "99.5".to_string());
        fields.insert("no_of_special_request".to_string(), "2".to_string());
        let form = BookingForm::parse(&fields).unwrap();
        assert_eq!(layout.row(&form), vec![99.5, 50.0, 2.0]);
    }

    #[test]
    fn test_canonical_fallback_for_ten_features() {
        let model: Vec<String> = (0..10).map(|i| format!("f{}", i)).collect();
        let layout = FeatureLayout::for_model(&model).unwrap();
        assert_eq!(layout.features()[1], "no_of_special_requests");
        let row = layout.row(&BookingForm::parse(&Default::default()).unwrap());
        assert_eq!(row[3], 1.0);
        assert_eq!(row[4], 1.0);
    }

    #[test]
    fn test_canonical_fallback_reports_mismatches() {
        let mut model: Vec<String> = CANONICAL_FEATURES.iter().map(|s| s.to_string()).collect();
        model[0] = "no_of_adults".into();
        model[9] = "repeated_guest".into();
        let layout = FeatureLayout::for_model(&model).unwrap();

        assert!(!layout.is_model_order(&model));
        assert_eq!(
            layout.mismatches(&model),
            vec![
                ("no_of_adults".to_string(), "lead_time".to_string()),
                ("repeated_guest".to_string(), "room_type_reserved".to_string()),
            ]
        );

        let single = names(&["lead_time"]);
        let layout = FeatureLayout::for_model(&single).unwrap();
        assert!(layout.mismatches(&single).is_empty());
    }

    #[test]
    fn test_unusable_model_rejected() {
        let model = names(&["lead_time", "no_of_adults"]);
        assert!(matches!(FeatureLayout::for_model(&model), Err(ServerError::Layout(_))));
    }
}
