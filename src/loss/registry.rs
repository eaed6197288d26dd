use std::collections::BTreeMap;

use log::debug;
use serde_json::{Map, Value};

use crate::error::{AslError, Result};
use crate::loss::asymmetric::{self, SigmoidAsymmetricLoss};
use crate::loss::bce::{self, BinaryCrossEntropy};
use crate::loss::Loss;

/// Builds a loss from the configuration map produced by `Loss::get_config`.
pub type LossFactory = fn(Map<String, Value>) -> Result<Box<dyn Loss>>;

/// Named factories for persisted losses.
///
/// A persisted loss is `{"class_name": <key>, "config": {...}}`, as written by
/// `Loss::to_json`.
#[derive(Debug, Clone, Default)]
pub struct LossRegistry {
    factories: BTreeMap<String, LossFactory>,
}

impl LossRegistry {
    pub fn new() -> Self {
        LossRegistry::default()
    }

    /// Registry holding every loss shipped with the crate.
    pub fn with_builtin() -> Self {
        let mut registry = LossRegistry::new();
        registry.factories.insert(asymmetric::CLASS_NAME.to_string(), build_asymmetric);
        registry.factories.insert(bce::CLASS_NAME.to_string(), build_bce);
        registry
    }

    pub fn register(&mut self, key: impl Into<String>, factory: LossFactory) -> Result<()> {
        let key = key.into();
        if self.factories.contains_key(&key) {
            return Err(AslError::DuplicateLoss(key));
        }
        debug!("registered loss `{key}`");
        self.factories.insert(key, factory);
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn build(&self, key: &str, config: Map<String, Value>) -> Result<Box<dyn Loss>> {
        let factory = self.factories.get(key)
            .ok_or_else(|| AslError::UnknownLoss(key.to_string()))?;
        factory(config)
    }

    /// Rebuilds a loss from its persisted `{"class_name", "config"}` form.
    pub fn deserialize(&self, value: &Value) -> Result<Box<dyn Loss>> {
        let class_name = value.get("class_name")
            .and_then(Value::as_str)
            .ok_or_else(|| AslError::InvalidConfig {
                field: "class_name",
                reason: "expected a string".into(),
            })?;
        let config = match value.get("config") {
            Some(Value::Object(map)) => map.clone(),
            None | Some(Value::Null) => Map::new(),
            Some(other) => {
                return Err(AslError::InvalidConfig {
                    field: "config",
                    reason: format!("expected an object, got {other}"),
                })
            }
        };
        self.build(class_name, config)
    }

    pub fn deserialize_str(&self, json: &str) -> Result<Box<dyn Loss>> {
        let value: Value = serde_json::from_str(json)?;
        self.deserialize(&value)
    }
}

fn build_asymmetric(config: Map<String, Value>) -> Result<Box<dyn Loss>> {
    Ok(Box::new(SigmoidAsymmetricLoss::from_config(config)?))
}

fn build_bce(config: Map<String, Value>) -> Result<Box<dyn Loss>> {
    Ok(Box::new(BinaryCrossEntropy::from_config(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::asymmetric::AsymmetricLossConfig;
    use crate::loss::reduction::Reduction;
    use serde_json::json;

    #[test]
    fn builtin_keys() {
        let registry = LossRegistry::with_builtin();
        let keys: Vec<&str> = registry.keys().collect();
        assert_eq!(keys, vec!["Addons>SigmoidAsymmetricLoss", "binary_crossentropy"]);
    }

    #[test]
    fn unknown_key_is_an_error() {
        let registry = LossRegistry::with_builtin();
        assert!(matches!(registry.build("focal", Map::new()), Err(AslError::UnknownLoss(k)) if k == "focal"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = LossRegistry::with_builtin();
        let err = registry.register(bce::CLASS_NAME, build_bce).unwrap_err();
        assert!(matches!(err, AslError::DuplicateLoss(_)));
        registry.register("bce_alias", build_bce).unwrap();
        assert!(registry.contains("bce_alias"));
    }

    #[test]
    fn persisted_loss_round_trips() {
        let registry = LossRegistry::with_builtin();
        let original = AsymmetricLossConfig {
            gamma_neg: 3.0,
            reduction: Reduction::Sum,
            name: Some("asl".into()),
            ..Default::default()
        }
        .build()
        .unwrap();

        let restored = registry.deserialize(&original.to_json()).unwrap();
        assert_eq!(restored.class_name(), asymmetric::CLASS_NAME);
        assert_eq!(restored.name(), "asl");
        assert_eq!(restored.reduction(), Reduction::Sum);
        assert_eq!(restored.get_config(), original.get_config());
    }

    #[test]
    fn missing_config_uses_defaults() {
        let registry = LossRegistry::with_builtin();
        let loss = registry.deserialize(&json!({ "class_name": "Addons>SigmoidAsymmetricLoss" })).unwrap();
        assert_eq!(loss.get_config()["gamma_neg"], json!(4.0));
    }

    #[test]
    fn malformed_envelope_is_rejected() {
        let registry = LossRegistry::with_builtin();
        assert!(matches!(
            registry.deserialize(&json!({ "config": {} })),
            Err(AslError::InvalidConfig { field: "class_name", .. })
        ));
        assert!(matches!(
            registry.deserialize(&json!({ "class_name": "binary_crossentropy", "config": 3 })),
            Err(AslError::InvalidConfig { field: "config", .. })
        ));
        assert!(matches!(registry.deserialize_str("{"), Err(AslError::Json(_))));
        let bce = registry.deserialize_str(r#"{"class_name": "binary_crossentropy", "config": {"reduction": "mean"}}"#).unwrap();
        assert_eq!(bce.reduction(), Reduction::Mean);
    }
}
