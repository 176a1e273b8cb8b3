use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::{PricingError, PricingResult};

/// Selections for one quote, as sent by the proposal builder
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub sistema_base_id: String,
    #[serde(default)]
    pub modulos_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_soporte_id: Option<String>,
    pub forma_pago_id: String,
    #[serde(default)]
    pub servicios_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meses_hosting: Option<u32>,
    /// Per-module discount percentage overrides
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub modulos_descuento: BTreeMap<String, f64>,
    /// Per-service discount percentage overrides
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub servicios_descuento: BTreeMap<String, f64>,
    /// Applied to every module and service without its own override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descuento_porcentaje_override: Option<f64>,
}

impl QuoteRequest {
    /// Check every discount is a percentage and hosting months are positive
    pub fn validate(&self) -> PricingResult<()> {
        if let Some(value) = self.descuento_porcentaje_override {
            check_percentage("descuentoPorcentajeOverride", value)?;
        }
        for (id, value) in &self.modulos_descuento {
            check_percentage(id, *value)?;
        }
        for (id, value) in &self.servicios_descuento {
            check_percentage(id, *value)?;
        }
        if self.meses_hosting == Some(0) {
            return Err(PricingError::InvalidHostingMonths);
        }
        Ok(())
    }

    pub fn module_discount(&self, id: &str) -> f64 {
        self.modulos_descuento
            .get(id)
            .copied()
            .or(self.descuento_porcentaje_override)
            .unwrap_or(0.0)
    }

    pub fn service_discount(&self, id: &str) -> f64 {
        self.servicios_descuento
            .get(id)
            .copied()
            .or(self.descuento_porcentaje_override)
            .unwrap_or(0.0)
    }

    /// Module ids in request order with duplicates removed
    pub fn unique_modules(&self) -> Vec<&str> {
        unique(&self.modulos_ids)
    }

    /// Service ids in request order with duplicates removed
    pub fn unique_services(&self) -> Vec<&str> {
        unique(&self.servicios_ids)
    }
}

fn check_percentage(item: &str, value: f64) -> PricingResult<()> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(PricingError::InvalidDiscount {
            item: item.to_string(),
            value,
        })
    }
}

fn unique(ids: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(String::as_str)
        .filter(|id| seen.insert(*id))
        .collect()
}
