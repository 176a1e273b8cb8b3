// ABOUTME: Pricing catalog: base systems, modules, support plans, payment methods, services
// ABOUTME: Immutable once loaded; validated on load from the built-in TOML or a file

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{PricingError, PricingResult};

const BUILTIN_CATALOG: &str = include_str!("../catalog/default.toml");

/// Tolerance when checking that percentage splits add up to 100
const PERCENT_EPSILON: f64 = 1e-6;

/// A priced item: base system, module, support plan, or add-on service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub nombre: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    /// List price in whole currency units
    pub precio: i64,
    /// Estimated implementation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semanas: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incluye: Vec<String>,
}

/// One named share of a split payment plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallmentSplit {
    pub nombre: String,
    pub porcentaje: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "tipo", rename_all = "snake_case")]
pub enum PaymentPlan {
    /// Single payment for the full amount
    Contado,
    /// Fixed percentage splits, e.g. 40/30/30
    Cuotas { cuotas: Vec<InstallmentSplit> },
    /// Up-front share followed by equal monthly installments
    PieMasMensual { pie_porcentaje: f64, meses: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentMethod {
    pub id: String,
    pub nombre: String,
    /// Financing fee applied to the discounted subtotal
    #[serde(default)]
    pub recargo_porcentaje: f64,
    pub plan: PaymentPlan,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub sistemas_base: Vec<CatalogEntry>,
    #[serde(default)]
    pub modulos: Vec<CatalogEntry>,
    #[serde(default)]
    pub planes_soporte: Vec<CatalogEntry>,
    pub formas_pago: Vec<PaymentMethod>,
    #[serde(default)]
    pub servicios: Vec<CatalogEntry>,
}

impl Catalog {
    /// The catalog compiled into the binary
    pub fn builtin() -> PricingResult<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// Parse and validate a TOML catalog
    pub fn from_toml_str(source: &str) -> PricingResult<Self> {
        let catalog: Catalog =
            toml::from_str(source).map_err(|e| PricingError::InvalidCatalog(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog file, e.g. the one named by `BACKSTAGE_CATALOG_PATH`
    pub fn load(path: impl AsRef<Path>) -> PricingResult<Self> {
        let path = path.as_ref();
        debug!("Loading pricing catalog from {}", path.display());

        let source = std::fs::read_to_string(path).map_err(|e| {
            PricingError::InvalidCatalog(format!("cannot read {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_toml_str(&source)?;

        info!(
            base_systems = catalog.sistemas_base.len(),
            modules = catalog.modulos.len(),
            services = catalog.servicios.len(),
            "Pricing catalog loaded"
        );
        Ok(catalog)
    }

    pub fn base_system(&self, id: &str) -> Option<&CatalogEntry> {
        self.sistemas_base.iter().find(|e| e.id == id)
    }

    pub fn module(&self, id: &str) -> Option<&CatalogEntry> {
        self.modulos.iter().find(|e| e.id == id)
    }

    pub fn support_plan(&self, id: &str) -> Option<&CatalogEntry> {
        self.planes_soporte.iter().find(|e| e.id == id)
    }

    pub fn payment_method(&self, id: &str) -> Option<&PaymentMethod> {
        self.formas_pago.iter().find(|m| m.id == id)
    }

    pub fn service(&self, id: &str) -> Option<&CatalogEntry> {
        self.servicios.iter().find(|e| e.id == id)
    }

    /// Check ids are unique per kind, prices non-negative, and plans well formed
    pub fn validate(&self) -> PricingResult<()> {
        if self.sistemas_base.is_empty() {
            return Err(PricingError::InvalidCatalog(
                "at least one base system is required".to_string(),
            ));
        }
        if self.formas_pago.is_empty() {
            return Err(PricingError::InvalidCatalog(
                "at least one payment method is required".to_string(),
            ));
        }

        for (kind, entries) in [
            ("sistemas_base", &self.sistemas_base),
            ("modulos", &self.modulos),
            ("planes_soporte", &self.planes_soporte),
            ("servicios", &self.servicios),
        ] {
            validate_entries(kind, entries)?;
        }

        let mut seen = HashSet::new();
        for method in &self.formas_pago {
            if !seen.insert(method.id.as_str()) {
                return Err(PricingError::InvalidCatalog(format!(
                    "duplicate payment method id: {}",
                    method.id
                )));
            }
            validate_payment_method(method)?;
        }

        Ok(())
    }
}

fn validate_entries(kind: &str, entries: &[CatalogEntry]) -> PricingResult<()> {
    let mut seen = HashSet::new();
    for entry in entries {
        if entry.id.trim().is_empty() {
            return Err(PricingError::InvalidCatalog(format!(
                "{} entry with empty id",
                kind
            )));
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(PricingError::InvalidCatalog(format!(
                "duplicate {} id: {}",
                kind, entry.id
            )));
        }
        if entry.precio < 0 {
            return Err(PricingError::InvalidCatalog(format!(
                "{} '{}' has a negative price",
                kind, entry.id
            )));
        }
    }
    Ok(())
}

fn validate_payment_method(method: &PaymentMethod) -> PricingResult<()> {
    let invalid = |msg: &str| PricingError::InvalidCatalog(format!("{}: {}", method.id, msg));

    if !method.recargo_porcentaje.is_finite() || method.recargo_porcentaje < 0.0 {
        return Err(invalid("surcharge must be a non-negative percentage"));
    }

    match &method.plan {
        PaymentPlan::Contado => Ok(()),
        PaymentPlan::Cuotas { cuotas } => {
            if cuotas.is_empty() {
                return Err(invalid("split plan needs at least one installment"));
            }
            if cuotas
                .iter()
                .any(|c| !c.porcentaje.is_finite() || c.porcentaje <= 0.0)
            {
                return Err(invalid("installment percentages must be positive"));
            }
            let sum: f64 = cuotas.iter().map(|c| c.porcentaje).sum();
            if (sum - 100.0).abs() > PERCENT_EPSILON {
                return Err(invalid(&format!(
                    "installment percentages add up to {} instead of 100",
                    sum
                )));
            }
            Ok(())
        }
        PaymentPlan::PieMasMensual {
            pie_porcentaje,
            meses,
        } => {
            if *meses == 0 {
                return Err(invalid("monthly plan needs at least one month"));
            }
            if !pie_porcentaje.is_finite() || *pie_porcentaje < 0.0 || *pie_porcentaje > 100.0 {
                return Err(invalid("up-front percentage must be between 0 and 100"));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().unwrap();

        assert_eq!(catalog.base_system("basico").unwrap().precio, 1_000_000);
        assert_eq!(catalog.module("inventario").unwrap().precio, 200_000);
        assert!(catalog.service(crate::HOSTING_SERVICE_ID).is_some());
        assert!(matches!(
            catalog.payment_method("tres_cuotas").unwrap().plan,
            PaymentPlan::Cuotas { .. }
        ));
        assert!(matches!(
            catalog.payment_method("financiado").unwrap().plan,
            PaymentPlan::PieMasMensual { meses: 6, .. }
        ));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let source = r#"
            [[sistemas_base]]
            id = "basico"
            nombre = "A"
            precio = 1

            [[sistemas_base]]
            id = "basico"
            nombre = "B"
            precio = 2

            [[formas_pago]]
            id = "contado"
            nombre = "Contado"
            plan = { tipo = "contado" }
        "#;

        let err = Catalog::from_toml_str(source).unwrap_err();
        assert!(err.to_string().contains("duplicate sistemas_base id: basico"));
    }

    #[test]
    fn test_rejects_splits_not_summing_to_100() {
        let source = r#"
            [[sistemas_base]]
            id = "basico"
            nombre = "A"
            precio = 1

            [[formas_pago]]
            id = "cuotas"
            nombre = "Cuotas"

            [formas_pago.plan]
            tipo = "cuotas"

            [[formas_pago.plan.cuotas]]
            nombre = "Uno"
            porcentaje = 50.0

            [[formas_pago.plan.cuotas]]
            nombre = "Dos"
            porcentaje = 40.0
        "#;

        let err = Catalog::from_toml_str(source).unwrap_err();
        assert!(matches!(err, PricingError::InvalidCatalog(_)));
        assert!(err.to_string().contains("instead of 100"));
    }

    #[test]
    fn test_rejects_negative_price() {
        let source = r#"
            [[sistemas_base]]
            id = "basico"
            nombre = "A"
            precio = -5

            [[formas_pago]]
            id = "contado"
            nombre = "Contado"
            plan = { tipo = "contado" }
        "#;

        assert!(Catalog::from_toml_str(source).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BUILTIN_CATALOG.as_bytes()).unwrap();

        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog, Catalog::builtin().unwrap());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Catalog::load("/nonexistent/catalog.toml").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
