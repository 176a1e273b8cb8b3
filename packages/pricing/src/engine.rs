// ABOUTME: Quote totals computation over a catalog and a quote request
// ABOUTME: Pure function; unknown ids and invalid discounts are rejected before pricing

use serde::{Deserialize, Serialize};
use tracing::debug;

use backstage_core::constants::DEFAULT_HOSTING_MONTHS;

use crate::catalog::{Catalog, CatalogEntry};
use crate::error::{PricingError, PricingResult};
use crate::request::QuoteRequest;
use crate::schedule::{build_schedule, Installment};
use crate::HOSTING_SERVICE_ID;

/// One priced row of the breakdown
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    pub nombre: String,
    pub precio_lista: i64,
    pub precio_final: i64,
    pub descuento_porcentaje: f64,
    /// Billed months, only set for hosting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meses: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incluye: Vec<String>,
}

impl LineItem {
    pub fn is_discounted(&self) -> bool {
        self.precio_final < self.precio_lista
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupportLine {
    pub id: String,
    pub nombre: String,
    pub precio_mensual: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodSummary {
    pub id: String,
    pub nombre: String,
}

/// Derived totals for a quote; recomputed on demand, snapshotted on proposals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteTotals {
    pub sistema_base: LineItem,
    pub modulos: Vec<LineItem>,
    pub servicios: Vec<LineItem>,
    /// Base system price
    pub subtotal_sistema: i64,
    /// Sum of list prices
    pub subtotal: i64,
    /// Sum of discounted prices
    pub subtotal_con_descuento: i64,
    pub descuento: i64,
    pub descuento_porcentaje: f64,
    pub recargo: i64,
    pub recargo_porcentaje: f64,
    pub total: i64,
    pub forma_pago: PaymentMethodSummary,
    pub plan_pagos: Vec<Installment>,
    /// Recurring monthly fee, billed separately from the total
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soporte: Option<SupportLine>,
    pub semanas_estimadas: u32,
}

/// `round(price × (1 − pct/100))` to the nearest currency unit
pub fn discounted_price(price: i64, pct: f64) -> i64 {
    (price as f64 * (1.0 - pct / 100.0)).round() as i64
}

/// Price a quote request against the catalog
pub fn compute_quote(catalog: &Catalog, request: &QuoteRequest) -> PricingResult<QuoteTotals> {
    let base = catalog
        .base_system(&request.sistema_base_id)
        .ok_or_else(|| PricingError::UnknownBaseSystem(request.sistema_base_id.clone()))?;
    let forma_pago = catalog
        .payment_method(&request.forma_pago_id)
        .ok_or_else(|| PricingError::UnknownPaymentMethod(request.forma_pago_id.clone()))?;

    request.validate()?;

    let soporte = match request.plan_soporte_id.as_deref() {
        Some(id) => {
            let plan = catalog
                .support_plan(id)
                .ok_or_else(|| PricingError::UnknownSupportPlan(id.to_string()))?;
            Some(SupportLine {
                id: plan.id.clone(),
                nombre: plan.nombre.clone(),
                precio_mensual: plan.precio,
            })
        }
        None => None,
    };

    let modulos = request
        .unique_modules()
        .into_iter()
        .map(|id| {
            let entry = catalog
                .module(id)
                .ok_or_else(|| PricingError::UnknownModule(id.to_string()))?;
            Ok(line_item(entry, entry.precio, request.module_discount(id), None))
        })
        .collect::<PricingResult<Vec<_>>>()?;

    let meses_hosting = request.meses_hosting.unwrap_or(DEFAULT_HOSTING_MONTHS);
    let servicios = request
        .unique_services()
        .into_iter()
        .map(|id| {
            let entry = catalog
                .service(id)
                .ok_or_else(|| PricingError::UnknownService(id.to_string()))?;
            let pct = request.service_discount(id);
            if id == HOSTING_SERVICE_ID {
                let mut item = line_item(
                    entry,
                    entry.precio * i64::from(meses_hosting),
                    pct,
                    Some(meses_hosting),
                );
                item.nombre = format!("{} ({} meses)", entry.nombre, meses_hosting);
                Ok(item)
            } else {
                Ok(line_item(entry, entry.precio, pct, None))
            }
        })
        .collect::<PricingResult<Vec<_>>>()?;

    let sistema_base = line_item(base, base.precio, 0.0, None);
    let subtotal_sistema = sistema_base.precio_final;

    let extras = modulos.iter().chain(servicios.iter());
    let (lista_extras, final_extras) = extras.fold((0i64, 0i64), |(lista, fin), item| {
        (lista + item.precio_lista, fin + item.precio_final)
    });

    let subtotal = subtotal_sistema + lista_extras;
    let subtotal_con_descuento = subtotal_sistema + final_extras;
    let descuento = subtotal - subtotal_con_descuento;
    let descuento_porcentaje = if subtotal > 0 {
        round2(descuento as f64 * 100.0 / subtotal as f64)
    } else {
        0.0
    };

    let recargo_porcentaje = forma_pago.recargo_porcentaje;
    let recargo = (subtotal_con_descuento as f64 * recargo_porcentaje / 100.0).round() as i64;
    let total = subtotal - descuento + recargo;

    let semanas_estimadas = base.semanas.unwrap_or(0)
        + request
            .unique_modules()
            .into_iter()
            .filter_map(|id| catalog.module(id).and_then(|m| m.semanas))
            .sum::<u32>()
        + request
            .unique_services()
            .into_iter()
            .filter_map(|id| catalog.service(id).and_then(|s| s.semanas))
            .sum::<u32>();

    debug!(
        base = %base.id,
        modules = modulos.len(),
        services = servicios.len(),
        subtotal,
        descuento,
        recargo,
        total,
        "Quote computed"
    );

    Ok(QuoteTotals {
        sistema_base,
        modulos,
        servicios,
        subtotal_sistema,
        subtotal,
        subtotal_con_descuento,
        descuento,
        descuento_porcentaje,
        recargo,
        recargo_porcentaje,
        total,
        forma_pago: PaymentMethodSummary {
            id: forma_pago.id.clone(),
            nombre: forma_pago.nombre.clone(),
        },
        plan_pagos: build_schedule(total, &forma_pago.plan),
        soporte,
        semanas_estimadas,
    })
}

fn line_item(entry: &CatalogEntry, precio_lista: i64, pct: f64, meses: Option<u32>) -> LineItem {
    LineItem {
        id: entry.id.clone(),
        nombre: entry.nombre.clone(),
        precio_lista,
        precio_final: discounted_price(precio_lista, pct),
        descuento_porcentaje: pct,
        meses,
        incluye: entry.incluye.clone(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
