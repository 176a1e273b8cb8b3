// ABOUTME: Payment schedule derivation for a quote total
// ABOUTME: Installments always reconcile exactly with the total

use serde::{Deserialize, Serialize};

use crate::catalog::PaymentPlan;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    /// 1-based position in the schedule
    pub numero: u32,
    pub nombre: String,
    pub porcentaje: f64,
    pub monto: i64,
}

/// Split `total` according to `plan`; the last installment absorbs rounding
pub fn build_schedule(total: i64, plan: &PaymentPlan) -> Vec<Installment> {
    let splits = plan_splits(plan);
    let count = splits.len();
    let mut remaining = total;

    splits
        .into_iter()
        .enumerate()
        .map(|(i, (nombre, porcentaje))| {
            let monto = if i + 1 == count {
                remaining
            } else {
                let share = (total as f64 * porcentaje / 100.0).round() as i64;
                share.clamp(0, remaining.max(0))
            };
            remaining -= monto;

            Installment {
                numero: (i + 1) as u32,
                nombre,
                porcentaje,
                monto,
            }
        })
        .collect()
}

fn plan_splits(plan: &PaymentPlan) -> Vec<(String, f64)> {
    match plan {
        PaymentPlan::Contado => vec![("Pago único".to_string(), 100.0)],
        PaymentPlan::Cuotas { cuotas } => cuotas
            .iter()
            .map(|c| (c.nombre.clone(), c.porcentaje))
            .collect(),
        PaymentPlan::PieMasMensual {
            pie_porcentaje,
            meses,
        } => {
            let monthly = (100.0 - pie_porcentaje) / f64::from(*meses);
            std::iter::once(("Pie".to_string(), *pie_porcentaje))
                .chain((1..=*meses).map(|m| (format!("Cuota {}/{}", m, meses), monthly)))
                .collect()
        }
    }
}
