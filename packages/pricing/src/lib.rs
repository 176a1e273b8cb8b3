// ABOUTME: Quote pricing for Backstage proposals
// ABOUTME: Static catalog, quote requests, totals computation, and payment schedules

pub mod catalog;
pub mod engine;
pub mod error;
pub mod request;
pub mod schedule;

pub use catalog::{Catalog, CatalogEntry, InstallmentSplit, PaymentMethod, PaymentPlan};
pub use engine::{compute_quote, discounted_price, LineItem, PaymentMethodSummary, QuoteTotals, SupportLine};
pub use error::{PricingError, PricingResult};
pub use request::QuoteRequest;
pub use schedule::{build_schedule, Installment};

/// Service whose catalog price is monthly and scales with the hosting months
pub const HOSTING_SERVICE_ID: &str = "hosting";
