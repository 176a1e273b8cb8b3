use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Unknown base system: {0}")]
    UnknownBaseSystem(String),
    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),
    #[error("Unknown module: {0}")]
    UnknownModule(String),
    #[error("Unknown service: {0}")]
    UnknownService(String),
    #[error("Unknown support plan: {0}")]
    UnknownSupportPlan(String),
    #[error("Discount for {item} must be between 0 and 100 (got {value})")]
    InvalidDiscount { item: String, value: f64 },
    #[error("Hosting months must be at least 1")]
    InvalidHostingMonths,
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),
}

pub type PricingResult<T> = Result<T, PricingError>;
