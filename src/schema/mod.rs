// src/schema/mod.rs
pub mod aliases;
pub mod records;
pub mod types;

pub use records::{cohort_rows, financial_rows, payment_rows, CohortRow, FinancialRow, PaymentRow};
pub use types::{FieldAliases, ResolvedSchema, SourceKind, SourceSchema};
