pub mod config;
pub mod domain;
pub mod errors;
pub mod validation;

pub use domain::customer::{
    Customer, CustomerColumn, CustomerFilter, CustomerId, CustomerPatch, CustomerUpdate,
    NewCustomer, Projection,
};
pub use errors::ApiError;
pub use validation::{IssueReason, Validation, ValidationIssue};
