pub mod offer;
pub mod product;

pub use offer::{BillingType, CycleUnit, Offer};
pub use product::{DocumentKind, Product};
