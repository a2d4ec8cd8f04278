pub mod mercadopago;
pub mod processor_service;
pub mod processor_trait;
pub mod signature;
pub mod stripe;

pub use mercadopago::PixProcessor;
pub use processor_service::ProcessorRegistry;
pub use processor_trait::{
    EventStatus, IntentRequest, ProcessorAdapter, ProcessorEvent, ProcessorIntent,
};
pub use stripe::StripeProcessor;
