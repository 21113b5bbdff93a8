pub mod client;

pub use client::{CheckoutSession, HostedPaymentClient, LineItem, PaymentError};
