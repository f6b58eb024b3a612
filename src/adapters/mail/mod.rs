//! Outgoing mail adapters.

pub mod resend;

pub use resend::ResendMailer;
