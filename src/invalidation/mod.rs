//! Invalidation Module
//!
//! Turns inbound change notifications into cache invalidations and optional
//! downstream revalidation.
//!
//! Signature verification happens at the HTTP boundary before an event ever
//! reaches the [`InvalidationTrigger`].

mod event;
mod revalidate;
mod signature;
mod trigger;

pub use event::{ChangeAction, ChangeEvent, EventKind, ResourceKind};
pub use revalidate::{HttpRevalidationSink, RevalidationSink};
pub use signature::{sign, verify_signature, SIGNATURE_HEADER};
pub use trigger::{InvalidationReport, InvalidationScope, InvalidationTrigger};
