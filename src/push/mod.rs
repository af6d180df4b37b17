//! Push notification fan-out
//!
//! [`PayloadBuilder`] turns a [`NotificationIntent`](crate::types::NotificationIntent)
//! into wire bytes, a [`DeliveryTransport`] delivers them to one endpoint and
//! the [`Dispatcher`] broadcasts to the whole registry.

pub use self::{
    dispatcher::{DispatchSummary, Dispatcher},
    payload::{validate, PayloadBuilder, SerializedPayload, MAX_PAYLOAD_SIZE},
    transport::{
        classify_status, DeliveryOutcome, DeliveryTransport, ErrorClass,
        WebPush,
    },
};

mod dispatcher;
mod payload;
mod transport;
