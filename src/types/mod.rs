pub use self::{
    notification::{
        CorrelationId, NotificationIntent, NotificationPayload, PayloadData,
    },
    push::{Claims, PushHeader, Urgency},
    subscription::{Keys, Subscription, Unsubscribe},
};

mod notification;
mod push;
mod subscription;
