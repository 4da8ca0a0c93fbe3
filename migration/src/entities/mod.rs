pub mod ip_label;
pub mod subscription;
pub mod tracking_event;
pub mod visitor;

pub use ip_label::Entity as IpLabelEntity;
pub use subscription::Entity as SubscriptionEntity;
pub use tracking_event::Entity as TrackingEventEntity;
pub use visitor::Entity as VisitorEntity;
