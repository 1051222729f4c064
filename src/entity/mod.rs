pub mod audit_logs;
pub mod carts;
pub mod checkout_sessions;
pub mod items;
pub mod line_items;
pub mod orders;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use carts::Entity as Carts;
pub use checkout_sessions::Entity as CheckoutSessions;
pub use items::Entity as Items;
pub use line_items::Entity as LineItems;
pub use orders::Entity as Orders;
pub use users::Entity as Users;
