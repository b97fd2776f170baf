//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod event;
pub mod expense;
pub mod goal;
pub mod member;
pub mod payment;
pub mod setting;

// Re-export specific types to avoid conflicts
pub use event::{Column as EventColumn, Entity as Event, Model as EventModel};
pub use expense::{Column as ExpenseColumn, Entity as Expense, Model as ExpenseModel};
pub use goal::{Column as GoalColumn, Entity as Goal, Model as GoalModel};
pub use member::{Column as MemberColumn, Entity as Member, Model as MemberModel, Role};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel};
pub use setting::{Column as SettingColumn, Entity as Setting, Model as SettingModel};
