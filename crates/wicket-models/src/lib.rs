pub mod account;

pub use account::{AdminAccount, PublicAccount, Role, SessionAccount};
