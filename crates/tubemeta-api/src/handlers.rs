//! Request handlers.

pub mod analyze;
pub mod auth;
pub mod headshot;
pub mod health;
pub mod pages;
pub mod style;
pub mod thumbnail;

pub use analyze::*;
pub use auth::*;
pub use headshot::*;
pub use health::*;
pub use pages::*;
pub use style::*;
pub use thumbnail::*;
