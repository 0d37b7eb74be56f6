//! API modules mounted by the registrar.
//!
//! Every domain module exposes `fn module() -> ApiModule` and is listed in
//! [`manifest`]. New modules are appended there.

use crate::router::ApiModule;

pub mod health;
pub mod meta;

/// Modules mounted by default, in registration order.
pub fn manifest() -> Vec<ApiModule> {
    vec![health::module(), meta::module()]
}
