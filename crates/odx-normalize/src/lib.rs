//! Idempotent, pure value normalizers applied at CSV emit time.
//!
//! Every function here satisfies `f(f(x)) == f(x)` over its accepted domain:
//! normalizing an already-normalized value is always a no-op. None of them
//! touch a [`odx_frame::TabularFrame`] directly — callers decide what to do
//! with a [`NormalizeError`] (the validator rejects the row; the emitter
//! leaves the cell null and logs).

mod boolean;
mod date;
mod email;
mod enum_;
mod error;
mod phone;

pub use boolean::coerce_bool;
pub use date::normalize_date_any;
pub use email::normalize_email;
pub use enum_::coerce_enum;
pub use error::NormalizeError;
pub use phone::normalize_phone_us;
