#[macro_use]
extern crate log;

pub mod extract;
pub mod http;
pub mod source;

pub mod prelude {
    pub use crate::http::{Client, FetchError, RetryPolicy};
    pub use crate::source::Azoramoon;
    pub use mangaha_lib::prelude::*;
}
