pub mod models;
pub mod util;

pub mod prelude {
    pub use crate::models::*;
    pub use crate::util::get_extension;
}
