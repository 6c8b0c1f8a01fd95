pub mod manga_info;
pub use manga_info::*;

pub mod chapter_info;
pub use chapter_info::*;

pub mod page_info;
pub use page_info::*;

pub mod search_result;
pub use search_result::*;
