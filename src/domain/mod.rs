pub mod extraction_mode;
pub mod html_tag;
pub mod report;
pub mod scrape_result;
pub mod scrape_status;
pub mod target_url;
pub mod webpage;

pub use extraction_mode::*;
pub use report::*;
pub use scrape_result::*;
pub use scrape_status::*;
pub use target_url::*;
pub use webpage::*;
