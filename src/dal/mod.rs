pub mod scrape_result_db;
pub mod stat_db;
