mod client;

pub use client::{ApiClient, extract_detail, parse_json_body, read_json};
