pub mod error;
pub mod esc_url;
pub mod jsonp;
pub mod logger;
pub mod slug;
pub mod validation;
