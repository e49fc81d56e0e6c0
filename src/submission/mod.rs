pub mod client_ip;
pub mod parser;
pub mod pipeline;
pub mod row;
pub mod schema;
pub mod validate;
