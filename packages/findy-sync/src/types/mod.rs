pub mod link;
pub mod record;
pub mod schema;
