pub mod constants;
pub mod sql_context;
pub mod url;
