pub mod gmail;
pub mod sqlite;
