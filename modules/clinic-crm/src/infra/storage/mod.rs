pub mod entities;
pub mod migrations;
