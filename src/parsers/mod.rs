pub mod ddo;
