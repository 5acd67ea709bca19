pub mod catalog;
pub mod pricing;
pub mod reservation;
pub mod seed;
