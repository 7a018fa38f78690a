pub mod recenter;
pub mod rows;
pub mod sign;
