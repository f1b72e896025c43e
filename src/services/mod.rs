pub mod recommendations;
pub mod similarity;
