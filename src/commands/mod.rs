pub mod doctor;
pub mod extract;
pub mod parse;
