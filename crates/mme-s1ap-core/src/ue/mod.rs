mod reference;

pub use reference::{S1apState, UeReference};
