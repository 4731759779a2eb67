pub mod levels;
pub mod simulate;
