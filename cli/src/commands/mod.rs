pub mod cli;
pub mod codec;
pub mod demo;
pub mod inspect;
