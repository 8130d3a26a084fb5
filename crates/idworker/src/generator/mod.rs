#[cfg(test)]
mod tests;
mod worker;

pub use worker::*;
