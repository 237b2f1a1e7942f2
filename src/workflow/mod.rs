pub mod audit;
pub mod inspect;
pub mod locator;
pub mod mutator;
pub mod report;
pub mod seed;
