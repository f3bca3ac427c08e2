pub mod contracts;
pub mod all_evo_contracts;

pub use all_evo_contracts::AllEvoContracts;
