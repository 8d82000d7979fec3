pub mod assumptions;
pub mod dcf;
pub mod growth;
pub mod terminal;
pub mod wacc;

pub use assumptions::{ResolvedAssumptions, ValuationDefaults, ValuationModel, ValuationRequest};
pub use dcf::{valuate, valuate_with_defaults, ProjectionYear, ValuationResult};
pub use growth::{project, GrowthSchedule};
pub use terminal::{pv_terminal, terminal_value};
pub use wacc::{cost_of_capital, CostOfCapital, CostOfCapitalRequest};
