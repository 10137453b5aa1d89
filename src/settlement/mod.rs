// Settlement module - THE PAYOUT
// Pricing strategies and the swapper that pays beneficiaries on receipt

mod pricing;
mod swapper;

pub use pricing::{FixedRates, PricingStrategy, SwapRate};
pub use swapper::{Settlement, SwapError, SwapOrder, Swapper, SwapperStats};
