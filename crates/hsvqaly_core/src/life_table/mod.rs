//! Life-table engine: conditional survival, background utility and
//! discounted long-term QALY integration

mod loss;
mod reference;
mod table;

pub use loss::{
    ExcessMortality, LossMode, LongTermLoss, SequelaeDuration, age_adjusted_disutility,
    background_utility, fixed_horizon_loss,
};
pub use reference::REFERENCE_MAX_AGE;
pub use table::{LifeTable, LifeTableRow, LifeTables};
