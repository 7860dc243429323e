mod budget;
mod money;
mod period;
mod report;
mod savings;
mod transaction;
mod user;

pub use budget::*;
pub use money::*;
pub use period::*;
pub use report::*;
pub use savings::*;
pub use transaction::*;
pub use user::*;
