//! Pure functions that summarize expense lists for the dashboard and reports.

mod aggregation;
mod summary;
mod timeframe;

pub use aggregation::{
    GroupShare, TimeframeReport, by_category, by_user, expenses_in_range, share, total_amount,
};
pub use summary::DashboardSummary;
pub use timeframe::{DateRange, Timeframe, timeframe_range};
