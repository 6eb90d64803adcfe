//! Range expressions: parsing user input into page indices.

mod list;
mod parser;

pub use list::RangeList;
pub use parser::{parse_expression, RangeParse, RejectReason, RejectedToken, MAX_RANGE_SPAN};
