pub mod recorder;
pub mod transaction;

pub use recorder::{
    record_point_transactions, record_round_points, record_school_momentum, RecordOutcome,
    RoundKey,
};
pub use transaction::{NewPointTransaction, PointTransaction, PointType};
