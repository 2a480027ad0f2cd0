pub mod clock;
pub mod csv;
pub mod days;
pub mod engine;
pub mod geo;
pub mod model;
pub mod rate_limit;
pub mod store;

pub use days::Days;
pub use engine::LeaveEngine;
pub use model::{EmployeeId, LeaveRequest, LeaveTypeId, RequestId};
