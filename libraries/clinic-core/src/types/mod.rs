mod appointment;
mod ids;
mod query;
mod user;

pub use appointment::{Appointment, ProposedAppointment, ValidatedAppointment};
pub use ids::{AppointmentId, UserId};
pub use query::{
    AppointmentFilters, AppointmentQuery, DateCount, Page, Pagination, ReportFilters, Scope,
};
pub use user::{CreateUser, Identity, Role, User, UserSummary};
