pub mod accounts;
pub mod concurrency;
pub mod config;
pub mod domain;
pub mod errors;
pub mod schedule;

pub use accounts::{AccountDirectory, AccountError, AccountSelection, ZoomAccount};
pub use concurrency::map_bounded;
pub use domain::meeting::{
    EditForm, MeetingAction, MeetingDuration, MeetingForm, MeetingId, MeetingPassword,
};
pub use domain::metadata::{EditModalState, MeetingActionRef, MeetingEditRef, ModalState};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use schedule::{DaySchedule, Schedule};
