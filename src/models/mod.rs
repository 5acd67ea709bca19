pub mod booking;
pub mod experience;

pub use booking::{Booking, BookingDetail, BookingStatus};
pub use experience::{
    Experience, ExperienceDetail, ExperienceSummary, NewExperience, NewSlot, Slot,
    SlotAvailability,
};
