pub mod alerts;
pub mod checkins;
pub mod incidents;
pub mod schedules;

pub use alerts::AlertsRepository;
pub use checkins::CheckinsRepository;
pub use incidents::IncidentsRepository;
pub use schedules::SchedulesRepository;
