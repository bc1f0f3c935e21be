pub mod attendance_service;
pub mod membership_service;
pub mod profile_service;
pub mod school_service;

pub use attendance_service::AttendanceService;
pub use membership_service::MembershipService;
pub use profile_service::ProfileService;
pub use school_service::SchoolService;
