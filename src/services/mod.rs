pub mod assignment_service;
pub mod attempt_scorer;
pub mod composer_service;
pub mod exam_service;
pub mod export_service;
pub mod pin_service;
pub mod result_service;
pub mod submission_service;
pub mod teacher_service;
