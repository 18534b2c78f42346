pub mod answer;
pub mod assignment;
pub mod exam;
pub mod exam_result;
pub mod question;
pub mod student;
pub mod teacher;
