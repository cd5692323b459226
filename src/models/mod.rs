pub mod answer;
pub mod answer_option;
pub mod assessment;
pub mod attempt;
pub mod attempt_question;
pub mod course_module;
pub mod question;
