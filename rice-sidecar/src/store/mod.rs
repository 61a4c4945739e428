pub mod repository;

pub use repository::StepRepository;
