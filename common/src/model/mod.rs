pub mod availability;
pub mod department;
pub mod import;
pub mod instructor;
pub mod subject;
