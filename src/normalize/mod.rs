pub mod compensation;
pub mod sections;
pub mod taxonomy;
