pub mod jsearch;
pub mod pracuj;
pub mod renderer;
