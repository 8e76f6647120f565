pub mod geo;
pub mod highlight;
pub mod hours;
pub mod photos;
pub mod pricing;
pub mod text;
