pub mod similarity;

pub use similarity::similarity_ratio;
