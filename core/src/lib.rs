pub mod cart;
pub mod dataset;
pub mod models;
pub mod normalize;
pub mod recipes;
pub mod service;
pub mod session;
