//! Resource list feature: API seam, mutations, and the screen controller.

pub mod actions;
pub mod api;
pub mod controller;
pub mod state;
