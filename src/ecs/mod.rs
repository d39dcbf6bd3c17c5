//! ECS component and system definitions built on `hecs`.

pub mod components;
pub mod systems;
