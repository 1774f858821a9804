//! Entity-Component-System
//!
//! A [`Manager`] owns every [`Entity`] in a slot map keyed by [`EntityKey`].
//! Each entity owns its components and indexes them by [`ComponentTypeId`].
//! Components opt into per-frame behaviour through the [`Updatable`] and
//! [`Drawable`] capability traits instead of carrying empty hooks.

pub mod component;
pub mod components;
pub mod entity;
pub mod manager;

pub use component::{Component, ComponentTypeId, Drawable, UpdateContext, Updatable};
pub use entity::Entity;
pub use manager::{EntityKey, Manager};
