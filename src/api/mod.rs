//! Clients for the remote image hosts (Scryfall CDN, Gatherer)

pub mod hosts;
pub mod images;

pub use hosts::ImageHosts;
pub use images::ImageResolver;
