pub mod client;

pub use client::Notifier;
