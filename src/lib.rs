#![allow(async_fn_in_trait)]
pub mod boundary;
pub mod catalog;
pub mod collection;
pub mod config;
pub mod error;
pub mod export;
pub mod preview;
pub mod raster;
