pub mod aggregate;
pub mod charts;
pub mod controller;
pub mod dataset;
pub mod domain;
pub mod export;
pub mod inputter;
pub mod loader;
pub mod logging;
pub mod model;
pub mod samples;
pub mod table;
pub mod theme;
pub mod ui;
pub mod value;
